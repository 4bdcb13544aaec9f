//! Workspace-level integration tests for the Cloudglue MCP server.
//!
//! These tests verify:
//! - The server starts with a configuration and reports its info
//! - Tool registration and schema generation
//! - Input validation and the text output envelope of tool results

pub mod server_startup;
pub mod tool_schema;
pub mod input_validation;
pub mod output_format;

use cloudglue_mcp_common::Config;
use std::time::Duration;

/// Configuration pointing at an unroutable endpoint; no test here reaches the network.
pub fn test_config() -> Config {
    Config {
        api_key: "test-key".to_string(),
        base_url: "http://127.0.0.1:9/v1".to_string(),
        working_dir: std::env::temp_dir(),
        poll_interval: Duration::from_millis(10),
        poll_max_attempts: Some(3),
    }
}
