//! Cloudglue MCP Common Library
//!
//! Configuration, error handling, tracing setup and transport plumbing shared by
//! the Cloudglue MCP server and its integration tests.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod server;
pub mod tracing;
pub mod transport;


pub use config::{Config, ConfigArgs};
pub use error::{ConfigError, Error, Result};
pub use server::{McpServerBuilder, ServerError, shutdown_channel};
pub use transport::{Transport, TransportArgs, TransportMode};
