//! Cloudglue MCP Server
//!
//! MCP server for video understanding using the Cloudglue API.

use anyhow::Result;
use clap::Parser;
use cloudglue_mcp_common::tracing::init_tracing;
use cloudglue_mcp_common::{ConfigArgs, McpServerBuilder, TransportArgs};
use cloudglue_mcp_server::CloudGlueServer;

/// Command-line arguments for the Cloudglue server.
#[derive(Parser, Debug)]
#[command(name = "cloudglue-mcp-server")]
#[command(about = "MCP server for video understanding using Cloudglue")]
struct Args {
    /// Cloudglue connection
    #[command(flatten)]
    config: ConfigArgs,

    /// Transport configuration
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env values must be visible before clap reads env fallbacks
    dotenvy::dotenv().ok();
    init_tracing().ok();

    let args = Args::parse();

    let config = args.config.into_config().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;
    tracing::info!(
        base_url = %config.base_url,
        working_dir = %config.working_dir.display(),
        "Configuration loaded"
    );

    let server = CloudGlueServer::new(config)?;

    let transport = args.transport.into_transport();
    tracing::debug!(transport = %transport, "Starting MCP server");

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
