//! Tracing initialization.
//!
//! Logs always go to standard error: with the stdio transport, standard output
//! carries the MCP protocol stream and must stay clean.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log level and filtering, e.g. `RUST_LOG=debug` or
//!   `RUST_LOG=warn,cloudglue_mcp_server=debug`.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
    util::TryInitError,
};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
}

/// Install the global subscriber, filtering via `RUST_LOG` (default `info`).
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
///
/// ```no_run
/// cloudglue_mcp_common::tracing::init_tracing().ok();
/// tracing::info!("Server starting");
/// ```
pub fn init_tracing() -> Result<(), TryInitError> {
    init_tracing_with_default("info")
}

/// Like [`init_tracing`], with a custom level used when `RUST_LOG` is unset.
pub fn init_tracing_with_default(default_level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .try_init()
}
