//! Error types shared by the Cloudglue MCP crates.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration
//! - `Error::Api`: Cloudglue REST errors (includes endpoint and status)
//! - `Error::Validation`: Tool input rejected before any remote call
//! - `Error::JobFailed`: A remote job reached a terminal state other than `completed`
//! - `Error::PollTimeout`: The configured poll ceiling was hit
//! - `Error::Io`: File system operations (local uploads)

use thiserror::Error;

/// Unified error type for the Cloudglue MCP crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API errors with endpoint and HTTP status context.
    ///
    /// A `status_code` of 0 means the request never produced a response
    /// (connection refused, DNS failure, body decode failure).
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A remote job finished without completing.
    #[error("{kind} job {job_id} ended with status '{status}': {message}")]
    JobFailed {
        /// Job family (describe, transcribe, extract, segment, file, collection video)
        kind: String,
        /// Remote identifier
        job_id: String,
        /// Terminal status reported by the remote
        status: String,
        /// Remote error detail, or a generic message when none was sent
        message: String,
    },

    /// Polling stopped after the configured number of status fetches.
    #[error("Gave up waiting for {job_id} after {attempts} status checks")]
    PollTimeout {
        /// Remote identifier
        job_id: String,
        /// Number of status fetches performed
        attempts: u32,
    },

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use cloudglue_mcp_common::error::Error;
    ///
    /// let err = Error::api("https://api.cloudglue.dev/v1/describe", 500, "Internal server error");
    /// assert!(err.to_string().contains("api.cloudglue.dev"));
    /// assert!(err.to_string().contains("500"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// ```
    /// use cloudglue_mcp_common::error::Error;
    ///
    /// let err = Error::validation("url cannot be empty");
    /// assert!(err.to_string().contains("url cannot be empty"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a job failure carrying the remote status and error detail.
    pub fn job_failed(
        kind: impl Into<String>,
        job_id: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::JobFailed {
            kind: kind.into(),
            job_id: job_id.into(),
            status: status.into(),
            message: message.into(),
        }
    }

    /// HTTP status of an API error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// True when the remote reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;
