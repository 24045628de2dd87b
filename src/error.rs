//! Error types for the inbox labeler.

use std::time::Duration;

/// Startup error: anything that stops the service before its first run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Label catalog construction errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid label name '{0}': must match [a-z-]+")]
    InvalidLabel(String),
}

/// Mail provider errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A label with this name (possibly differing in case) already exists.
    #[error("Label '{name}' already exists")]
    Conflict { name: String },

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("{operation} request failed: {reason}")]
    RequestFailed { operation: String, reason: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} rate limited, retry after {retry_after:?}")]
    RateLimited {
        operation: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Message {id} not found")]
    NotFound { id: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Pipeline errors. `Listing`, `LabelListing` and `Provisioning` abort a
/// run; the rest are per-message and only skip the message they occurred on.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Inbox listing failed: {0}")]
    Listing(#[source] ProviderError),

    #[error("Label listing failed: {0}")]
    LabelListing(#[source] ProviderError),

    #[error("Failed to provision label '{label}': {source}")]
    Provisioning {
        label: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to fetch message {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Classification failed for message {id}: {source}")]
    Classification {
        id: String,
        #[source]
        source: LlmError,
    },

    #[error("Failed to apply label '{label}' to message {id}: {source}")]
    Apply {
        id: String,
        label: String,
        #[source]
        source: ProviderError,
    },
}

impl PipelineError {
    /// Whether this error ends the whole run rather than a single message.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::Listing(_) | Self::LabelListing(_) | Self::Provisioning { .. }
        )
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
