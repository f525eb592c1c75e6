//! Error types for retrieval, resolution, and configuration.

/// Why a single retrieval strategy produced no usable data.
///
/// Never surfaced to callers: the orchestrator absorbs it and moves on to the
/// next strategy in the chain.
#[derive(thiserror::Error, Debug)]
pub enum StrategyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out")]
    Timeout,

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No usable records")]
    Empty,
}

impl From<reqwest::Error> for StrategyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StrategyError::Timeout
        } else if let Some(status) = e.status() {
            StrategyError::Status(status.as_u16())
        } else if e.is_decode() {
            StrategyError::Parse(e.to_string())
        } else {
            StrategyError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StrategyError {
    fn from(e: serde_json::Error) -> Self {
        StrategyError::Parse(e.to_string())
    }
}

/// Failures that reach the caller of a resolution. `Display` output is
/// short and safe to show to end users.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("Unknown courier: {0}")]
    UnknownCourier(String),

    #[error("Missing courier or number parameter.")]
    MissingNumber,

    /// Every strategy in the chain failed or came back empty.
    #[error("{message}")]
    Exhausted { courier: String, message: String },

    /// The aggregate deadline elapsed before any strategy succeeded.
    #[error("{message}")]
    DeadlineExceeded { courier: String, message: String },
}

/// Invalid courier configuration. Raised only while building the registry.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid courier config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid header '{name}' for courier '{courier}'")]
    InvalidHeader { courier: String, name: String },

    #[error("Duplicate courier id: {0}")]
    DuplicateCourier(String),

    #[error("Courier '{0}' has no retrieval strategies")]
    EmptyChain(String),

    #[error("Invalid selector '{selector}' for courier '{courier}'")]
    InvalidSelector { courier: String, selector: String },

    #[error(
        "Courier '{courier}' needs up to {chain_secs}s across its strategies \
         but deadline_secs is {deadline_secs}"
    )]
    DeadlineTooShort {
        courier: String,
        chain_secs: u64,
        deadline_secs: u64,
    },
}

pub type TrackResult<T> = Result<T, TrackError>;
