//! Errors raised while starting or running the server.

use courier_track::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Courier configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
