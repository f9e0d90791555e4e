use thiserror::Error;

use crate::scgi::client::ClientError;
use crate::scgi::response::ResponseParseError;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path} exists and is not a socket")]
    NotASocket { path: String },

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Invalid response: {0}")]
    Response(#[from] ResponseParseError),

    #[error("Invalid --env value {0:?}, expected KEY=VALUE")]
    EnvArgument(String),
}

pub type FixtureResult<T> = Result<T, FixtureError>;
