//! Minimal SCGI client.
//!
//! Speaks the same wire format as the proxy the fixture is meant to be
//! tested against: `CONTENT_LENGTH` first, then the environment, wrapped in
//! a netstring, then the body. The response is read until the backend closes
//! the connection. Used by the `probe` command and the integration tests.

use std::path::Path;
use std::time::Duration;

use async_std::io;
use async_std::os::unix::net::UnixStream;
use async_std::prelude::*;
use log::debug;
use thiserror::Error;

use crate::scgi::environment::{CONTENT_LENGTH, Environment};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error talking to {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("environment must not set CONTENT_LENGTH itself")]
    ContentLengthInEnvironment,

    #[error("NUL byte in environment entry {0:?}")]
    NulInEnvironment(String),
}

/// Encodes a request. `CONTENT_LENGTH` is derived from `body`, so `env`
/// must not carry it.
pub fn encode_request(env: &Environment, body: &[u8]) -> Result<Vec<u8>, ClientError> {
    if env.contains(CONTENT_LENGTH) {
        return Err(ClientError::ContentLengthInEnvironment);
    }

    let mut headers = Vec::new();
    let content_length = body.len().to_string();
    let pairs = std::iter::once((CONTENT_LENGTH, content_length.as_str())).chain(env.iter());
    for (name, value) in pairs {
        if name.contains('\0') || value.contains('\0') {
            return Err(ClientError::NulInEnvironment(name.to_string()));
        }
        headers.extend_from_slice(name.as_bytes());
        headers.push(0);
        headers.extend_from_slice(value.as_bytes());
        headers.push(0);
    }

    let mut bytes = format!("{}:", headers.len()).into_bytes();
    bytes.extend_from_slice(&headers);
    bytes.push(b',');
    bytes.extend_from_slice(body);
    Ok(bytes)
}

/// Sends one request over the Unix socket at `path` and returns every byte
/// the backend wrote before closing. `read_timeout` bounds the whole exchange.
pub async fn send(
    path: &Path,
    env: &Environment,
    body: &[u8],
    read_timeout: Duration,
) -> Result<Vec<u8>, ClientError> {
    let request = encode_request(env, body)?;
    let io_err = |source| ClientError::Io {
        path: path.display().to_string(),
        source,
    };

    io::timeout(read_timeout, async {
        let mut stream = UnixStream::connect(async_std::path::Path::new(path)).await?;
        debug!("Connected to {}", path.display());

        stream.write_all(&request).await?;
        stream.flush().await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok::<_, std::io::Error>(response)
    })
    .await
    .map_err(io_err)
}
