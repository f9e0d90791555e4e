//! Unix socket runtime of the fixture.
//!
//! This module only deals with the socket:
//! - clearing a stale socket file and binding the listener,
//! - accepting connections,
//! - reading raw bytes and writing raw bytes back.
//!
//! What the bytes mean is delegated: parsing to
//! [`scgi::parser`](crate::scgi::parser), checks to
//! [`scgi::validator`](crate::scgi::validator) and the choice of response to
//! [`handler::handle_request`](crate::handler::handle_request).
//!
//! ## Connection lifecycle
//!
//! 1. Accept a connection and spawn a task for it
//! 2. Read and incrementally parse the netstring header block
//! 3. Validate the environment before reading the body
//! 4. Read exactly `CONTENT_LENGTH` bytes of body
//! 5. Produce a [`Response`] and write its bytes
//! 6. Shut the connection down, which is how the client learns the
//!    response is complete
//!
//! A request the parser or validator rejects is answered with a `59` status
//! line. A client that goes quiet or disconnects gets nothing.

use std::net::Shutdown;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::sync::Arc;

use async_std::io;
use async_std::os::unix::net::{UnixListener, UnixStream};
use async_std::prelude::*;
use async_std::task;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::FixtureConfig;
use crate::error::{FixtureError, FixtureResult};
use crate::handler;
use crate::scgi::parser::{Parser, ParserError, ParserOk};
use crate::scgi::request::ScgiRequest;
use crate::scgi::response::Response;
use crate::scgi::validator::{Validator, ValidatorError};

pub struct Server {
    listener: UnixListener,
    config: Arc<FixtureConfig>,
}

/// Reasons a request could not be read off the stream.
#[derive(Debug, Error)]
enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before the request was complete")]
    ConnectionClosed,

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl Server {
    /// Binds the listener on `config.socket_path`, replacing a socket file
    /// left behind by an earlier run.
    pub async fn bind(config: FixtureConfig) -> FixtureResult<Self> {
        let path = config.socket_path.as_path();
        remove_stale_socket(path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let listener = UnixListener::bind(async_std::path::Path::new(path)).await?;
        info!("{} listening on {}", config.server_name, path.display());

        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(&self) -> FixtureResult<()> {
        let mut incoming = self.listener.incoming();

        while let Some(stream) = incoming.next().await {
            match stream {
                Ok(stream) => {
                    let config = Arc::clone(&self.config);
                    task::spawn(async move {
                        if let Err(err) = Self::handle_client(stream, &config).await {
                            warn!("Error while writing response: {err}");
                        }
                    });
                }
                Err(err) => error!("Accept error: {err}"),
            }
        }

        Ok(())
    }

    /// Reads the header block, validates it, then reads the body.
    async fn read_request(
        stream: &mut UnixStream,
        config: &FixtureConfig,
    ) -> Result<ScgiRequest, ReadError> {
        let mut parser = Parser::new(config.max_header_size);
        let mut req = ScgiRequest::new();
        let mut buffer = vec![0; config.buffer_size];
        let mut outcome = ParserOk::Incomplete;

        loop {
            match outcome {
                ParserOk::Done => break,
                ParserOk::HeadersDone => {
                    // Reject bad headers before reading a body we would discard.
                    Validator::validate_request(&req, config)?;
                    outcome = parser.feed(&[], &mut req)?;
                }
                ParserOk::Incomplete => {
                    let n = match io::timeout(config.read_timeout, stream.read(&mut buffer)).await {
                        Ok(0) => return Err(ReadError::ConnectionClosed),
                        Ok(n) => n,
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    };
                    outcome = parser.feed(&buffer[..n], &mut req)?;
                }
            }
        }

        Ok(req)
    }

    async fn write_response(stream: &mut UnixStream, response: &Response) -> std::io::Result<()> {
        let bytes = response.to_bytes();
        if !bytes.is_empty() {
            stream.write_all(&bytes).await?;
            stream.flush().await?;
        }
        stream.shutdown(Shutdown::Both)
    }

    async fn handle_client(mut stream: UnixStream, config: &FixtureConfig) -> std::io::Result<()> {
        let response = match Self::read_request(&mut stream, config).await {
            Ok(req) => {
                info!("Serving path {:?}", req.path_info());
                handler::handle_request(&req, config).await
            }
            Err(ReadError::Io(err)) => {
                warn!("I/O error while reading request: {err}");
                return Ok(());
            }
            Err(ReadError::ConnectionClosed) => {
                debug!("Connection closed before the request was complete");
                return Ok(());
            }
            Err(ReadError::Parser(err)) => {
                warn!("Malformed request: {err}");
                let meta = err.to_string();
                handler::handle_error(err.into_status(), &meta)
            }
            Err(ReadError::Validator(err)) => {
                warn!("Invalid request: {err}");
                let meta = err.to_string();
                handler::handle_error(err.into_status(), &meta)
            }
        };

        Self::write_response(&mut stream, &response).await
    }
}

/// Removes `path` if it is a socket. Anything else at that path is left alone
/// and reported.
fn remove_stale_socket(path: &Path) -> FixtureResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            info!("Removing stale socket {}", path.display());
            std::fs::remove_file(path)?;
            Ok(())
        }
        Ok(_) => Err(FixtureError::NotASocket {
            path: path.display().to_string(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
