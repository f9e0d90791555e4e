use thiserror::Error;

use crate::scgi::status::Status;

const MAX_META_LEN: usize = 1024;

/// What the fixture writes back for one request.
///
/// `Status` is a conventional `<code> <meta>\r\n` line plus body. `Raw`
/// bypasses that framing entirely and is how the fixtures that imitate a
/// broken backend inject their bytes (possibly none at all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Status {
        status: Status,
        meta: String,
        body: Vec<u8>,
    },
    Raw(Vec<u8>),
}

impl Response {
    pub fn new(status: Status, meta: &str) -> Self {
        Response::Status {
            status,
            meta: meta.to_string(),
            body: Vec::new(),
        }
    }

    pub fn with_body(status: Status, meta: &str, body: impl Into<Vec<u8>>) -> Self {
        Response::Status {
            status,
            meta: meta.to_string(),
            body: body.into(),
        }
    }

    pub fn raw(bytes: &[u8]) -> Self {
        Response::Raw(bytes.to_vec())
    }

    /// Serializes the response exactly as it goes on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::Status { status, meta, body } => {
                // <code> <meta>\r\n
                // <body>
                let mut bytes = format!("{} {}\r\n", status.code(), meta).into_bytes();
                bytes.extend_from_slice(body);
                bytes
            }
            Response::Raw(bytes) => bytes.clone(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseParseError {
    #[error("response is empty")]
    Empty,

    #[error("status line is not terminated by CRLF")]
    MissingCrlf,

    #[error("invalid status code {0:?}")]
    InvalidStatus(String),

    #[error("meta of {0} bytes is too long")]
    MetaTooLong(usize),

    #[error("status line is not UTF-8")]
    InvalidUtf8,
}

/// A response as decoded by the client side of the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub code: u8,
    pub meta: String,
    pub body: Vec<u8>,
}

impl ParsedResponse {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ResponseParseError> {
        if bytes.is_empty() {
            return Err(ResponseParseError::Empty);
        }

        let line_end = bytes
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or(ResponseParseError::MissingCrlf)?;
        let line = std::str::from_utf8(&bytes[..line_end])
            .map_err(|_| ResponseParseError::InvalidUtf8)?;

        let (code, meta) = match line.split_once(' ') {
            Some((code, meta)) => (code, meta),
            None => (line, ""),
        };

        if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResponseParseError::InvalidStatus(code.to_string()));
        }
        if meta.len() > MAX_META_LEN {
            return Err(ResponseParseError::MetaTooLong(meta.len()));
        }

        Ok(Self {
            code: code
                .parse()
                .map_err(|_| ResponseParseError::InvalidStatus(code.to_string()))?,
            meta: meta.to_string(),
            body: bytes[line_end + 2..].to_vec(),
        })
    }

    pub fn status(&self) -> Option<Status> {
        Status::from_code(self.code)
    }
}
