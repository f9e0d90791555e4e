//! Incremental SCGI request parser.
//!
//! An SCGI request is a netstring holding the header block, followed by the
//! body:
//!
//! ```text
//! <len>:NAME\0value\0NAME\0value\0...,<body>
//! ```
//!
//! Bytes are fed in whatever chunks the socket delivers. The parser keeps
//! what it has not consumed yet and reports [`ParserOk::HeadersDone`] once,
//! as soon as the header block is complete, so the caller can validate the
//! environment before any body is read. Feeding an empty slice lets the
//! parser make progress on data it already buffered.

use thiserror::Error;

use crate::scgi::request::ScgiRequest;
use crate::scgi::status::Status;

/// Enough digits for any header block we would accept.
const MAX_LENGTH_DIGITS: usize = 10;

#[derive(Debug, PartialEq, Eq)]
pub enum ParserOk {
    Incomplete,
    HeadersDone,
    Done,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("invalid netstring length")]
    InvalidLength,

    #[error("netstring length has too many digits")]
    LengthTooLong,

    #[error("header block of {size} bytes exceeds {max}")]
    HeadersTooLarge { size: usize, max: usize },

    #[error("header block not terminated by ','")]
    MissingComma,

    #[error("malformed header block")]
    MalformedHeaders,

    #[error("duplicate header {0:?}")]
    DuplicateHeader(String),

    #[error("header block is not UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid CONTENT_LENGTH")]
    InvalidContentLength,
}

impl ParserError {
    // Keeps parser logic free of status codes; the mapping lives here.
    pub fn into_status(self) -> Status {
        Status::BadRequest
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum ParserState {
    Length,
    Headers { len: usize },
    Comma,
    Body,
    Done,
}

pub struct Parser {
    buf: Vec<u8>,
    state: ParserState,
    max_header_size: usize,
}

impl Parser {
    pub fn new(max_header_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            state: ParserState::Length,
            max_header_size,
        }
    }

    pub fn is_buffer_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn parse_length(&mut self) -> Result<Option<usize>, ParserError> {
        let Some(end) = self.buf.iter().position(|b| !b.is_ascii_digit()) else {
            if self.buf.len() > MAX_LENGTH_DIGITS {
                return Err(ParserError::LengthTooLong);
            }
            return Ok(None);
        };

        if end > MAX_LENGTH_DIGITS {
            return Err(ParserError::LengthTooLong);
        }
        if end == 0 || self.buf[end] != b':' {
            return Err(ParserError::InvalidLength);
        }

        let len: usize = std::str::from_utf8(&self.buf[..end])?
            .parse()
            .map_err(|_| ParserError::InvalidLength)?;
        if len > self.max_header_size {
            return Err(ParserError::HeadersTooLarge {
                size: len,
                max: self.max_header_size,
            });
        }

        self.buf.drain(..=end);
        Ok(Some(len))
    }

    fn parse_body(&mut self, req: &mut ScgiRequest) -> Result<ParserOk, ParserError> {
        let content_length = req
            .content_length()
            .ok_or(ParserError::InvalidContentLength)?;
        let to_copy = std::cmp::min(self.buf.len(), content_length - req.body.len());

        req.body.extend(self.buf.drain(..to_copy));

        if req.body.len() == content_length {
            self.state = ParserState::Done;
            return Ok(ParserOk::Done);
        }

        Ok(ParserOk::Incomplete)
    }

    pub fn feed(&mut self, data: &[u8], req: &mut ScgiRequest) -> Result<ParserOk, ParserError> {
        self.buf.extend_from_slice(data);

        loop {
            match self.state {
                ParserState::Length => match self.parse_length()? {
                    Some(len) => self.state = ParserState::Headers { len },
                    None => return Ok(ParserOk::Incomplete),
                },
                ParserState::Headers { len } => {
                    if self.buf.len() < len {
                        return Ok(ParserOk::Incomplete);
                    }
                    let block: Vec<u8> = self.buf.drain(..len).collect();
                    parse_header_block(&block, req)?;
                    self.state = ParserState::Comma;
                }
                ParserState::Comma => match self.buf.first().copied() {
                    None => return Ok(ParserOk::Incomplete),
                    Some(b',') => {
                        self.buf.remove(0);
                        self.state = ParserState::Body;
                        return Ok(ParserOk::HeadersDone);
                    }
                    Some(_) => return Err(ParserError::MissingComma),
                },
                ParserState::Body => return self.parse_body(req),
                ParserState::Done => return Ok(ParserOk::Done),
            }
        }
    }
}

fn parse_header_block(block: &[u8], req: &mut ScgiRequest) -> Result<(), ParserError> {
    if block.is_empty() {
        return Ok(());
    }

    let block = block
        .strip_suffix(&[0])
        .ok_or(ParserError::MalformedHeaders)?;
    let mut fields = block.split(|&b| b == 0);

    while let Some(name) = fields.next() {
        let value = fields.next().ok_or(ParserError::MalformedHeaders)?;
        if name.is_empty() {
            return Err(ParserError::MalformedHeaders);
        }

        let name = std::str::from_utf8(name)?;
        let value = std::str::from_utf8(value)?;
        if req.env.insert(name, value).is_some() {
            return Err(ParserError::DuplicateHeader(name.to_string()));
        }
    }

    Ok(())
}
