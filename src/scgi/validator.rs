use thiserror::Error;

use crate::config::FixtureConfig;
use crate::scgi::environment::{CONTENT_LENGTH, SCGI};
use crate::scgi::request::ScgiRequest;
use crate::scgi::status::Status;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("CONTENT_LENGTH must be the first header")]
    ContentLengthNotFirst,

    #[error("malformed CONTENT_LENGTH {0:?}")]
    MalformedContentLength(String),

    #[error("body of {size} bytes exceeds {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("missing SCGI header")]
    MissingScgiHeader,

    #[error("unsupported SCGI version {0:?}")]
    UnsupportedScgiVersion(String),
}

impl ValidatorError {
    pub fn into_status(self) -> Status {
        Status::BadRequest
    }
}

pub struct Validator;

impl Validator {
    fn validate_content_length(req: &ScgiRequest, max_body_size: usize) -> Result<(), ValidatorError> {
        let value = match req.env.first() {
            Some((CONTENT_LENGTH, value)) => value,
            _ => return Err(ValidatorError::ContentLengthNotFirst),
        };

        let malformed = || ValidatorError::MalformedContentLength(value.to_string());
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let size = value.parse::<usize>().map_err(|_| malformed())?;

        if size > max_body_size {
            return Err(ValidatorError::PayloadTooLarge {
                size,
                max: max_body_size,
            });
        }

        Ok(())
    }

    fn validate_scgi_version(req: &ScgiRequest) -> Result<(), ValidatorError> {
        match req.env.get(SCGI) {
            Some("1") => Ok(()),
            Some(other) => Err(ValidatorError::UnsupportedScgiVersion(other.to_string())),
            None => Err(ValidatorError::MissingScgiHeader),
        }
    }

    /// Checks the header block of a request. Run once the headers are parsed
    /// and before the body is read.
    pub fn validate_request(req: &ScgiRequest, config: &FixtureConfig) -> Result<(), ValidatorError> {
        Self::validate_content_length(req, config.max_body_size)?;

        if config.require_scgi_header {
            Self::validate_scgi_version(req)?;
        }

        Ok(())
    }
}
