use crate::scgi::environment::{CONTENT_LENGTH, Environment, PATH_INFO};

/// A fully read SCGI request: the header block as an [`Environment`] and
/// exactly `CONTENT_LENGTH` bytes of body.
#[derive(Debug, Clone, Default)]
pub struct ScgiRequest {
    pub env: Environment,
    pub body: Vec<u8>,
}

impl ScgiRequest {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            body: Vec::new(),
        }
    }

    /// Declared body size. `None` when the header is missing or not a number.
    pub fn content_length(&self) -> Option<usize> {
        self.env.get(CONTENT_LENGTH)?.parse().ok()
    }

    /// `None` when the client did not send `PATH_INFO` at all, which is
    /// distinct from an empty path.
    pub fn path_info(&self) -> Option<&str> {
        self.env.get(PATH_INFO)
    }
}
