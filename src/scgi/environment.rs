//! CGI-style environment carried by an [`ScgiRequest`](crate::scgi::request::ScgiRequest).
//!
//! The SCGI header block is a flat list of `name\0value\0` pairs. They are
//! kept in an ordered map so that the order chosen by the client survives,
//! which matters in two places: `CONTENT_LENGTH` must come first (checked by
//! the [`validator`](crate::scgi::validator)), and echoing the environment
//! back produces the same text for the same request.
//!
//! Names and values are stored as received. No key is treated specially here.

use indexmap::IndexMap;
use std::fmt;

pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
pub const PATH_INFO: &str = "PATH_INFO";
pub const SCGI: &str = "SCGI";
pub const TLS_CLIENT_HASH: &str = "TLS_CLIENT_HASH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: IndexMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            vars: IndexMap::new(),
        }
    }

    /// Inserts a variable, returning the previous value if the name was
    /// already present. The original insertion position is kept.
    pub fn insert(&mut self, name: &str, value: &str) -> Option<String> {
        self.vars.insert(name.to_string(), value.to_string())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// The first variable of the header block.
    pub fn first(&self) -> Option<(&str, &str)> {
        self.vars
            .first()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Environment {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (name, value) in iter {
            env.insert(name, value);
        }
        env
    }
}

/// Renders the environment as `{'NAME': 'value', ...}`.
impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': '{}'", name, value)?;
        }
        f.write_str("}")
    }
}
