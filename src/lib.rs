//! An SCGI backend that answers with canned, sometimes deliberately broken,
//! responses. Point an SCGI client at its socket to exercise the client's
//! handling of redirects, error statuses, garbage replies and slow backends.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod net;
pub mod scgi;
