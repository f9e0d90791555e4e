//! SCGI wire protocol: the request side (netstring header block and body)
//! and the `<code> <meta>\r\n` response convention used by the proxy in
//! front of the fixture.

pub mod client;
pub mod environment;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;
pub mod validator;
