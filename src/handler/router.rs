use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::scgi::status::Status;

/// A canned behaviour the fixture can produce for a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    /// `20 text/plain` with the request environment as body.
    EchoEnvironment,
    /// A well-formed status line without body.
    Status { status: Status, meta: &'static str },
    /// Bytes written verbatim, bypassing the status line.
    Raw(&'static [u8]),
    /// Suspend for `units` sleep units, then succeed.
    Sleep { units: u32 },
    /// Echo the client certificate hash.
    ClientAuth,
    /// Any path without an entry of its own.
    Default,
}

static ROUTES: Lazy<IndexMap<&'static str, Fixture>> = Lazy::new(|| {
    IndexMap::from([
        ("", Fixture::EchoEnvironment),
        (
            "/test_redirect",
            Fixture::Status { status: Status::PermanentRedirect, meta: "/redirect/to" },
        ),
        (
            "/test_cgi_error",
            Fixture::Status { status: Status::CgiError, meta: "Testing SCGI error" },
        ),
        (
            "/test_need_cert",
            Fixture::Status {
                status: Status::ClientCertificateRequired,
                meta: "SCGI says you need a cert",
            },
        ),
        (
            "/test_bad_cert",
            Fixture::Status { status: Status::CertificateNotAuthorised, meta: "SCGI says bad cert" },
        ),
        (
            "/test_server_error",
            Fixture::Status { status: Status::NotFound, meta: "SCGI says error" },
        ),
        ("/test_actual_scgi_error_1", Fixture::Raw(b"egsfea3d\r\n")),
        ("/test_actual_scgi_error_2", Fixture::Raw(b"\r\n")),
        ("/test_actual_scgi_error_3", Fixture::Raw(b"")),
        ("/test_sleep_5", Fixture::Sleep { units: 5 }),
        ("/test_sleep_15", Fixture::Sleep { units: 15 }),
        ("/client_auth", Fixture::ClientAuth),
    ])
});

/// Exact match on `PATH_INFO`. A missing path and an unknown path both get
/// [`Fixture::Default`]; only a present, empty path echoes the environment.
pub fn route(path_info: Option<&str>) -> Fixture {
    path_info
        .and_then(|path| ROUTES.get(path))
        .copied()
        .unwrap_or(Fixture::Default)
}
