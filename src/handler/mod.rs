mod responses;
pub mod router;

use std::time::Duration;

use log::{debug, error};
use thiserror::Error;

use crate::config::FixtureConfig;
use crate::scgi::request::ScgiRequest;
use crate::scgi::response::Response;
use crate::scgi::status::Status;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("missing environment key {0}")]
    MissingEnvironment(&'static str),

    #[error("sleep of {units} units of {unit:?} is out of range")]
    SleepOutOfRange { units: u32, unit: Duration },
}

impl HandlerError {
    pub fn status(&self) -> Status {
        match self {
            HandlerError::MissingEnvironment(_) | HandlerError::SleepOutOfRange { .. } => {
                Status::CgiError
            }
        }
    }
}

/// Produces the response for one request. Never fails: handler errors are
/// turned into an error status line.
pub async fn handle_request(req: &ScgiRequest, config: &FixtureConfig) -> Response {
    debug!("Environment: {}", req.env);
    debug!("Body: {:?}", String::from_utf8_lossy(&req.body));

    let fixture = router::route(req.path_info());
    debug!("Path {:?} routed to {:?}", req.path_info(), fixture);

    match responses::produce(fixture, req, config.sleep_unit).await {
        Ok(res) => res,
        Err(err) => {
            error!("Handler failed: {err}");
            responses::any_error(&err)
        }
    }
}

pub fn handle_error(status: Status, meta: &str) -> Response {
    Response::new(status, meta)
}
