use std::time::{Duration, Instant};

use async_std::task;
use log::info;

use crate::handler::HandlerError;
use crate::handler::router::Fixture;
use crate::scgi::environment::TLS_CLIENT_HASH;
use crate::scgi::request::ScgiRequest;
use crate::scgi::response::Response;
use crate::scgi::status::Status;

const TEXT_PLAIN: &str = "text/plain";

pub fn echo_environment(req: &ScgiRequest) -> Response {
    Response::with_body(Status::Success, TEXT_PLAIN, req.env.to_string())
}

pub fn other_path() -> Response {
    Response::with_body(Status::Success, TEXT_PLAIN, "some other path received\n")
}

pub fn client_auth(req: &ScgiRequest) -> Result<Response, HandlerError> {
    let hash = req
        .env
        .get(TLS_CLIENT_HASH)
        .ok_or(HandlerError::MissingEnvironment(TLS_CLIENT_HASH))?;

    Ok(Response::with_body(Status::Success, TEXT_PLAIN, format!("{hash}\n")))
}

/// Simulates a slow backend. The wait is a suspension point, so other
/// connections keep being served meanwhile. A total wait that does not fit
/// in a deadline is an error.
pub async fn sleep(units: u32, unit: Duration) -> Result<Response, HandlerError> {
    let total = unit
        .checked_mul(units)
        .filter(|total| Instant::now().checked_add(*total).is_some())
        .ok_or(HandlerError::SleepOutOfRange { units, unit })?;

    info!("Sleeping for {units} units of {unit:?}");
    task::sleep(total).await;
    Ok(Response::with_body(Status::Success, TEXT_PLAIN, format!("slept {units}\n")))
}

pub async fn produce(
    fixture: Fixture,
    req: &ScgiRequest,
    sleep_unit: Duration,
) -> Result<Response, HandlerError> {
    let res = match fixture {
        Fixture::EchoEnvironment => echo_environment(req),
        Fixture::Status { status, meta } => Response::new(status, meta),
        Fixture::Raw(bytes) => Response::raw(bytes),
        Fixture::Sleep { units } => sleep(units, sleep_unit).await?,
        Fixture::ClientAuth => client_auth(req)?,
        Fixture::Default => other_path(),
    };
    Ok(res)
}

pub fn any_error(err: &HandlerError) -> Response {
    Response::new(err.status(), &err.to_string())
}
