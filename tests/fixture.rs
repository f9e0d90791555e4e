use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_std::os::unix::net::UnixStream;
use async_std::prelude::*;
use async_std::task;
use tempfile::TempDir;

use scgi_fixture::config::FixtureConfig;
use scgi_fixture::net::server::Server;
use scgi_fixture::scgi::client;
use scgi_fixture::scgi::environment::Environment;
use scgi_fixture::scgi::response::ParsedResponse;

const UNIT: Duration = Duration::from_millis(20);
const TIMEOUT: Duration = Duration::from_secs(10);

async fn start() -> (TempDir, PathBuf) {
    start_with_unit(UNIT).await
}

async fn start_with_unit(sleep_unit: Duration) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = FixtureConfig {
        socket_path: dir.path().join("scgi_test.sock"),
        sleep_unit,
        read_timeout: Duration::from_secs(2),
        ..FixtureConfig::default()
    };

    let server = Server::bind(config).await.unwrap();
    let path = server.local_path().to_path_buf();
    task::spawn(async move { server.run().await });
    (dir, path)
}

async fn request(socket: &Path, path_info: Option<&str>, extra: &[(&str, &str)]) -> Vec<u8> {
    let mut env = Environment::new();
    env.insert("SCGI", "1");
    if let Some(path_info) = path_info {
        env.insert("PATH_INFO", path_info);
    }
    for (name, value) in extra {
        env.insert(name, value);
    }
    client::send(socket, &env, b"", TIMEOUT).await.unwrap()
}

async fn parsed(socket: &Path, path_info: &str) -> ParsedResponse {
    ParsedResponse::from_bytes(&request(socket, Some(path_info), &[]).await).unwrap()
}

#[async_std::test]
async fn empty_path_echoes_environment() {
    let (_dir, socket) = start().await;
    let extra = [("SERVER_NAME", "localhost"), ("REMOTE_ADDR", "127.0.0.1")];
    let res = ParsedResponse::from_bytes(&request(&socket, Some(""), &extra).await).unwrap();

    assert_eq!(res.code, 20);
    assert_eq!(res.meta, "text/plain");
    let body = String::from_utf8(res.body).unwrap();
    for key in ["CONTENT_LENGTH", "SCGI", "PATH_INFO", "SERVER_NAME", "REMOTE_ADDR"] {
        assert!(body.contains(key), "{key} missing from {body}");
    }
}

#[async_std::test]
async fn redirect_and_error_statuses() {
    let (_dir, socket) = start().await;

    let res = parsed(&socket, "/test_redirect").await;
    assert_eq!((res.code, res.meta.as_str()), (31, "/redirect/to"));
    assert!(res.body.is_empty());

    let res = parsed(&socket, "/test_cgi_error").await;
    assert_eq!((res.code, res.meta.as_str()), (42, "Testing SCGI error"));

    assert_eq!(parsed(&socket, "/test_need_cert").await.code, 60);
    assert_eq!(parsed(&socket, "/test_bad_cert").await.code, 61);

    let res = parsed(&socket, "/test_server_error").await;
    assert_eq!((res.code, res.meta.as_str()), (51, "SCGI says error"));
}

#[async_std::test]
async fn malformed_fixtures_write_raw_bytes() {
    let (_dir, socket) = start().await;

    let bytes = request(&socket, Some("/test_actual_scgi_error_1"), &[]).await;
    assert_eq!(bytes, b"egsfea3d\r\n");
    assert!(ParsedResponse::from_bytes(&bytes).is_err());

    let bytes = request(&socket, Some("/test_actual_scgi_error_2"), &[]).await;
    assert_eq!(bytes, b"\r\n");

    let bytes = request(&socket, Some("/test_actual_scgi_error_3"), &[]).await;
    assert!(bytes.is_empty());
}

#[async_std::test]
async fn sleep_fixtures_delay_the_response() {
    let (_dir, socket) = start().await;

    let start = Instant::now();
    let res = parsed(&socket, "/test_sleep_5").await;
    assert!(start.elapsed() >= UNIT * 5);
    assert_eq!(res.code, 20);
    assert_eq!(res.body, b"slept 5\n");

    let start = Instant::now();
    let res = parsed(&socket, "/test_sleep_15").await;
    assert!(start.elapsed() >= UNIT * 15);
    assert_eq!(res.body, b"slept 15\n");
}

#[async_std::test]
async fn out_of_range_sleep_gets_cgi_error() {
    let (_dir, socket) = start_with_unit(Duration::from_secs(u64::MAX / 10)).await;

    let res = parsed(&socket, "/test_sleep_15").await;
    assert_eq!(res.code, 42);
    assert!(res.meta.contains("out of range"), "{}", res.meta);
    assert!(res.body.is_empty());
}

#[async_std::test]
async fn sleeping_request_does_not_block_others() {
    let (_dir, socket) = start().await;

    let slow_socket = socket.clone();
    let slow = task::spawn(async move { parsed(&slow_socket, "/test_sleep_15").await });

    let start = Instant::now();
    let res = parsed(&socket, "/foo").await;
    assert!(start.elapsed() < UNIT * 15);
    assert_eq!(res.body, b"some other path received\n");

    assert_eq!(slow.await.body, b"slept 15\n");
}

#[async_std::test]
async fn client_auth_echoes_certificate_hash() {
    let (_dir, socket) = start().await;

    let bytes = request(&socket, Some("/client_auth"), &[("TLS_CLIENT_HASH", "abc123")]).await;
    let res = ParsedResponse::from_bytes(&bytes).unwrap();
    assert_eq!(res.code, 20);
    assert_eq!(res.body, b"abc123\n");

    let res = parsed(&socket, "/client_auth").await;
    assert_eq!(res.code, 42);
    assert_eq!(res.meta, "missing environment key TLS_CLIENT_HASH");
}

#[async_std::test]
async fn unknown_or_missing_path_gets_default() {
    let (_dir, socket) = start().await;

    let res = parsed(&socket, "/foo").await;
    assert_eq!(res.code, 20);
    assert_eq!(res.body, b"some other path received\n");

    let bytes = request(&socket, None, &[]).await;
    assert_eq!(bytes, b"20 text/plain\r\nsome other path received\n");
}

#[async_std::test]
async fn request_body_is_consumed() {
    let (_dir, socket) = start().await;
    let env: Environment = [("SCGI", "1"), ("PATH_INFO", "/foo")].into_iter().collect();
    let bytes = client::send(&socket, &env, b"What is the answer?", TIMEOUT)
        .await
        .unwrap();
    assert_eq!(ParsedResponse::from_bytes(&bytes).unwrap().code, 20);
}

#[async_std::test]
async fn malformed_requests_get_bad_request() {
    let (_dir, socket) = start().await;

    let mut stream = UnixStream::connect(async_std::path::Path::new(&socket)).await.unwrap();
    stream.write_all(b"x:").await.unwrap();
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).await.unwrap();
    let res = ParsedResponse::from_bytes(&bytes).unwrap();
    assert_eq!(res.code, 59);
    assert_eq!(res.meta, "invalid netstring length");

    let env: Environment = [("PATH_INFO", "/foo")].into_iter().collect();
    let bytes = client::send(&socket, &env, b"", TIMEOUT).await.unwrap();
    let res = ParsedResponse::from_bytes(&bytes).unwrap();
    assert_eq!(res.code, 59);
    assert_eq!(res.meta, "missing SCGI header");
}

#[async_std::test]
async fn duplicate_header_cannot_split_status_line() {
    let (_dir, socket) = start().await;

    let name = "X\r\n99 injected";
    let headers = format!("CONTENT_LENGTH\x000\x00SCGI\x001\x00{name}\x00a\x00{name}\x00b\x00");
    let request = format!("{}:{headers},", headers.len());

    let mut stream = UnixStream::connect(async_std::path::Path::new(&socket)).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).await.unwrap();

    assert_eq!(bytes, b"59 duplicate header \"X\\r\\n99 injected\"\r\n");
    let res = ParsedResponse::from_bytes(&bytes).unwrap();
    assert_eq!(res.code, 59);
    assert!(res.body.is_empty());
}

#[async_std::test]
async fn stale_socket_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("scgi_test.sock");
    let config = FixtureConfig {
        socket_path: socket_path.clone(),
        ..FixtureConfig::default()
    };

    drop(Server::bind(config.clone()).await.unwrap());
    assert!(socket_path.exists());

    let server = Server::bind(config).await.unwrap();
    task::spawn(async move { server.run().await });

    let res = parsed(&socket_path, "/test_redirect").await;
    assert_eq!(res.code, 31);
}
