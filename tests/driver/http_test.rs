//! HTTP driver contract tests against local sockets.

use std::time::Duration;

use proofgate::driver::{DriverContext, DriverError, HttpDriver, HttpInput, Limits};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok";

/// Serve one connection: reply with `response`, or hold it open silently.
async fn one_shot_server(response: Option<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            match response {
                Some(payload) => {
                    let _ = socket.write_all(payload.as_bytes()).await;
                }
                None => tokio::time::sleep(Duration::from_secs(5)).await,
            }
        }
    });
    format!("http://{addr}/status")
}

fn ctx_allowing(prefix: &str, timeout_ms: u64) -> DriverContext {
    DriverContext {
        allowlist: vec![prefix.to_owned()],
        limits: Limits {
            timeout_ms: Some(timeout_ms),
            max_data_size: None,
        },
        ..DriverContext::default()
    }
}

#[tokio::test]
async fn empty_url_is_a_configuration_error() {
    let driver = HttpDriver::new();
    let err = driver
        .execute(&HttpInput::get("  "), &DriverContext::default())
        .await
        .expect_err("blank url must be rejected");
    assert!(matches!(err, DriverError::Configuration(_)));
}

#[tokio::test]
async fn unparseable_url_is_a_configuration_error() {
    let driver = HttpDriver::new();
    let err = driver
        .execute(&HttpInput::get("not a url"), &DriverContext::default())
        .await
        .expect_err("malformed url must be rejected");
    assert!(matches!(err, DriverError::Configuration(_)));
}

#[tokio::test]
async fn invalid_method_is_a_configuration_error() {
    let driver = HttpDriver::new();
    let input = HttpInput {
        method: "NOT A METHOD".to_owned(),
        ..HttpInput::get("https://api.example.com")
    };
    let err = driver
        .execute(&input, &DriverContext::default())
        .await
        .expect_err("malformed method must be rejected");
    assert!(matches!(err, DriverError::Configuration(_)));
}

#[tokio::test]
async fn disallowed_url_is_a_policy_violation() {
    let driver = HttpDriver::new();
    let input = HttpInput::get("https://evil.example.com/v1/exfil");
    let ctx = ctx_allowing("https://api.example.com", 1_000);

    let err = driver
        .execute(&input, &ctx)
        .await
        .expect_err("disallowed url must be rejected");

    assert!(
        matches!(err, DriverError::PolicyViolation { ref target }
            if target == "https://evil.example.com/v1/exfil"),
        "expected PolicyViolation naming the url, got: {err}"
    );
}

#[tokio::test]
async fn successful_request_captures_status_and_body() {
    let url = one_shot_server(Some(OK_RESPONSE)).await;
    let driver = HttpDriver::new();
    let ctx = ctx_allowing("http://127.0.0.1", 2_000);

    let outcome = driver
        .execute(&HttpInput::get(url.clone()), &ctx)
        .await
        .expect("allowed request should resolve");

    assert!(outcome.success());
    assert_eq!(outcome.status, Some(200));
    assert_eq!(outcome.body, "ok");
    assert_eq!(outcome.url, url);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn deadline_expiry_resolves_with_failure_outcome() {
    let url = one_shot_server(None).await;
    let driver = HttpDriver::new();
    let ctx = ctx_allowing("http://127.0.0.1", 100);

    let outcome = driver
        .execute(&HttpInput::get(url), &ctx)
        .await
        .expect("timeout must resolve as a value");

    assert!(!outcome.success());
    assert!(outcome.timed_out);
    assert_eq!(outcome.status, None);
    assert!(
        outcome.error.as_deref().is_some_and(|e| !e.is_empty()),
        "timeout must carry failure text"
    );
}

#[tokio::test]
async fn connection_failure_resolves_with_failure_outcome() {
    // Bind then drop to find a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let driver = HttpDriver::new();
    let ctx = ctx_allowing("http://127.0.0.1", 2_000);

    let outcome = driver
        .execute(&HttpInput::get(format!("http://{addr}/")), &ctx)
        .await
        .expect("transport failure must resolve as a value");

    assert!(!outcome.success());
    assert_eq!(outcome.status, None);
    assert!(outcome.error.is_some());
}
