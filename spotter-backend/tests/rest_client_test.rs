use serde_json::json;
use spotter_backend::{execute_remote_call, BackendClient, Query, RestBackendClient};
use spotter_config::BackendConfig;
use spotter_core::ErrorKind;
use spotter_logging::NoopCallLogger;
use spotter_resilience::{
    classify, CallHandle, CallOptions, ClassifyContext, RetryExecutor, RetryOptions,
    RetryOverrides,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve a single canned HTTP response and hand back the raw request
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (url, server)
}

fn config(url: String) -> BackendConfig {
    BackendConfig {
        url,
        api_key: Some("anon-key".to_string()),
        ..BackendConfig::default()
    }
}

#[tokio::test]
async fn test_select_success() {
    let (url, server) = serve_once("200 OK", json!([{"id": 1, "name": "Ada"}]).to_string()).await;
    let client = RestBackendClient::new(&config(url)).unwrap();

    let response = client
        .select("athletes", &Query::new().select("id,name").eq("gym_id", 4))
        .await;

    assert_eq!(
        response.into_result().unwrap(),
        Some(json!([{"id": 1, "name": "Ada"}]))
    );

    let request = server.await.unwrap().to_lowercase();
    assert!(request.starts_with("get /rest/v1/athletes?select=id%2cname&gym_id=eq.4 http/1.1"));
    assert!(request.contains("apikey: anon-key"));
    assert!(request.contains("authorization: bearer anon-key"));
    assert!(request.contains("accept-profile: public"));
}

#[tokio::test]
async fn test_select_error_body() {
    let body = json!({
        "message": "permission denied for table payments",
        "code": "42501",
        "details": null,
        "hint": null
    })
    .to_string();
    let (url, server) = serve_once("403 Forbidden", body).await;
    let client = RestBackendClient::new(&config(url)).unwrap();

    let error = client
        .select("payments", &Query::new())
        .await
        .into_result()
        .unwrap_err();
    server.await.unwrap();

    assert_eq!(error.message, "permission denied for table payments");
    assert_eq!(error.code.as_deref(), Some("42501"));
    assert_eq!(error.status, Some(403));
}

#[tokio::test]
async fn test_closed_port_is_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = RestBackendClient::new(&config(url)).unwrap();
    let error = client
        .select("athletes", &Query::new())
        .await
        .into_result()
        .unwrap_err();

    assert_eq!(error.code.as_deref(), Some("FETCH_ERROR"));
    assert!(error.message.starts_with("Failed to fetch"));

    let normalized = classify(error.into(), &ClassifyContext::new("athletes"));
    assert_eq!(normalized.kind, ErrorKind::Network);
}

#[tokio::test]
async fn test_remote_call_through_handle() {
    let (url, server) = serve_once("200 OK", json!([{"id": 9}]).to_string()).await;
    let client = RestBackendClient::new(&config(url)).unwrap();

    let handle = CallHandle::new(RetryExecutor::with_logger(
        RetryOptions {
            base_delay: Duration::from_millis(10),
            ..RetryOptions::default()
        },
        Arc::new(NoopCallLogger),
    ));

    let query = Query::new();
    let rows = execute_remote_call(
        &handle,
        || client.select("members", &query),
        CallOptions::default().with_retry(RetryOverrides::default().max_attempts(1)),
    )
    .await
    .unwrap();
    server.await.unwrap();

    assert_eq!(rows, Some(json!([{"id": 9}])));
    assert_eq!(handle.state().total_attempts, 1);
}
