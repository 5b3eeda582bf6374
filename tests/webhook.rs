//! Webhook notifier tests against a loopback mock endpoint

use relaykit::{Error, WebhookNotifier};
use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

struct MockResponse {
    status: u16,
    reason: &'static str,
    headers: Vec<(&'static str, String)>,
    body: &'static str,
}

impl MockResponse {
    fn new(status: u16, reason: &'static str, body: &'static str) -> Self {
        Self {
            status,
            reason,
            headers: Vec::new(),
            body,
        }
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Serve one canned response per expected request, returning the webhook
/// URL and a handle yielding the raw requests received.
fn serve(responses: Vec<MockResponse>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock listener");
    let addr = listener.local_addr().expect("mock listener addr");
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for response in responses {
            let (stream, _) = listener.accept().expect("accept");
            requests.push(answer(stream, &response));
        }
        requests
    });
    (format!("http://{}/hook", addr), handle)
}

fn answer(stream: TcpStream, response: &MockResponse) -> String {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read request line");
        if let Some(rest) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = rest.trim().parse().expect("content length");
        }
        let done = line == "\r\n" || line == "\n";
        head.push_str(&line);
        if done {
            break;
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).expect("read request body");

    let mut extra = String::new();
    for (name, value) in &response.headers {
        extra.push_str(&format!("{}: {}\r\n", name, value));
    }
    let mut stream = reader.into_inner();
    write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        response.status,
        response.reason,
        response.body.len(),
        extra,
        response.body
    )
    .expect("write response");
    stream.flush().expect("flush response");

    format!("{}{}", head, String::from_utf8_lossy(&body))
}

#[test]
fn test_send_success_includes_fallback_text() {
    let (url, handle) = serve(vec![MockResponse::new(200, "OK", "ok")]);
    let notifier = WebhookNotifier::new(url);

    notifier
        .send(&json!([{"type": "section", "text": {"type": "mrkdwn", "text": "hi"}}]))
        .expect("send");

    let requests = handle.join().expect("mock server");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("fallback"));
    assert!(requests[0].contains("blocks"));
}

#[test]
fn test_rate_limited_once_then_succeeds() {
    let (url, handle) = serve(vec![
        MockResponse::new(429, "Too Many Requests", "slow down").header("Retry-After", "0"),
        MockResponse::new(200, "OK", "ok"),
    ]);
    let notifier = WebhookNotifier::new(url);

    notifier.send(&json!([])).expect("send after one retry");

    let requests = handle.join().expect("mock server");
    assert_eq!(requests.len(), 2);
}

#[test]
fn test_persistent_rate_limit_exhausts_retry() {
    let (url, handle) = serve(vec![
        MockResponse::new(429, "Too Many Requests", "slow down").header("Retry-After", "0"),
        MockResponse::new(429, "Too Many Requests", "slow down").header("Retry-After", "0"),
    ]);
    let notifier = WebhookNotifier::new(url);

    let err = notifier.send(&json!([])).unwrap_err();
    match err {
        Error::Notification(message) => assert!(message.contains("429")),
        other => panic!("expected notification error, got {:?}", other),
    }
    let requests = handle.join().expect("mock server");
    assert_eq!(requests.len(), 2);
}

#[test]
fn test_server_error_carries_status_and_body() {
    let (url, _handle) = serve(vec![MockResponse::new(500, "Internal Server Error", "boom")]);
    let notifier = WebhookNotifier::new(url);

    let err = notifier.send(&json!([])).unwrap_err();
    match err {
        Error::Notification(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("boom"));
        }
        other => panic!("expected notification error, got {:?}", other),
    }
}

#[test]
fn test_non_200_success_status_is_rejected() {
    let (url, _handle) = serve(vec![MockResponse::new(201, "Created", "created")]);
    let notifier = WebhookNotifier::new(url);

    let err = notifier.send(&json!([])).unwrap_err();
    match err {
        Error::Notification(message) => assert!(message.contains("201")),
        other => panic!("expected notification error, got {:?}", other),
    }
}
