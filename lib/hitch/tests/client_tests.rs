//! Integration tests for `Client` over `HyperTransport` using wiremock.

use std::time::Duration;

use assert2::{check, let_assert};
use hitch::{
    CancelToken, Client, ClientConfig, Error, HyperTransport, RequestChain, RequestDraft,
    ResponseChain, StatusCode, Step, header, req, resp,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header as header_is, method, path, query_param},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn alice() -> User {
    User {
        id: 1,
        name: "Alice".to_string(),
    }
}

async fn serve_user(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .mount(server)
        .await;
}

// ============================================================================
// Convenience calls
// ============================================================================

#[tokio::test]
async fn get_json_decodes_body() {
    let server = MockServer::start().await;
    serve_user(&server).await;

    let client = Client::new().expect("client");
    let user: User = client
        .get_json(&format!("{}/users/1", server.uri()))
        .await
        .expect("user");

    check!(user == alice());
}

#[tokio::test]
async fn post_json_sends_json_body() {
    let server = MockServer::start().await;
    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };
    let output = User {
        id: 42,
        name: "Bob".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header_is("content-type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(&output))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new().expect("client");
    let created: User = client
        .post_json(&format!("{}/users", server.uri()), &input)
        .await
        .expect("created");

    check!(created == output);
}

#[tokio::test]
async fn raw_calls_use_their_method() {
    let server = MockServer::start().await;
    for verb in ["DELETE", "PUT"] {
        Mock::given(method(verb))
            .and(path("/items/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = Client::new().expect("client");
    let url = format!("{}/items/7", server.uri());

    let deleted = client.delete(&url).await.expect("delete");
    check!(deleted.status() == StatusCode::NO_CONTENT);

    let put = client.put(&url, "payload").await.expect("put");
    check!(put.status() == StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn get_lines_reads_event_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header_is("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: one\n\n  data: two  \n\n"),
        )
        .mount(&server)
        .await;

    let client = Client::new().expect("client");
    let mut stream = client
        .get_lines(&format!("{}/events", server.uri()))
        .await
        .expect("stream");

    let mut lines = Vec::new();
    while let Some(line) = stream.next_line().await {
        lines.push(line.expect("line"));
    }
    check!(lines == ["data: one", "data: two"]);
}

/// Serves one chunked event line, then holds the connection open until told to stop.
async fn serve_open_event_stream(listener: TcpListener, stop: oneshot::Receiver<()>) {
    let Ok((mut socket, _)) = listener.accept().await else {
        return;
    };

    let mut request = Vec::new();
    let mut buf = [0_u8; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(read) => request.extend_from_slice(&buf[..read]),
        }
    }

    let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
    let event = "data: one\n";
    let chunk = format!("{:x}\r\n{event}\r\n", event.len());
    if socket.write_all(head.as_bytes()).await.is_err() || socket.write_all(chunk.as_bytes()).await.is_err() {
        return;
    }
    let _ = socket.flush().await;
    let _ = stop.await;
}

#[tokio::test]
async fn get_lines_yields_lines_while_connection_stays_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (stop, stopped) = oneshot::channel();
    let server = tokio::spawn(serve_open_event_stream(listener, stopped));

    let config = ClientConfig::builder().timeout(Duration::from_secs(2)).build();
    let client = Client::with_config(config).expect("client");
    let mut lines = client
        .get_lines(&format!("http://{addr}/events"))
        .await
        .expect("headers");

    let first = tokio::time::timeout(Duration::from_secs(1), lines.next_line())
        .await
        .expect("first line arrives before the connection closes");
    let_assert!(Some(Ok(line)) = first);
    check!(line == "data: one");

    // Nothing else was sent: the next line is still pending
    let second = tokio::time::timeout(Duration::from_millis(100), lines.next_line()).await;
    check!(second.is_err());

    lines.close();
    let _ = stop.send(());
    server.await.expect("server");
}

#[tokio::test]
async fn cancel_token_ends_open_event_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (stop, stopped) = oneshot::channel();
    let server = tokio::spawn(serve_open_event_stream(listener, stopped));

    let token = CancelToken::new();
    let mut draft = RequestDraft::new();
    RequestChain::new()
        .with(req::base_url(format!("http://{addr}/events")))
        .with(req::cancel_on(token.clone()))
        .apply(&mut draft)
        .expect("draft");
    draft.set_streamed_response(true);

    let client = Client::new().expect("client");
    let mut lines = client.execute(draft).await.expect("headers").into_lines();
    let_assert!(Some(Ok(line)) = lines.next_line().await);
    check!(line == "data: one");

    token.cancel();
    let ended = tokio::time::timeout(Duration::from_secs(1), lines.next_line())
        .await
        .expect("stream ends once cancelled");
    check!(ended.is_none());

    let _ = stop.send(());
    server.await.expect("server");
}

// ============================================================================
// Option chains
// ============================================================================

#[tokio::test]
async fn send_applies_both_chains() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(query_param("fields", "id,name"))
        .and(header_is("user-agent", "hitch-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .mount(&server)
        .await;

    let client = Client::new().expect("client");
    let mut user = User::default();
    let mut raw = Vec::new();

    client
        .send(
            RequestChain::new()
                .with(req::get())
                .with(req::base_url(server.uri()))
                .with(req::path("/users/1"))
                .with(req::query("fields", "id,name"))
                .with(req::user_agent("hitch-tests")),
            ResponseChain::new()
                .with(resp::allowed_status(resp::STATUS_2XX))
                .with(resp::tee(&mut raw))
                .with(resp::decode_json(&mut user)),
        )
        .await
        .expect("send");

    check!(user == alice());
    let echoed: User = serde_json::from_slice(&raw).expect("raw json");
    check!(echoed == alice());
}

#[tokio::test]
async fn status_rejection_reports_position() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let client = Client::new().expect("client");
    let mut user = User::default();
    let result = client
        .send(
            RequestChain::new().with(req::base_url(server.uri())),
            ResponseChain::new()
                .with(resp::allowed_status([StatusCode::OK]))
                .with(resp::decode_json(&mut user)),
        )
        .await;

    let_assert!(Err(err) = result);
    check!(err.step_position() == Some(1));
    check!(err.is_protocol());
    check!(!err.is_transport());
    let_assert!(Error::StatusCode { code, phrase } = err.root_cause());
    check!(*code == 404);
    check!(phrase == "404 Not Found");
    check!(user == User::default());
}

#[tokio::test]
async fn content_length_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0123456789"))
        .mount(&server)
        .await;

    let client = Client::new().expect("client");
    let result = client
        .send(
            RequestChain::new().with(req::base_url(server.uri())),
            ResponseChain::new().with(resp::max_content_length(4)),
        )
        .await;

    let_assert!(Err(err) = result);
    let_assert!(Error::MaxContentLength { ceiling, actual } = err.root_cause());
    check!(*ceiling == 4);
    check!(*actual == Some(10));
}

// ============================================================================
// Deadlines and cancellation
// ============================================================================

#[tokio::test]
async fn request_timeout_option() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = Client::new().expect("client");
    let result = client
        .send(
            RequestChain::new()
                .with(req::base_url(server.uri()))
                .with(req::timeout(Duration::from_millis(50))),
            ResponseChain::new(),
        )
        .await;

    let_assert!(Err(err) = result);
    check!(err.is_timeout());
    check!(err.is_transport());
}

#[tokio::test]
async fn client_timeout_applies_without_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .timeout(Duration::from_millis(50))
        .build();
    let client = Client::with_config(config).expect("client");

    let_assert!(Err(Error::Timeout) = client.get(&server.uri()).await);
}

#[tokio::test]
async fn cancel_token_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let token = CancelToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let client = Client::new().expect("client");
    let result = client
        .send(
            RequestChain::new()
                .with(req::base_url(server.uri()))
                .with(req::cancel_on(token)),
            ResponseChain::new(),
        )
        .await;

    let_assert!(Err(Error::Cancelled) = result);
}

#[tokio::test]
async fn cancelled_token_never_sends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancelToken::new();
    token.cancel();

    let client = Client::new().expect("client");
    let result = client
        .send(
            RequestChain::new()
                .with(req::base_url(server.uri()))
                .with(req::cancel_on(token)),
            ResponseChain::new(),
        )
        .await;

    let_assert!(Err(Error::Cancelled) = result);
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let client = Client::new().expect("client");
    let_assert!(Err(err) = client.get("http://127.0.0.1:1/").await);
    check!(err.is_transport());
    check!(!err.is_protocol());
}

// ============================================================================
// Client configuration
// ============================================================================

#[tokio::test]
async fn added_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(query_param("api_key", "k"))
        .and(header_is("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alice()))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .header(
            header::HeaderName::from_static("x-trace"),
            header::HeaderValue::from_static("abc"),
        )
        .query("api_key", "k")
        .build();
    let client = Client::with_config(config).expect("client");

    let user: User = client
        .get_json(&format!("{}/users/1", server.uri()))
        .await
        .expect("user");
    check!(user == alice());
}

#[tokio::test]
async fn basic_auth_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_is("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder().basic_auth("user", "pass").build();
    let client = Client::with_config(config).expect("client");

    let response = client.get(&server.uri()).await.expect("response");
    check!(response.is_success());
}

#[tokio::test]
async fn append_slash_rewrites_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder().append_slash(true).build();
    let client = Client::with_config(config).expect("client");

    let response = client
        .get(&format!("{}/items?page=2", server.uri()))
        .await
        .expect("response");
    check!(response.status() == StatusCode::OK);
}

#[tokio::test]
async fn logging_transport() {
    let server = MockServer::start().await;
    serve_user(&server).await;

    let transport = HyperTransport::builder()
        .timeout(Duration::from_secs(5))
        .with_debug_logging()
        .build()
        .expect("transport");
    let client = Client::with_transport(transport, ClientConfig::builder().debug(true).build());

    let user: User = client
        .get_json(&format!("{}/users/1", server.uri()))
        .await
        .expect("user");
    check!(user == alice());
}
