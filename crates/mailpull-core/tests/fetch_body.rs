//! End-to-end tests of the fetch-email-body operation against a scripted
//! IMAP server on loopback.

#![allow(clippy::unwrap_used)]

use mailpull_core::{
    BodyRepository, FetchBodyRequest, FetchSettings, ResponseStatus, handle_fetch_body,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type Script = Vec<(&'static str, Vec<u8>)>;

/// Serves one connection: greets, then answers each expected verb in order
/// and returns the command lines it received.
async fn spawn_server(script: Script) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut stream = BufReader::new(socket);
        stream
            .get_mut()
            .write_all(b"* OK scripted server ready\r\n")
            .await
            .unwrap();

        let mut received = Vec::new();
        for (verb, reply) in script {
            let mut line = String::new();
            if stream.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            assert_eq!(line.split_whitespace().nth(1), Some(verb), "got {line:?}");
            received.push(line);
            stream.get_mut().write_all(&reply).await.unwrap();
        }
        received
    });

    (port, handle)
}

fn request(port: u16, message_id: &str) -> FetchBodyRequest {
    FetchBodyRequest {
        imap_host: "127.0.0.1".to_string(),
        imap_port: Some(u32::from(port)),
        imap_secure: Some(false),
        email: "user@x.com".to_string(),
        email_password: "pw".to_string(),
        folder: None,
        message_id: message_id.to_string(),
    }
}

fn fetch_response(tag: &str, seq: u32, body: &[u8]) -> Vec<u8> {
    let mut out = format!("* {seq} FETCH (BODY[] {{{}}}\r\n", body.len()).into_bytes();
    out.extend_from_slice(body);
    out.extend_from_slice(format!(")\r\n{tag} OK FETCH completed\r\n").as_bytes());
    out
}

fn logged_in() -> Script {
    vec![
        ("LOGIN", b"A1 OK LOGIN completed\r\n".to_vec()),
        ("SELECT", b"* 500 EXISTS\r\nA2 OK SELECT completed\r\n".to_vec()),
    ]
}

#[tokio::test]
async fn test_dash_locator_fetches_and_stores() {
    let message = b"From: a@x.com\r\nSubject: hi\r\n\r\nHello world\r\n";
    let mut script = logged_in();
    script.push(("FETCH", fetch_response("A3", 438, message)));
    script.push(("LOGOUT", b"* BYE\r\nA4 OK LOGOUT completed\r\n".to_vec()));
    let (port, server) = spawn_server(script).await;

    let store = BodyRepository::in_memory().await.unwrap();
    let request = request(port, "user@x.com-438-1699999999");
    let (status, response) = handle_fetch_body(&request, &FetchSettings::default(), &store).await;

    assert_eq!(status, ResponseStatus::Ok);
    assert!(response.success);
    assert_eq!(response.seq, Some(438));
    assert_eq!(response.has_body, Some(true));
    assert_eq!(response.has_attachments, Some(false));

    let stored = store
        .get_body("user@x.com", "user@x.com-438-1699999999")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.body_text, "Hello world");
    assert_eq!(stored.body_html, "");

    let received = server.await.unwrap();
    assert_eq!(received[0], "A1 LOGIN \"user@x.com\" \"pw\"\r\n");
    assert_eq!(received[1], "A2 SELECT \"INBOX\"\r\n");
    assert_eq!(received[2], "A3 FETCH 438 (BODY.PEEK[])\r\n");
}

#[tokio::test]
async fn test_message_id_locator_searches() {
    let message = b"Content-Type: text/html\r\n\r\n<p>Hi <b>there</b></p>\r\n";
    let mut script = logged_in();
    script.push(("SEARCH", b"* SEARCH 12\r\nA3 OK SEARCH completed\r\n".to_vec()));
    script.push(("FETCH", fetch_response("A4", 12, message)));
    script.push(("LOGOUT", b"A5 OK LOGOUT completed\r\n".to_vec()));
    let (port, server) = spawn_server(script).await;

    let store = BodyRepository::in_memory().await.unwrap();
    let (status, response) = handle_fetch_body(
        &request(port, "abc@mail.x.com"),
        &FetchSettings::default(),
        &store,
    )
    .await;

    assert_eq!(status, ResponseStatus::Ok);
    assert_eq!(response.seq, Some(12));

    let stored = store
        .get_body("user@x.com", "abc@mail.x.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.body_text, "Hi there");
    assert_eq!(stored.body_html, "<p>Hi <b>there</b></p>");

    let received = server.await.unwrap();
    assert_eq!(
        received[2],
        "A3 SEARCH HEADER Message-ID \"<abc@mail.x.com>\"\r\n"
    );
}

#[tokio::test]
async fn test_no_match_is_not_found() {
    let mut script = logged_in();
    script.push(("SEARCH", b"* SEARCH\r\nA3 OK SEARCH completed\r\n".to_vec()));
    script.push(("SEARCH", b"* SEARCH\r\nA4 OK SEARCH completed\r\n".to_vec()));
    script.push(("LOGOUT", b"A5 OK LOGOUT completed\r\n".to_vec()));
    let (port, server) = spawn_server(script).await;

    let store = BodyRepository::in_memory().await.unwrap();
    let (status, response) = handle_fetch_body(
        &request(port, "<gone@x.com>"),
        &FetchSettings::default(),
        &store,
    )
    .await;

    assert_eq!(status, ResponseStatus::NotFound);
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Email not found on server"));
    assert!(store.get_body("user@x.com", "<gone@x.com>").await.unwrap().is_none());

    let received = server.await.unwrap();
    assert_eq!(received.len(), 5);
}

#[tokio::test]
async fn test_login_failure_is_internal_error() {
    let script = vec![
        (
            "LOGIN",
            b"A1 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n".to_vec(),
        ),
        ("LOGOUT", b"A2 OK LOGOUT completed\r\n".to_vec()),
    ];
    let (port, server) = spawn_server(script).await;

    let store = BodyRepository::in_memory().await.unwrap();
    let (status, response) = handle_fetch_body(
        &request(port, "user@x.com-1-2"),
        &FetchSettings::default(),
        &store,
    )
    .await;

    assert_eq!(status, ResponseStatus::InternalError);
    assert!(!response.success);
    assert!(response.error.unwrap().contains("Invalid credentials"));

    let received = server.await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_refused_connection_is_internal_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let store = BodyRepository::in_memory().await.unwrap();
    let (status, response) = handle_fetch_body(
        &request(port, "user@x.com-1-2"),
        &FetchSettings::default(),
        &store,
    )
    .await;

    assert_eq!(status, ResponseStatus::InternalError);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_invalid_port_is_bad_request() {
    let store = BodyRepository::in_memory().await.unwrap();
    let mut request = request(993, "user@x.com-1-2");
    request.imap_port = Some(70_000);

    let (status, response) = handle_fetch_body(&request, &FetchSettings::default(), &store).await;

    assert_eq!(status, ResponseStatus::BadRequest);
    assert_eq!(
        response.error.as_deref(),
        Some("Invalid request: IMAP port must be 1-65535")
    );
}
