//! Integration tests for the fetcher.
//!
//! A canned stream replays a whole server conversation in chunks of a chosen
//! size and records what the client sent. Timeout behaviour is exercised with
//! a scripted server on an in-memory duplex pipe and a paused clock.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use proptest::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpListener;

use mailpull_imap::{
    Config, Credentials, Error, FetchOutcome, SeqNum, Security, Session, fetch_raw_message,
    fetch_with_session,
};

/// Mock stream that replays canned responses in fixed-size chunks.
struct ChunkedStream {
    responses: Vec<u8>,
    pos: usize,
    chunk: usize,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl ChunkedStream {
    fn new(responses: &[u8], chunk: usize) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: responses.to_vec(),
            pos: 0,
            chunk: chunk.max(1),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for ChunkedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let remaining = self.responses.len() - self.pos;
        let to_read = remaining.min(self.chunk).min(buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.responses[start..start + to_read]);
        self.pos += to_read;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ChunkedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn config() -> Config {
    Config::builder("imap.test").security(Security::None).build()
}

fn credentials() -> Credentials {
    Credentials::new("user@x.com", "pw")
}

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8(sent.lock().unwrap().clone())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn fetch_response(tag: &str, seq: u32, body: &[u8]) -> Vec<u8> {
    let mut out = format!("* {seq} FETCH (FLAGS (\\Seen) BODY[] {{{}}}\r\n", body.len()).into_bytes();
    out.extend_from_slice(body);
    out.extend_from_slice(format!(")\r\n{tag} OK FETCH completed\r\n").as_bytes());
    out
}

const GREETING_LOGIN_SELECT: &[u8] = b"* OK [CAPABILITY IMAP4rev1] ready\r\n\
A1 OK LOGIN completed\r\n\
* 500 EXISTS\r\n* 0 RECENT\r\nA2 OK [READ-WRITE] SELECT completed\r\n";

/// Runs the whole flow over a canned conversation and logs out.
async fn run_canned(
    responses: &[u8],
    chunk: usize,
    locator: &str,
) -> (mailpull_imap::Result<FetchOutcome>, Vec<String>) {
    let (stream, sent) = ChunkedStream::new(responses, chunk);
    let mut session = Session::from_stream(stream, &config()).await.unwrap();
    let outcome = fetch_with_session(&mut session, &credentials(), "INBOX", locator).await;
    session.logout().await;
    (outcome, sent_lines(&sent))
}

#[tokio::test]
async fn test_dash_locator_skips_search() {
    let body = b"Subject: hi\r\n\r\nHello world\r\n";
    let mut responses = GREETING_LOGIN_SELECT.to_vec();
    responses.extend_from_slice(&fetch_response("A3", 438, body));
    responses.extend_from_slice(b"* BYE logging out\r\nA4 OK LOGOUT completed\r\n");

    let (outcome, sent) = run_canned(&responses, 4096, "user@x.com-438-1699999999").await;

    assert_eq!(
        outcome.unwrap(),
        FetchOutcome::Found {
            seq: SeqNum(438),
            raw: bytes::Bytes::from_static(body),
        }
    );
    assert_eq!(
        sent,
        vec![
            "A1 LOGIN \"user@x.com\" \"pw\"",
            "A2 SELECT \"INBOX\"",
            "A3 FETCH 438 (BODY.PEEK[])",
            "A4 LOGOUT",
        ]
    );
}

#[tokio::test]
async fn test_pipe_locator_skips_search() {
    let body = b"Subject: x\r\n\r\nbody";
    let mut responses = GREETING_LOGIN_SELECT.to_vec();
    responses.extend_from_slice(&fetch_response("A3", 123, body));
    responses.extend_from_slice(b"A4 OK LOGOUT completed\r\n");

    let (outcome, sent) = run_canned(&responses, 7, "a@b|INBOX|123").await;

    assert!(matches!(outcome.unwrap(), FetchOutcome::Found { seq: SeqNum(123), .. }));
    assert!(sent.iter().all(|line| !line.contains("SEARCH")));
    assert_eq!(sent[2], "A3 FETCH 123 (BODY.PEEK[])");
}

#[tokio::test]
async fn test_message_id_retries_without_brackets() {
    let body = b"Subject: found\r\n\r\nyes";
    let mut responses = GREETING_LOGIN_SELECT.to_vec();
    responses.extend_from_slice(b"* SEARCH\r\nA3 OK SEARCH completed\r\n");
    responses.extend_from_slice(b"* SEARCH 5 8\r\nA4 OK SEARCH completed\r\n");
    responses.extend_from_slice(&fetch_response("A5", 5, body));
    responses.extend_from_slice(b"A6 OK LOGOUT completed\r\n");

    let (outcome, sent) = run_canned(&responses, 13, "<CAF123@mail.example.com>").await;

    assert!(matches!(outcome.unwrap(), FetchOutcome::Found { seq: SeqNum(5), .. }));
    assert_eq!(
        &sent[2..],
        &[
            "A3 SEARCH HEADER Message-ID \"<CAF123@mail.example.com>\"",
            "A4 SEARCH HEADER Message-ID \"CAF123@mail.example.com\"",
            "A5 FETCH 5 (BODY.PEEK[])",
            "A6 LOGOUT",
        ]
    );
}

#[tokio::test]
async fn test_bracketed_hit_needs_one_search() {
    let body = b"x";
    let mut responses = GREETING_LOGIN_SELECT.to_vec();
    responses.extend_from_slice(b"* SEARCH 42\r\nA3 OK SEARCH completed\r\n");
    responses.extend_from_slice(&fetch_response("A4", 42, body));
    responses.extend_from_slice(b"A5 OK LOGOUT completed\r\n");

    let (outcome, sent) = run_canned(&responses, 4096, "acct|<m@x>").await;

    assert!(matches!(outcome.unwrap(), FetchOutcome::Found { seq: SeqNum(42), .. }));
    assert_eq!(sent.iter().filter(|line| line.contains("SEARCH")).count(), 1);
}

#[tokio::test]
async fn test_empty_search_is_not_found_without_fetch() {
    let mut responses = GREETING_LOGIN_SELECT.to_vec();
    responses.extend_from_slice(b"* SEARCH\r\nA3 OK SEARCH completed\r\n");
    responses.extend_from_slice(b"* SEARCH\r\nA4 OK SEARCH completed\r\n");
    responses.extend_from_slice(b"A5 OK LOGOUT completed\r\n");

    let (outcome, sent) = run_canned(&responses, 3, "<gone@x>").await;

    assert_eq!(outcome.unwrap(), FetchOutcome::NotFound);
    assert!(sent.iter().all(|line| !line.contains("FETCH")));
    assert_eq!(sent.last().unwrap(), "A5 LOGOUT");
}

#[tokio::test]
async fn test_auth_failure_still_logs_out() {
    let responses = b"* OK ready\r\n\
A1 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n\
A2 OK LOGOUT completed\r\n";

    let (outcome, sent) = run_canned(responses, 4096, "x-1-2").await;

    assert!(matches!(outcome, Err(Error::Auth(line)) if line.contains("Invalid credentials")));
    assert_eq!(sent, vec!["A1 LOGIN \"user@x.com\" \"pw\"", "A2 LOGOUT"]);
}

#[tokio::test]
async fn test_special_characters_are_escaped() {
    let responses = b"* OK ready\r\nA1 OK\r\nA2 OK\r\n";
    let (stream, sent) = ChunkedStream::new(responses, 4096);
    let mut session = Session::from_stream(stream, &config()).await.unwrap();

    session
        .login(&Credentials::new("we\"ird", "pa\\ss\"word"))
        .await
        .unwrap();
    session.select("Archive \"2024\"").await.unwrap();

    assert_eq!(
        sent_lines(&sent),
        vec![
            "A1 LOGIN \"we\\\"ird\" \"pa\\\\ss\\\"word\"",
            "A2 SELECT \"Archive \\\"2024\\\"\"",
        ]
    );
}

proptest! {
    #[test]
    fn prop_literal_is_exact_for_any_chunking(
        body in proptest::collection::vec(any::<u8>(), 0..600),
        chunk in 1usize..80,
    ) {
        let mut responses = GREETING_LOGIN_SELECT.to_vec();
        responses.extend_from_slice(&fetch_response("A3", 17, &body));
        responses.extend_from_slice(b"A4 OK LOGOUT completed\r\n");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (outcome, _) = runtime.block_on(run_canned(&responses, chunk, "m-17-0"));

        match outcome.unwrap() {
            FetchOutcome::Found { seq, raw } => {
                prop_assert_eq!(seq, SeqNum(17));
                prop_assert_eq!(&raw[..], &body[..]);
            }
            FetchOutcome::NotFound => prop_assert!(false, "expected a message"),
        }
    }
}

/// Scripted server: for each step, read one command line, check its verb,
/// then write the canned reply. Stays silent afterwards when `hang` is set.
async fn serve<S>(stream: S, script: Vec<(&'static str, Vec<u8>)>, hang: bool)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    stream
        .get_mut()
        .write_all(b"* OK scripted server ready\r\n")
        .await
        .unwrap();

    for (verb, reply) in script {
        let mut line = String::new();
        if stream.read_line(&mut line).await.unwrap() == 0 {
            return;
        }
        assert!(
            line.split_whitespace().nth(1) == Some(verb),
            "expected {verb}, got {line:?}"
        );
        stream.get_mut().write_all(&reply).await.unwrap();
    }

    if hang {
        std::future::pending::<()>().await;
    }
}

fn login_select_script() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("LOGIN", b"A1 OK LOGIN completed\r\n".to_vec()),
        ("SELECT", b"A2 OK SELECT completed\r\n".to_vec()),
    ]
}

#[tokio::test]
async fn test_fetch_raw_message_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let body = b"From: a@x\r\nSubject: tcp\r\n\r\nover the wire\r\n".to_vec();
    let mut script = login_select_script();
    script.push(("FETCH", fetch_response("A3", 9, &body)));
    script.push(("LOGOUT", b"* BYE\r\nA4 OK LOGOUT completed\r\n".to_vec()));

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        serve(socket, script, false).await;
    });

    let config = Config::builder("127.0.0.1")
        .port(port)
        .security(Security::None)
        .build();
    let outcome = fetch_raw_message(&config, &credentials(), "INBOX", "x-9-0")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Found {
            seq: SeqNum(9),
            raw: bytes::Bytes::from(body),
        }
    );
    server.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stalled_literal_is_framing_error() {
    let (client, server) = tokio::io::duplex(4096);
    let mut script = login_select_script();
    script.push(("FETCH", b"* 3 FETCH (BODY[] {100}\r\nonly part of it".to_vec()));
    tokio::spawn(serve(server, script, true));

    let mut session = Session::from_stream(client, &config()).await.unwrap();
    let outcome = fetch_with_session(&mut session, &credentials(), "INBOX", "x-3-0").await;

    assert!(matches!(outcome, Err(Error::Literal(msg)) if msg.contains("truncated")));
}

#[tokio::test(start_paused = true)]
async fn test_missing_fetch_completion_still_returns_literal() {
    let (client, server) = tokio::io::duplex(4096);
    let mut script = login_select_script();
    script.push(("FETCH", b"* 3 FETCH (BODY[] {5}\r\nhello".to_vec()));
    tokio::spawn(serve(server, script, true));

    let config = Config::builder("imap.test")
        .security(Security::None)
        .drain_timeout(Duration::from_secs(2))
        .build();
    let mut session = Session::from_stream(client, &config).await.unwrap();
    let outcome = fetch_with_session(&mut session, &credentials(), "INBOX", "x-3-0")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Found {
            seq: SeqNum(3),
            raw: bytes::Bytes::from_static(b"hello"),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_silent_select_times_out() {
    let (client, server) = tokio::io::duplex(4096);
    let script = vec![("LOGIN", b"A1 OK LOGIN completed\r\n".to_vec())];
    tokio::spawn(serve(server, script, true));

    let mut session = Session::from_stream(client, &config()).await.unwrap();
    let outcome = fetch_with_session(&mut session, &credentials(), "INBOX", "x-3-0").await;

    assert!(matches!(outcome, Err(Error::Timeout(d)) if d == Duration::from_secs(30)));
}
