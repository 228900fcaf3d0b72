//! Sans-I/O scanners for server responses.
//!
//! The fetcher never parses a full IMAP grammar. It only needs to find a few
//! structural markers in accumulated input: the greeting, a tagged completion
//! line, the `* SEARCH` result line and the `BODY[] {N}` literal header. Each
//! scanner works on whatever bytes are buffered so far and returns `None`
//! until the marker is complete.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::types::Status;

#[allow(clippy::expect_used)]
static LITERAL_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)BODY(?:\.PEEK)?\[\]\s*\{(\d+)\}\r?\n").expect("literal header pattern")
});

/// Kind of server greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreetingKind {
    /// `* OK`: ready for LOGIN.
    Ok,
    /// `* PREAUTH`: already authenticated.
    PreAuth,
    /// `* BYE`: server refuses the connection.
    Bye,
}

/// The first line the server sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Greeting kind.
    pub kind: GreetingKind,
    /// Greeting line without the line break.
    pub line: String,
    /// Offset just past the line break.
    pub end: usize,
}

/// A tagged completion line (`<tag> OK|NO|BAD ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Completion status.
    pub status: Status,
    /// Full status line without the line break, kept for diagnostics.
    pub line: String,
    /// Offset of the first byte of the line.
    pub start: usize,
    /// Offset just past the line break.
    pub end: usize,
}

/// Location and announced size of a `BODY[] {N}` literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralHeader {
    /// Announced literal length in bytes (saturates on absurd values).
    pub len: usize,
    /// Offset of the first literal byte.
    pub end: usize,
}

/// Scans for a complete greeting line.
///
/// Returns `Some(Err(line))` when the first line is not a recognised greeting.
#[must_use]
pub fn find_greeting(buf: &[u8]) -> Option<Result<Greeting, String>> {
    let newline = buf.iter().position(|&b| b == b'\n')?;
    let line = line_text(&buf[..newline]);
    let end = newline + 1;

    let kind = if starts_with_ignore_case(line.as_bytes(), b"* OK") {
        GreetingKind::Ok
    } else if starts_with_ignore_case(line.as_bytes(), b"* PREAUTH") {
        GreetingKind::PreAuth
    } else if starts_with_ignore_case(line.as_bytes(), b"* BYE") {
        GreetingKind::Bye
    } else {
        return Some(Err(line));
    };

    Some(Ok(Greeting { kind, line, end }))
}

/// Scans for the tagged completion of `tag`.
///
/// The tag must sit at the start of the input or directly after a line break,
/// be followed by a space and then `OK`, `NO` or `BAD` in any case. Only a
/// fully received line counts.
#[must_use]
pub fn find_tagged_completion(buf: &[u8], tag: &str) -> Option<Completion> {
    let tag = tag.as_bytes();
    let mut start = 0;

    while start < buf.len() {
        let newline = buf[start..].iter().position(|&b| b == b'\n')? + start;
        let line = &buf[start..newline];

        if let Some(rest) = line.strip_prefix(tag)
            && let Some(rest) = rest.strip_prefix(b" ")
        {
            let word_end = rest
                .iter()
                .position(|&b| b == b' ' || b == b'\r')
                .unwrap_or(rest.len());
            if let Some(status) = Status::parse(&rest[..word_end]) {
                return Some(Completion {
                    status,
                    line: line_text(line),
                    start,
                    end: newline + 1,
                });
            }
        }

        start = newline + 1;
    }

    None
}

/// Scans for a `BODY[] {N}` (or `BODY.PEEK[] {N}`) literal header.
#[must_use]
pub fn find_literal_header(buf: &[u8]) -> Option<LiteralHeader> {
    let captures = LITERAL_HEADER.captures(buf)?;
    let whole = captures.get(0)?;
    let digits = captures.get(1)?.as_bytes();

    let len = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(usize::MAX);

    Some(LiteralHeader {
        len,
        end: whole.end(),
    })
}

/// Returns the first complete `* BYE` line, if the server sent one.
#[must_use]
pub fn find_bye(buf: &[u8]) -> Option<String> {
    let complete = &buf[..buf.iter().rposition(|&b| b == b'\n')?];
    complete
        .split(|&b| b == b'\n')
        .find(|line| starts_with_ignore_case(line, b"* BYE"))
        .map(line_text)
}

/// Extracts the numbers from the first `* SEARCH` line.
///
/// Non-numeric tokens (for example a trailing `(MODSEQ n)`) are skipped.
#[must_use]
pub fn parse_search(untagged: &[u8]) -> Vec<u32> {
    untagged
        .split(|&b| b == b'\n')
        .find(|line| starts_with_ignore_case(line, b"* SEARCH"))
        .map(|line| {
            line_text(&line[b"* SEARCH".len()..])
                .split_ascii_whitespace()
                .filter_map(|token| token.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn line_text(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_ok() {
        let greeting = find_greeting(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(greeting.kind, GreetingKind::Ok);
        assert_eq!(greeting.line, "* OK [CAPABILITY IMAP4rev1] ready");
        assert_eq!(greeting.end, 35);
    }

    #[test]
    fn test_greeting_incomplete() {
        assert!(find_greeting(b"* OK still typing").is_none());
    }

    #[test]
    fn test_greeting_preauth_and_bye() {
        let preauth = find_greeting(b"* PREAUTH welcome\r\n").unwrap().unwrap();
        assert_eq!(preauth.kind, GreetingKind::PreAuth);

        let bye = find_greeting(b"* BYE go away\r\n").unwrap().unwrap();
        assert_eq!(bye.kind, GreetingKind::Bye);
    }

    #[test]
    fn test_greeting_garbage() {
        let result = find_greeting(b"HTTP/1.1 400 Bad Request\r\n").unwrap();
        assert_eq!(result.unwrap_err(), "HTTP/1.1 400 Bad Request");
    }

    #[test]
    fn test_completion_at_start() {
        let completion = find_tagged_completion(b"A1 OK LOGIN completed\r\n", "A1").unwrap();
        assert_eq!(completion.status, Status::Ok);
        assert_eq!(completion.line, "A1 OK LOGIN completed");
        assert_eq!(completion.start, 0);
        assert_eq!(completion.end, 23);
    }

    #[test]
    fn test_completion_after_untagged() {
        let buf = b"* 3 EXISTS\r\n* 0 RECENT\r\nA2 ok [READ-WRITE] done\r\nleftover";
        let completion = find_tagged_completion(buf, "A2").unwrap();
        assert_eq!(completion.status, Status::Ok);
        assert_eq!(completion.start, 24);
        assert_eq!(&buf[completion.end..], b"leftover");
    }

    #[test]
    fn test_completion_no_and_bad() {
        let no = find_tagged_completion(b"A1 NO [AUTHENTICATIONFAILED] nope\r\n", "A1").unwrap();
        assert_eq!(no.status, Status::No);
        assert_eq!(no.line, "A1 NO [AUTHENTICATIONFAILED] nope");

        let bad = find_tagged_completion(b"A1 Bad syntax\n", "A1").unwrap();
        assert_eq!(bad.status, Status::Bad);
    }

    #[test]
    fn test_completion_requires_line_start() {
        assert!(find_tagged_completion(b"* NOTE A1 OK sneaky\r\n", "A1").is_none());
    }

    #[test]
    fn test_completion_ignores_longer_tag() {
        assert!(find_tagged_completion(b"A10 OK other command\r\n", "A1").is_none());
    }

    #[test]
    fn test_completion_ignores_other_words() {
        assert!(find_tagged_completion(b"A1 OKAY maybe\r\n", "A1").is_none());
    }

    #[test]
    fn test_completion_requires_full_line() {
        assert!(find_tagged_completion(b"A1 OK partial", "A1").is_none());
    }

    #[test]
    fn test_literal_header() {
        let buf = b"* 438 FETCH (BODY[] {17}\r\nabc";
        let header = find_literal_header(buf).unwrap();
        assert_eq!(header.len, 17);
        assert_eq!(&buf[header.end..], b"abc");
    }

    #[test]
    fn test_literal_header_variants() {
        assert_eq!(find_literal_header(b"BODY.PEEK[] {5}\n").unwrap().len, 5);
        assert_eq!(find_literal_header(b"body[]{0}\r\n").unwrap().len, 0);
        assert!(find_literal_header(b"BODY[] {5}").is_none());
        assert!(find_literal_header(b"BODY[TEXT] {5}\r\n").is_none());
    }

    #[test]
    fn test_literal_header_absurd_size_saturates() {
        let header = find_literal_header(b"BODY[] {99999999999999999999999}\r\n").unwrap();
        assert_eq!(header.len, usize::MAX);
    }

    #[test]
    fn test_find_bye() {
        let buf = b"* 2 EXISTS\r\n* BYE Autologout; idle too long\r\n";
        assert_eq!(find_bye(buf).unwrap(), "* BYE Autologout; idle too long");
        assert!(find_bye(b"* BYE half a li").is_none());
        assert!(find_bye(b"A1 OK done\r\n").is_none());
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(parse_search(b"* SEARCH 4 9 12\r\n"), vec![4, 9, 12]);
        assert_eq!(parse_search(b"* search 7\r\n"), vec![7]);
        assert!(parse_search(b"* SEARCH\r\n").is_empty());
        assert!(parse_search(b"* 3 EXISTS\r\n").is_empty());
    }

    #[test]
    fn test_parse_search_skips_modseq() {
        assert_eq!(parse_search(b"* SEARCH 2 5 (MODSEQ 917162500)\r\n"), vec![2, 5]);
    }

    #[test]
    fn test_parse_search_first_line_only() {
        assert_eq!(parse_search(b"* SEARCH 3\r\n* SEARCH 8\r\n"), vec![3]);
    }
}
