//! Message locators.
//!
//! Stored records identify their message with a free-form string. Three
//! shapes occur in practice:
//!
//! - `user@x.com-438-1699999999`: a dash-separated suffix whose first number
//!   is the sequence number at the time the record was made.
//! - `a@b|INBOX|123`: pipe-separated, last segment the sequence number.
//! - anything else: an RFC 5322 `Message-ID`, possibly wrapped in `<>` or in
//!   the second segment of a pipe-separated value.
//!
//! Numbers taken from the first two shapes are trusted without checking that
//! they still point at the same message.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::SeqNum;

#[allow(clippy::expect_used)]
static DASH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+)-(\d+)$").expect("dash suffix pattern"));

/// How to find a message in the selected mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Sequence number embedded in the locator; no SEARCH needed.
    Sequence(SeqNum),
    /// `Message-ID` value to search for, without angle brackets.
    MessageId(String),
}

impl Locator {
    /// Classifies a raw locator string.
    ///
    /// Rules are tried in a fixed order and the first structural match wins:
    /// dash suffix, then pipe suffix, then header search.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some(captures) = DASH_SUFFIX.captures(raw)
            && let Ok(n) = captures[1].parse::<u32>()
        {
            return Self::Sequence(SeqNum(n));
        }

        let segments: Vec<&str> = raw.split('|').collect();
        if segments.len() >= 3
            && let Some(last) = segments.last()
            && !last.is_empty()
            && last.bytes().all(|b| b.is_ascii_digit())
            && let Ok(n) = last.parse::<u32>()
        {
            return Self::Sequence(SeqNum(n));
        }

        let candidate = segments.get(1).copied().unwrap_or(raw);
        let id = candidate
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim();

        Self::MessageId(id.to_string())
    }

    /// Values to try with `SEARCH HEADER Message-ID`, in order.
    ///
    /// The bracketed form comes first since that is how the header is
    /// written; the bare form covers servers that match on the stripped
    /// value. An empty id yields nothing to search for.
    #[must_use]
    pub fn search_terms(&self) -> Vec<String> {
        match self {
            Self::MessageId(id) if !id.is_empty() => vec![format!("<{id}>"), id.clone()],
            _ => Vec::new(),
        }
    }
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
    fn test_dash_suffix() {
        assert_eq!(
            Locator::parse("user@x.com-438-1699999999"),
            Locator::Sequence(SeqNum(438))
        );
    }

    #[test]
    fn test_dash_suffix_wins_over_pipes() {
        assert_eq!(
            Locator::parse("a|b|c-12-34"),
            Locator::Sequence(SeqNum(12))
        );
    }

    #[test]
    fn test_dash_suffix_must_be_at_end() {
        assert_eq!(
            Locator::parse("x-1-2-abc"),
            Locator::MessageId("x-1-2-abc".to_string())
        );
    }

    #[test]
    fn test_pipe_suffix() {
        assert_eq!(
            Locator::parse("a@b|INBOX|123"),
            Locator::Sequence(SeqNum(123))
        );
    }

    #[test]
    fn test_pipe_non_numeric_tail_uses_second_segment() {
        assert_eq!(
            Locator::parse("a@b| <abc@host> |xyz"),
            Locator::MessageId("abc@host".to_string())
        );
    }

    #[test]
    fn test_two_segments_use_second() {
        assert_eq!(
            Locator::parse("account|<m1@example.com>"),
            Locator::MessageId("m1@example.com".to_string())
        );
    }

    #[test]
    fn test_plain_message_id() {
        assert_eq!(
            Locator::parse("  <CAF=abc@mail.gmail.com>  "),
            Locator::MessageId("CAF=abc@mail.gmail.com".to_string())
        );
    }

    #[test]
    fn test_overflowing_numbers_fall_through() {
        assert_eq!(
            Locator::parse("a|b|99999999999"),
            Locator::MessageId("b".to_string())
        );
    }

    #[test]
    fn test_search_terms_order() {
        let locator = Locator::parse("<id@x>");
        assert_eq!(locator.search_terms(), vec!["<id@x>".to_string(), "id@x".to_string()]);
    }

    #[test]
    fn test_search_terms_empty() {
        assert!(Locator::parse("<>").search_terms().is_empty());
        assert!(Locator::Sequence(SeqNum(1)).search_terms().is_empty());
    }
}
