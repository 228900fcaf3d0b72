//! Command tags.

/// Hands out the tags that pair each command with its completion.
///
/// Tags run `A1`, `A2`, ... and are never reused on one connection.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: char,
    issued: u64,
}

impl TagGenerator {
    /// Creates a generator whose tags start with `prefix`.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { prefix, issued: 0 }
    }

    /// Returns a fresh tag.
    pub fn next_tag(&mut self) -> String {
        self.issued += 1;
        format!("{}{}", self.prefix, self.issued)
    }

    /// Number of tags handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.issued
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}
