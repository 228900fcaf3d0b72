//! Fetch tuning.

use std::time::Duration;

use mailpull_imap::connection::DEFAULT_MAX_LITERAL_SIZE;
use mailpull_imap::{Config, Security};
use serde::{Deserialize, Serialize};

/// Timeouts and limits applied to every fetch.
///
/// Durations are whole seconds so the settings file stays readable. Missing
/// fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Bound on establishing the TCP/TLS connection.
    pub connect_timeout_secs: u64,
    /// Bound on receiving the server greeting.
    pub greeting_timeout_secs: u64,
    /// Bound on each tagged command.
    pub command_timeout_secs: u64,
    /// Bound on the FETCH completion after the literal.
    pub drain_timeout_secs: u64,
    /// Largest message accepted, in bytes.
    pub max_literal_size: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            greeting_timeout_secs: 10,
            command_timeout_secs: 30,
            drain_timeout_secs: 30,
            max_literal_size: DEFAULT_MAX_LITERAL_SIZE,
        }
    }
}

impl FetchSettings {
    /// Builds the connection configuration for one mailbox.
    #[must_use]
    pub fn imap_config(&self, host: &str, port: u16, security: Security) -> Config {
        Config::builder(host)
            .port(port)
            .security(security)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .greeting_timeout(Duration::from_secs(self.greeting_timeout_secs))
            .command_timeout(Duration::from_secs(self.command_timeout_secs))
            .drain_timeout(Duration::from_secs(self.drain_timeout_secs))
            .max_literal_size(self.max_literal_size)
            .build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_connection_defaults() {
        let config = FetchSettings::default().imap_config("imap.example.com", 993, Security::Implicit);
        let reference = Config::new("imap.example.com");

        assert_eq!(config.connect_timeout, reference.connect_timeout);
        assert_eq!(config.greeting_timeout, reference.greeting_timeout);
        assert_eq!(config.command_timeout, reference.command_timeout);
        assert_eq!(config.drain_timeout, reference.drain_timeout);
        assert_eq!(config.max_literal_size, reference.max_literal_size);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: FetchSettings = serde_json::from_str(r#"{"command_timeout_secs": 5}"#).unwrap();
        assert_eq!(settings.command_timeout_secs, 5);
        assert_eq!(settings.greeting_timeout_secs, 10);

        let config = settings.imap_config("h", 143, Security::None);
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 143);
        assert_eq!(config.security, Security::None);
    }
}
