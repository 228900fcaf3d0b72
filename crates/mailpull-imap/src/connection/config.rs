//! Connection configuration types.

use std::time::Duration;

/// Default bound on establishing the TCP/TLS connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on receiving the server greeting.
const DEFAULT_GREETING_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a tagged command's completion.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on draining the FETCH completion after the literal.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest literal the fetcher accepts.
pub const DEFAULT_MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    Implicit,
}

impl Security {
    /// Maps the boolean TLS flag used by callers onto a security mode.
    #[must_use]
    pub const fn from_tls_flag(use_tls: bool) -> Self {
        if use_tls { Self::Implicit } else { Self::None }
    }

    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 143,
            Self::Implicit => 993,
        }
    }
}

/// IMAP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// How long to wait for the `* OK` greeting.
    pub greeting_timeout: Duration,
    /// How long to wait for a tagged completion.
    pub command_timeout: Duration,
    /// How long to wait for the FETCH completion once the literal is read.
    pub drain_timeout: Duration,
    /// Maximum accepted literal size in bytes.
    pub max_literal_size: usize,
}

impl Config {
    /// Creates a new configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    greeting_timeout: Duration,
    command_timeout: Duration,
    drain_timeout: Duration,
    max_literal_size: usize,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            greeting_timeout: DEFAULT_GREETING_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            max_literal_size: DEFAULT_MAX_LITERAL_SIZE,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the greeting timeout.
    #[must_use]
    pub const fn greeting_timeout(mut self, timeout: Duration) -> Self {
        self.greeting_timeout = timeout;
        self
    }

    /// Sets the per-command timeout.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the FETCH drain timeout.
    #[must_use]
    pub const fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Sets the maximum literal size.
    #[must_use]
    pub const fn max_literal_size(mut self, bytes: usize) -> Self {
        self.max_literal_size = bytes;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.connect_timeout,
            greeting_timeout: self.greeting_timeout,
            command_timeout: self.command_timeout,
            drain_timeout: self.drain_timeout,
            max_literal_size: self.max_literal_size,
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
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_tls_flag() {
        assert_eq!(Security::from_tls_flag(true), Security::Implicit);
        assert_eq!(Security::from_tls_flag(false), Security::None);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.greeting_timeout, Duration::from_secs(10));
        assert_eq!(config.command_timeout, Duration::from_secs(30));
        assert_eq!(config.drain_timeout, Duration::from_secs(30));
        assert_eq!(config.address(), "imap.example.com:993");
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(1993)
            .security(Security::None)
            .connect_timeout(Duration::from_secs(5))
            .command_timeout(Duration::from_secs(7))
            .max_literal_size(1024)
            .build();

        assert_eq!(config.port, 1993);
        assert_eq!(config.security, Security::None);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.command_timeout, Duration::from_secs(7));
        assert_eq!(config.max_literal_size, 1024);
    }

    #[test]
    fn test_config_builder_default_port() {
        let config = Config::builder("imap.example.com")
            .security(Security::None)
            .build();

        assert_eq!(config.port, 143);
    }
}
