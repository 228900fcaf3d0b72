//! Transport: plain TCP or TLS over TCP.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use super::config::{Config, Security};
use crate::{Error, Result};

/// Built once; the webpki root set does not change at runtime.
static TLS_CONNECTOR: LazyLock<TlsConnector> = LazyLock::new(|| {
    let roots = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
});

/// A connected socket, with or without TLS.
pub enum ImapStream {
    /// Plaintext TCP.
    Plain(TcpStream),
    /// TLS over TCP (boxed, the TLS state is large).
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Forwards a poll call to whichever stream is inside.
macro_rules! dispatch {
    ($this:expr, $stream:ident => $call:expr) => {
        match $this.get_mut() {
            Self::Plain($stream) => {
                let $stream = Pin::new($stream);
                $call
            }
            Self::Tls($stream) => {
                let $stream = Pin::new($stream.as_mut());
                $call
            }
        }
    };
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        dispatch!(self, s => s.poll_read(cx, buf))
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        dispatch!(self, s => s.poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        dispatch!(self, s => s.poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        dispatch!(self, s => s.poll_shutdown(cx))
    }
}

/// Opens a TCP socket to the configured address.
async fn open_tcp(config: &Config) -> Result<TcpStream> {
    let tcp = TcpStream::connect(config.address()).await?;
    // Commands are single short lines; don't hold them back.
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

/// Connects and completes a TLS handshake against the webpki roots.
pub async fn connect_tls(config: &Config) -> Result<ImapStream> {
    let server_name = ServerName::try_from(config.host.clone())?;
    let tcp = open_tcp(config).await?;
    let tls = TLS_CONNECTOR.connect(server_name, tcp).await?;
    Ok(ImapStream::Tls(Box::new(tls)))
}

/// Connects without encryption.
pub async fn connect_plain(config: &Config) -> Result<ImapStream> {
    Ok(ImapStream::Plain(open_tcp(config).await?))
}

/// Opens the transport described by `config`, bounded by its connect timeout.
///
/// Socket failures and the timeout both surface as `Error::Connection`.
pub async fn connect(config: &Config) -> Result<ImapStream> {
    debug!(address = %config.address(), security = ?config.security, "connecting");

    let attempt = async {
        match config.security {
            Security::Implicit => connect_tls(config).await,
            Security::None => connect_plain(config).await,
        }
    };

    match tokio::time::timeout(config.connect_timeout, attempt).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(Error::Io(e))) => Err(Error::Connection(format!("{}: {e}", config.address()))),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(Error::Connection(format!(
            "{}: no connection within {:?}",
            config.address(),
            config.connect_timeout
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn plain_config(port: u16) -> Config {
        Config::builder("127.0.0.1")
            .port(port)
            .security(Security::None)
            .build()
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        // Bind then drop to get a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = connect(&plain_config(port)).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_plain_to_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = connect(&plain_config(port)).await.unwrap();
        assert!(!stream.is_tls());
    }

    #[tokio::test]
    async fn test_tls_rejects_bad_host_name() {
        let config = Config::builder("not a host name")
            .port(993)
            .security(Security::Implicit)
            .build();

        let result = connect(&config).await;
        assert!(matches!(result, Err(Error::InvalidDnsName(_))));
    }
}
