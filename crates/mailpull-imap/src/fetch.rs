//! Pull one raw message from a mailbox.

#![allow(clippy::missing_errors_doc)]

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::Result;
use crate::connection::{Config, Session};
use crate::locator::Locator;
use crate::types::{Credentials, SeqNum};

/// Header searched when the locator carries no sequence number.
const MESSAGE_ID_HEADER: &str = "Message-ID";

/// What a fetch found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The message was located and downloaded.
    Found {
        /// Sequence number the message was fetched at.
        seq: SeqNum,
        /// The complete RFC 5322 message, byte for byte.
        raw: Bytes,
    },
    /// No message matched the locator.
    NotFound,
}

/// Connects, locates the message and downloads it.
///
/// Once the connection is up LOGOUT is sent whatever happens next, so a
/// failed login or a broken FETCH still closes the session politely.
pub async fn fetch_raw_message(
    config: &Config,
    credentials: &Credentials,
    folder: &str,
    locator: &str,
) -> Result<FetchOutcome> {
    let mut session = Session::connect(config).await?;
    let outcome = fetch_with_session(&mut session, credentials, folder, locator).await;
    session.logout().await;
    outcome
}

/// Runs LOGIN, SELECT, resolution and FETCH on an existing session.
///
/// Does not log out; the caller owns the session.
pub async fn fetch_with_session<S>(
    session: &mut Session<S>,
    credentials: &Credentials,
    folder: &str,
    locator: &str,
) -> Result<FetchOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    session.login(credentials).await?;
    session.select(folder).await?;

    let Some(seq) = resolve(session, &Locator::parse(locator)).await? else {
        info!(folder, locator, "message not found");
        return Ok(FetchOutcome::NotFound);
    };

    let raw = session.fetch_body(seq).await?;
    info!(folder, %seq, bytes = raw.len(), "message fetched");
    Ok(FetchOutcome::Found { seq, raw })
}

async fn resolve<S>(session: &mut Session<S>, locator: &Locator) -> Result<Option<SeqNum>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Locator::Sequence(seq) = locator {
        debug!(%seq, "sequence number taken from locator");
        return Ok(Some(*seq));
    }

    for term in locator.search_terms() {
        let hits = session.search_header(MESSAGE_ID_HEADER, &term).await?;
        if let Some(first) = hits.first() {
            return Ok(Some(*first));
        }
    }

    Ok(None)
}
