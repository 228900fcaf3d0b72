//! `mailpull` - pull one email body over IMAP and store it
//!
//! Serves `POST /fetch-email-body` on the configured address.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod server;
mod settings;

use std::sync::Arc;

use anyhow::Context;
use mailpull_core::BodyRepository;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server::AppState;
use settings::AppSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailpull=info,mailpull_core=info,mailpull_imap=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mailpull");

    let settings = AppSettings::load(&AppSettings::path()).await?;

    if let Some(parent) = settings.database_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let database_path = settings.database_path.to_string_lossy();
    let store = BodyRepository::new(&database_path)
        .await
        .with_context(|| format!("opening body store at {database_path}"))?;
    info!("Body store at {database_path}");

    let state = Arc::new(AppState {
        settings: settings.fetch.clone(),
        store,
    });

    server::serve(&settings.listen_addr, server::router(state)).await
}
