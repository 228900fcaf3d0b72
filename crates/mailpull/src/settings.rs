//! Application settings.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mailpull_core::FetchSettings;
use serde::{Deserialize, Serialize};

/// Environment variable naming an alternative settings file.
const SETTINGS_ENV: &str = "MAILPULL_SETTINGS";

/// Application settings loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Address the HTTP endpoint listens on.
    pub listen_addr: String,
    /// `SQLite` file holding the stored bodies.
    pub database_path: PathBuf,
    /// Timeouts and limits for each fetch.
    pub fetch: FetchSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            database_path: app_dir(dirs::data_dir()).join("bodies.db"),
            fetch: FetchSettings::default(),
        }
    }
}

impl AppSettings {
    /// Settings file location: `MAILPULL_SETTINGS` if set, else the user
    /// config directory.
    #[must_use]
    pub fn path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV).map_or_else(
            || app_dir(dirs::config_dir()).join("settings.json"),
            PathBuf::from,
        )
    }

    /// Load settings from file. A missing file gives the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join("mailpull")
}
