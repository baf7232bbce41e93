//! Settings file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Directory name under the platform config and data directories.
const APP_DIR: &str = "civichat";

/// Log filter used when neither `RUST_LOG` nor the settings file set one.
pub const DEFAULT_LOG_FILTER: &str = "civichat=info,civichat_core=info,civichat_api=info";

/// Application settings that persist across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Snapshot database; defaults to `<data_dir>/civichat/civichat.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// `tracing` filter directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    /// Per-request timeout for CRM calls.
    pub request_timeout_secs: u64,
    /// Store credentials in the system keyring.
    pub use_keyring: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            log_filter: None,
            request_timeout_secs: 30,
            use_keyring: true,
        }
    }
}

impl AppSettings {
    /// Filter directive for the log subscriber.
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// CRM request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Snapshot database location.
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("civichat.db")
        })
    }
}

/// Location of the settings file.
pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("settings.json")
}

/// Load application settings from file; a missing file yields defaults.
pub async fn load_settings() -> anyhow::Result<AppSettings> {
    let settings_path = settings_path();

    if !settings_path.exists() {
        return Ok(AppSettings::default());
    }

    let contents = tokio::fs::read_to_string(&settings_path)
        .await
        .with_context(|| format!("failed to read {}", settings_path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", settings_path.display()))
}
