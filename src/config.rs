//! Client configuration management.
//!
//! Configuration is stored at `~/.config/mindhaven/config.json`. The durable
//! key-value store (session + caches) lives under the platform data
//! directory so wiping the config does not log the user out.
//!
//! Cache TTLs are policy, not mechanism: the constants below are what the
//! client passes to the cache layer, which accepts any TTL per call.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "mindhaven";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Durable key-value store file name
const STORE_FILE: &str = "client_store.json";

/// Default API base URL
const DEFAULT_BASE_URL: &str = "https://api.mindhaven.app";

/// Admin listings change as staff work; keep them fresh.
pub const ADMIN_LISTING_TTL_MS: i64 = 30 * 1000;

/// Usage stats are volatile but tolerable slightly stale.
pub const USAGE_STATS_TTL_MS: i64 = 60 * 1000;

/// The assessment catalog changes on deploys, not during a session.
pub const ASSESSMENT_CATALOG_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Recently-opened records survive across visits.
pub const RECENT_ITEMS_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    /// Minutes before expiry at which the client refreshes proactively
    pub refresh_threshold_minutes: i64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_threshold_minutes: crate::auth::DEFAULT_REFRESH_THRESHOLD_MINUTES,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Path of the durable key-value store backing session and caches
    pub fn store_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(STORE_FILE))
    }
}
