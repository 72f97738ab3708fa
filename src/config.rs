use crate::catalog::CatalogOptions;
use crate::query::SearchStrategy;
use crate::search::HighlightMode;
use crate::sync::BackoffPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_REMOTE_URL: &str = "SUPABASE_URL";
pub const ENV_REMOTE_KEY: &str = "SUPABASE_API_KEY";
pub const ENV_LOCAL_ONLY: &str = "USE_LOCAL_DATA";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub search: SearchConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub snapshot_dir: PathBuf,
    pub daily_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("data"),
            daily_dir: PathBuf::from("data/daily"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub use_local_data: bool,
    pub min_fetch_interval_ms: u64,
    pub resync_grace_secs: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_cap_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            use_local_data: false,
            min_fetch_interval_ms: 5000,
            resync_grace_secs: 60,
            reconnect_base_ms: 500,
            reconnect_cap_secs: 60,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_strategy: SearchStrategy,
    pub default_language: String,
    pub highlight_mode: HighlightMode,
    pub regex_cache_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_strategy: SearchStrategy::Fuzzy,
            default_language: "en".to_string(),
            highlight_mode: HighlightMode::Markdown,
            regex_cache_size: 128,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub preview_rows: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { preview_rows: 19 }
    }
}

impl Config {
    /// Load from `path`, or from the first config file found on the search
    /// path, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_path(),
        };
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("versekeep/config.toml");
            if xdg_path.exists() {
                return Some(xdg_path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".versekeep.toml");
            if home_path.exists() {
                return Some(home_path);
            }
        }

        let current_path = Path::new(".versekeep.toml");
        if current_path.exists() {
            return Some(current_path.to_path_buf());
        }

        None
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REMOTE_URL).filter(|v| !v.is_empty()) {
            self.remote.url = Some(url);
        }
        if let Some(key) = lookup(ENV_REMOTE_KEY).filter(|v| !v.is_empty()) {
            self.remote.api_key = Some(key);
        }
        if lookup(ENV_LOCAL_ONLY).is_some_and(|v| v == "true") {
            self.sync.use_local_data = true;
        }
    }

    /// URL and key, when background sync should run.
    pub fn remote_credentials(&self) -> Option<(&str, &str)> {
        if self.sync.use_local_data {
            return None;
        }
        match (&self.remote.url, &self.remote.api_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }

    pub fn use_local_data(&self) -> bool {
        self.remote_credentials().is_none()
    }

    pub fn min_fetch_interval(&self) -> Duration {
        Duration::from_millis(self.sync.min_fetch_interval_ms)
    }

    pub fn reconnect_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(self.sync.reconnect_base_ms),
            cap: Duration::from_secs(self.sync.reconnect_cap_secs),
        }
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            resync_grace: Duration::from_secs(self.sync.resync_grace_secs),
            default_strategy: self.search.default_strategy,
            default_language: self.search.default_language.clone(),
            highlight_mode: self.search.highlight_mode,
            regex_cache_size: self.search.regex_cache_size,
            preview_rows: self.export.preview_rows,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
