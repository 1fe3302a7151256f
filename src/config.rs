use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngramConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub decay: DecayConfig,
    pub retrieval: RetrievalConfig,
    pub features: FeatureConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub http_host: String,
    pub http_port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecayConfig {
    /// Per-day strength multiplier applied since last access.
    pub decay_rate: f64,
    /// Strength written back when a memory is returned by a recall.
    pub access_boost_strength: f64,
    /// Stored-strength floor below which `prune` deletes memories.
    pub prune_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    pub default_min_strength: f64,
}

/// Runtime feature flags. Handlers read these at request time, never at
/// startup, so toggles take effect without a restart.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FeatureConfig {
    pub scopes: bool,
    pub idempotency: bool,
    pub context_hydration: bool,
    pub work_items: bool,
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            decay: DecayConfig::default(),
            retrieval: RetrievalConfig::default(),
            features: FeatureConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "127.0.0.1".into(),
            http_port: 7749,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_data_dir().to_string_lossy().into_owned();
        let db_path = default_data_dir()
            .join("engram.db")
            .to_string_lossy()
            .into_owned();
        Self { data_dir, db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_data_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "bge-small-en-v1.5".into(),
            cache_dir,
            dimensions: 384,
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.95,
            access_boost_strength: 1.0,
            prune_threshold: 0.05,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            default_min_strength: 0.1,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            scopes: true,
            idempotency: true,
            context_hydration: true,
            work_items: false,
        }
    }
}

/// Returns `~/.local/share/engram` (platform data dir).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .expect("home directory must exist")
                .join(".local/share")
        })
        .join("engram")
}

/// Returns the default config file path: `<data>/config.toml`.
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

impl EngramConfig {
    /// Load config from TOML file (if it exists) then apply `ENGRAM_*` env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EngramConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `ENGRAM_*` environment overrides. Invalid numeric values fall back
    /// to the current value with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ENGRAM_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_HTTP_HOST") {
            self.server.http_host = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_HTTP_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.http_port = port,
                Err(_) => warn!(
                    value = %val,
                    "invalid ENGRAM_HTTP_PORT, keeping {}", self.server.http_port
                ),
            }
        }
        if let Ok(val) = std::env::var("ENGRAM_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_EMBEDDING_MODEL") {
            self.embedding.model = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_DECAY_RATE") {
            match val.parse::<f64>() {
                Ok(rate) if (0.0..=1.0).contains(&rate) => self.decay.decay_rate = rate,
                _ => warn!(
                    value = %val,
                    "invalid ENGRAM_DECAY_RATE, keeping {}", self.decay.decay_rate
                ),
            }
        }
        if let Ok(val) = std::env::var("ENGRAM_ACCESS_BOOST_STRENGTH") {
            match val.parse::<f64>() {
                Ok(s) if (0.0..=1.0).contains(&s) => self.decay.access_boost_strength = s,
                _ => warn!(
                    value = %val,
                    "invalid ENGRAM_ACCESS_BOOST_STRENGTH, keeping {}",
                    self.decay.access_boost_strength
                ),
            }
        }
        if let Some(flag) = env_flag("ENGRAM_ENABLE_SCOPES") {
            self.features.scopes = flag;
        }
        if let Some(flag) = env_flag("ENGRAM_ENABLE_IDEMPOTENCY") {
            self.features.idempotency = flag;
        }
        if let Some(flag) = env_flag("ENGRAM_ENABLE_CONTEXT_HYDRATION") {
            self.features.context_hydration = flag;
        }
        if let Some(flag) = env_flag("ENGRAM_ENABLE_WORK_ITEMS") {
            self.features.work_items = flag;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    /// PID file for the daemon supervisor.
    pub fn pid_file_path(&self) -> PathBuf {
        self.resolved_data_dir().join("engram.pid")
    }

    /// Log file the daemonized server writes to.
    pub fn log_file_path(&self) -> PathBuf {
        self.resolved_data_dir().join("engram.log")
    }
}

/// Parse a feature-flag env var: `"1"` enables, `"0"` disables, unset keeps
/// the default, anything else warns and keeps the default.
fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name) {
        Ok(val) => match val.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            other => {
                warn!(var = name, value = %other, "invalid feature flag value, keeping default");
                None
            }
        },
        Err(_) => None,
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
