use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf, time::Duration};
use thiserror::Error;

use reach_oracle::RpcSettings;
use reach_oracle::retry::RetryConfig;
use reach_oracle::rpc::DEFAULT_ENDPOINT;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "REACH_CONFIG";

pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STEP_DEPTH: u32 = 1;
pub const DEFAULT_BUILD_MAX_DEPTH: u32 = 1000;
pub const DEFAULT_RETENTION: usize = 256;

#[derive(Debug, Default, Deserialize)]
pub struct ReachConfig {
    pub oracle: Option<OracleConfig>,
    pub explore: Option<ExploreConfig>,
    pub processes: Option<ProcessConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OracleConfig {
    /// JSON-RPC endpoint; `${VAR}` references are expanded.
    pub endpoint: Option<String>,
    /// Budget for a single oracle call, retries included.
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExploreConfig {
    pub default_step_depth: Option<u32>,
    /// Rule tags that stop `step` early.
    #[serde(default)]
    pub halt_tags: Vec<String>,
    pub build_max_depth: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessConfig {
    /// Completed processes kept before the oldest are evicted.
    pub retention: Option<usize>,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl ReachConfig {
    /// Load from [`config_path`]. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let path = path.to_path_buf();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse { path, source: err })
            }
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".reach").join("config.toml"))
}

/// Resolved per-session knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub oracle_endpoint: String,
    pub oracle_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub default_step_depth: u32,
    pub halt_tags: Vec<String>,
    pub build_max_depth: u32,
    pub retention: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let rpc = RpcSettings::default();
        Self {
            oracle_endpoint: DEFAULT_ENDPOINT.to_string(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            connect_timeout: rpc.connect_timeout,
            max_retries: rpc.retry.max_retries,
            default_step_depth: DEFAULT_STEP_DEPTH,
            halt_tags: Vec::new(),
            build_max_depth: DEFAULT_BUILD_MAX_DEPTH,
            retention: DEFAULT_RETENTION,
        }
    }
}

impl SessionSettings {
    #[must_use]
    pub fn from_config(config: &ReachConfig) -> Self {
        let mut settings = Self::default();

        if let Some(oracle) = &config.oracle {
            if let Some(endpoint) = oracle.endpoint.as_deref() {
                let expanded = expand_env_vars(endpoint);
                if !expanded.trim().is_empty() {
                    settings.oracle_endpoint = expanded;
                }
            }
            if let Some(ms) = oracle.timeout_ms.filter(|ms| *ms > 0) {
                settings.oracle_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = oracle.connect_timeout_ms.filter(|ms| *ms > 0) {
                settings.connect_timeout = Duration::from_millis(ms);
            }
            if let Some(retries) = oracle.max_retries {
                settings.max_retries = retries;
            }
        }

        if let Some(explore) = &config.explore {
            if let Some(depth) = explore.default_step_depth {
                if depth == 0 {
                    tracing::warn!("Ignoring explore.default_step_depth = 0");
                } else {
                    settings.default_step_depth = depth;
                }
            }
            settings.halt_tags = explore.halt_tags.clone();
            if let Some(depth) = explore.build_max_depth {
                settings.build_max_depth = depth;
            }
        }

        if let Some(retention) = config.processes.as_ref().and_then(|p| p.retention) {
            settings.retention = retention;
        }

        settings
    }

    /// Settings for [`reach_oracle::RpcOracle::new`].
    #[must_use]
    pub fn rpc_settings(&self) -> RpcSettings {
        RpcSettings {
            request_timeout: self.oracle_timeout,
            connect_timeout: self.connect_timeout,
            retry: RetryConfig {
                max_retries: self.max_retries,
                ..RetryConfig::default()
            },
        }
    }
}
