use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::DEFAULT_MAX_DEPTH;
use crate::version::proxy::{
    ClientOptions, DEFAULT_BASE_URL, DEFAULT_INFO_TTL, DEFAULT_LATEST_TTL,
    DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT,
};

/// Environment variable overriding the proxy origin
pub const ENV_PROXY: &str = "GX_PROXY";
/// Environment variable overriding the request timeout, in milliseconds
pub const ENV_TIMEOUT_MS: &str = "GX_TIMEOUT_MS";
/// Environment variable overriding the `@latest`/list cache ttl, in milliseconds
pub const ENV_CACHE_TTL_MS: &str = "GX_CACHE_TTL_MS";
/// Environment variable overriding the number of concurrent requests
pub const ENV_MAX_CONCURRENT: &str = "GX_MAX_CONCURRENT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// gx configuration, read from YAML
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub proxy_url: String,
    pub timeout_ms: u64,
    /// ttl of `@latest` and version list responses
    pub cache_ttl_ms: u64,
    /// ttl of `.info` and `.mod` responses
    pub info_ttl_ms: u64,
    pub max_concurrent: usize,
    /// Depth limit of `gx tree --remote` expansion
    pub max_depth: usize,
    pub default_verbose: bool,
    pub default_quiet: bool,
    /// Write JSON logs to [`log_path`]
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            cache_ttl_ms: DEFAULT_LATEST_TTL.as_millis() as u64,
            info_ttl_ms: DEFAULT_INFO_TTL.as_millis() as u64,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_depth: DEFAULT_MAX_DEPTH,
            default_verbose: false,
            default_quiet: false,
            log_to_file: false,
        }
    }
}

impl Config {
    /// Loads the first readable config file, then applies environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let paths = config_paths(dirs::home_dir());
        let mut config = Self::load_from(&paths)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads the first readable file among `paths`; defaults when none is.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        for path in paths {
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            tracing::debug!("Loading config from {}", path.display());
            return Self::from_yaml(&content, path);
        }
        Ok(Self::default())
    }

    fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty file deserializes as YAML null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides; values that do not parse are ignored
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(proxy) = lookup(ENV_PROXY).filter(|v| !v.is_empty()) {
            self.proxy_url = proxy;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS).and_then(|v| v.trim().parse().ok()) {
            self.timeout_ms = ms;
        }
        if let Some(ms) = lookup(ENV_CACHE_TTL_MS).and_then(|v| v.trim().parse().ok()) {
            self.cache_ttl_ms = ms;
        }
        if let Some(n) = lookup(ENV_MAX_CONCURRENT).and_then(|v| v.trim().parse().ok()) {
            self.max_concurrent = n;
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.proxy_url.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_concurrent: self.max_concurrent,
            latest_ttl: Duration::from_millis(self.cache_ttl_ms),
            info_ttl: Duration::from_millis(self.info_ttl_ms),
        }
    }
}

/// Candidate config files, in priority order
pub fn config_paths(home_dir: Option<PathBuf>) -> Vec<PathBuf> {
    home_dir
        .map(|home| {
            vec![
                home.join(".config").join("gx").join("config.yaml"),
                home.join(".gx.yaml"),
            ]
        })
        .unwrap_or_default()
}

/// Presentation settings passed explicitly to output code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub verbose: bool,
    pub quiet: bool,
}

impl OutputOptions {
    /// Command line flags win over config defaults; quiet wins over verbose
    pub fn resolve(config: &Config, verbose: bool, quiet: bool) -> Self {
        let quiet = quiet || (config.default_quiet && !verbose);
        let verbose = !quiet && (verbose || config.default_verbose);
        Self { verbose, quiet }
    }
}

/// Returns the path to the data directory for gx.
/// Uses $XDG_DATA_HOME/gx if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/gx,
/// or ./gx if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("gx.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("gx")
}
