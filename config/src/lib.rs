//! Configuration loading for marble.
//!
//! Configuration lives at `~/.marble/config.toml` and selects the sandbox
//! executable plus a default time window:
//!
//! ```toml
//! time_window = 10000
//!
//! [sandbox]
//! command = "marble-sandbox"
//! args = ["--headless"]
//! ```
//!
//! `MARBLE_SANDBOX` and `MARBLE_SANDBOX_ARGS` override the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use marble_relay::SurfaceConfig;

/// Default time window in milliseconds when neither the config file nor the
/// caller specifies one.
pub const DEFAULT_TIME_WINDOW_MS: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarbleConfig {
    /// Sandbox executable; required before anything can be visualized.
    #[serde(default)]
    sandbox: Option<SurfaceConfig>,

    /// Default visualization time window, in milliseconds.
    #[serde(default = "default_time_window")]
    time_window: u64,
}

fn default_time_window() -> u64 {
    DEFAULT_TIME_WINDOW_MS
}

impl Default for MarbleConfig {
    fn default() -> Self {
        Self {
            sandbox: None,
            time_window: DEFAULT_TIME_WINDOW_MS,
        }
    }
}

/// `~/.marble/config.toml`, or `None` when no home directory is known.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".marble").join("config.toml"))
}

impl MarbleConfig {
    /// Load from the default path and apply environment overrides.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file
    /// is an error at this boundary rather than a silent fallback.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path. No environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `MARBLE_SANDBOX` / `MARBLE_SANDBOX_ARGS` from `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(command) = lookup("MARBLE_SANDBOX") {
            let args = self
                .sandbox
                .take()
                .map(|sandbox| sandbox.args)
                .unwrap_or_default();
            self.sandbox = Some(SurfaceConfig { command, args });
        }
        if let Some(args) = lookup("MARBLE_SANDBOX_ARGS") {
            match self.sandbox.as_mut() {
                Some(sandbox) => {
                    sandbox.args = args.split_whitespace().map(String::from).collect();
                }
                None => {
                    tracing::warn!("MARBLE_SANDBOX_ARGS set without a sandbox command; ignored");
                }
            }
        }
    }

    /// The configured sandbox, if any.
    #[must_use]
    pub fn sandbox(&self) -> Option<&SurfaceConfig> {
        self.sandbox.as_ref()
    }

    /// Default time window in milliseconds.
    #[must_use]
    pub fn time_window(&self) -> u64 {
        self.time_window
    }
}
