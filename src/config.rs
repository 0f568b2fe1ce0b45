//! Configuration file parsing, defaults, and merging.
//!
//! Configuration is loaded in layers (last wins):
//! 1. Built-in defaults
//! 2. Global config from `~/.mcp-ripgrep/config.toml`
//! 3. An explicit file passed with `--config`
//! 4. Command-line flags (applied by the caller via [`Config::apply_cli`])
//!
//! Each layer only overrides fields it explicitly sets; absent fields
//! are left at their previous value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Cli;

// ---------------------------------------------------------------------------
// Public config types (fully resolved, no Options)
// ---------------------------------------------------------------------------

/// Top-level configuration, fully resolved with defaults applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub ripgrep: RipgrepConfig,
    pub log: LogConfig,
}

/// How the search tool is invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct RipgrepConfig {
    /// Program name (looked up on `PATH`) or path to the binary.
    pub binary: String,
    /// Seconds to wait before killing a search; `0` waits indefinitely.
    pub timeout_secs: u64,
}

/// Logging settings. `RUST_LOG` still wins when set.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub level: String,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for RipgrepConfig {
    fn default() -> Self {
        Self {
            binary: "rg".to_string(),
            timeout_secs: 0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RipgrepConfig {
    /// The bounded wait, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// ---------------------------------------------------------------------------
// Option-based overlay types (for partial deserialization)
// ---------------------------------------------------------------------------

/// Mirror of [`Config`] where every field is `Option`, so we can
/// deserialize a partial TOML file and overlay only the keys that are
/// present.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigOverlay {
    ripgrep: Option<RipgrepOverlay>,
    log: Option<LogOverlay>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RipgrepOverlay {
    binary: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LogOverlay {
    level: Option<String>,
}

// ---------------------------------------------------------------------------
// Merge helpers
// ---------------------------------------------------------------------------

impl Config {
    /// Apply an overlay on top of this config, replacing only the fields
    /// that are `Some` in the overlay.
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(rg) = overlay.ripgrep {
            if let Some(v) = rg.binary {
                self.ripgrep.binary = v;
            }
            if let Some(v) = rg.timeout_secs {
                self.ripgrep.timeout_secs = v;
            }
        }
        if let Some(log) = overlay.log
            && let Some(v) = log.level
        {
            self.log.level = v;
        }
    }

    /// Apply command-line overrides, the last layer.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.rg_path {
            self.ripgrep.binary = v.clone();
        }
        if let Some(v) = cli.timeout_secs {
            self.ripgrep.timeout_secs = v;
        }
        if let Some(v) = &cli.log_level {
            self.log.level = v.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Return the user's home directory.
fn home_dir() -> Option<PathBuf> {
    #[allow(deprecated)]
    std::env::home_dir()
}

/// Parse a TOML string into a [`ConfigOverlay`], producing a clear error
/// message on malformed input.
fn parse_overlay(contents: &str, path: &Path) -> Result<ConfigOverlay> {
    toml::from_str(contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Try to read a config file and parse it as an overlay.
/// Returns `Ok(None)` if the file does not exist.
fn load_overlay(path: &Path) -> Result<Option<ConfigOverlay>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let overlay = parse_overlay(&contents, path)?;
            Ok(Some(overlay))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config file {}: {}",
            path.display(),
            e
        )),
    }
}

impl Config {
    /// Load configuration by merging layers:
    /// defaults -> global (`~/.mcp-ripgrep/config.toml`) -> `explicit`.
    ///
    /// Unlike the global file, an explicit file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let global_dir = home_dir().map(|h| h.join(".mcp-ripgrep"));
        Self::load_with_global_dir(global_dir.as_deref(), explicit)
    }

    /// Internal: load config with an explicit global config directory.
    ///
    /// This allows tests to supply a temporary directory instead of the
    /// real `~/.mcp-ripgrep` without mutating environment variables.
    fn load_with_global_dir(global_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Config> {
        let mut config = Config::default();

        // Layer 2: global config
        if let Some(dir) = global_dir {
            let global_path = dir.join("config.toml");
            if let Some(overlay) = load_overlay(&global_path)? {
                config.apply_overlay(overlay);
            }
        }

        // Layer 3: explicit config
        if let Some(path) = explicit {
            let overlay = load_overlay(path)?
                .with_context(|| format!("config file not found: {}", path.display()))?;
            config.apply_overlay(overlay);
        }

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
