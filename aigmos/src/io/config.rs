//! Console configuration stored in `config/core.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use qclient::QConfig;
use serde::{Deserialize, Serialize};

use super::files::write_atomic;

pub const DEFAULT_CONFIG_PATH: &str = "config/core.toml";

/// Console configuration (TOML).
///
/// Missing fields default to the values the console has always used, so an
/// absent or empty file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Upper bound on expansion passes per line.
    pub expand_max_passes: usize,

    /// Default destination for `export.file` / `export.many`.
    pub output_dir: PathBuf,

    /// Event poller period in milliseconds.
    pub event_tick_ms: u64,

    /// How long a runner holds its done/failed/stopped trigger value.
    pub trigger_pulse_ms: u64,

    /// Extra surface aliases (`name = "sys.primitive ..."`), merged over the
    /// built-in table.
    pub aliases: BTreeMap<String, String>,

    pub q: QConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            expand_max_passes: 10,
            output_dir: PathBuf::from("output"),
            event_tick_ms: 50,
            trigger_pulse_ms: 100,
            aliases: BTreeMap::new(),
            q: QConfig::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.expand_max_passes == 0 {
            return Err(anyhow!("expand_max_passes must be > 0"));
        }
        if self.event_tick_ms == 0 {
            return Err(anyhow!("event_tick_ms must be > 0"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must not be empty"));
        }
        for (name, expansion) in &self.aliases {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(anyhow!("alias name must be a single token: {name:?}"));
            }
            if expansion.trim().is_empty() {
                return Err(anyhow!("alias {name} has an empty expansion"));
            }
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ConsoleConfig::default()`.
pub fn load_config(path: &Path) -> Result<ConsoleConfig> {
    if !path.exists() {
        let cfg = ConsoleConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ConsoleConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ConsoleConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
