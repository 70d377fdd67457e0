//! Configuration stored under `.liftlog/state/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::json_file::write_atomic;

/// Liftlog configuration (TOML).
///
/// Edited by humans; missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Owner of the routines and sessions in the document store.
    pub user_id: String,

    /// Rest assigned to a newly added set, in seconds.
    pub default_rest_secs: u32,

    /// Step used by rest +/- adjustments, in seconds.
    pub rest_step_secs: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            default_rest_secs: 60,
            rest_step_secs: 10,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(anyhow!("user_id must not be empty"));
        }
        if self
            .user_id
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(anyhow!(
                "user_id '{}' may only contain ASCII letters, digits, '-' and '_'",
                self.user_id
            ));
        }
        if self.rest_step_secs == 0 {
            return Err(anyhow!("rest_step_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AppConfig::default()`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let cfg = AppConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = AppConfig {
            user_id: "ana".to_string(),
            default_rest_secs: 90,
            rest_step_secs: 15,
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "user_id = \"ana\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.user_id, "ana");
        assert_eq!(cfg.rest_step_secs, 10);
    }

    #[test]
    fn validate_rejects_unsafe_user_id_and_zero_step() {
        let cfg = AppConfig {
            user_id: "../etc".to_string(),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = AppConfig {
            rest_step_secs: 0,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
