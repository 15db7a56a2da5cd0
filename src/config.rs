//! Configuration management for reporecon
//!
//! Settings live in `<config dir>/reporecon/config.toml`; every field is
//! optional and environment variables override the file.

use crate::keyring;
use crate::llm::RetryPolicy;
use crate::reduce::{ReduceOptions, DEFAULT_MAX_LENGTH};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plaintext fallback for the credential. Prefer the environment or keychain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Character budget for the README sent to the model
    pub max_readme_chars: usize,
    pub retry: RetrySettings,
    /// Address `reporecon serve` listens on
    pub bind: String,
    /// Upper bound on one analysis when served over HTTP
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub multiplier: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_secs: policy.base_delay.as_secs(),
            multiplier: policy.multiplier,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            max_readme_chars: DEFAULT_MAX_LENGTH,
            retry: RetrySettings::default(),
            bind: DEFAULT_BIND.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("reporecon"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Read a config file. A missing file gives defaults; a corrupt one is
    /// reported and also gives defaults.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!(
                    "Config file {} is invalid ({}). Using defaults.",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Apply `GEMINI_API_KEY` and `REPORECON_*` overrides. Unparseable
    /// numbers are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(bind) = lookup("REPORECON_BIND").filter(|b| !b.trim().is_empty()) {
            self.bind = bind.trim().to_string();
        }
        override_number(&lookup, "REPORECON_MAX_README_CHARS", &mut self.max_readme_chars);
        override_number(&lookup, "REPORECON_MAX_RETRIES", &mut self.retry.max_retries);
        override_number(&lookup, "REPORECON_RETRY_BASE_SECS", &mut self.retry.base_delay_secs);
        override_number(
            &lookup,
            "REPORECON_REQUEST_TIMEOUT_SECS",
            &mut self.request_timeout_secs,
        );
    }

    /// The Gemini credential: environment or config file first, then the
    /// OS keychain.
    pub fn credential(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        match keyring::get_api_key() {
            Ok(key) => key,
            Err(err) => {
                keyring::warn_keychain_error_once("Gemini API key", &err);
                None
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_secs(self.retry.base_delay_secs),
            multiplier: self.retry.multiplier.max(1),
        }
    }

    pub fn reduce_options(&self) -> ReduceOptions {
        ReduceOptions {
            max_length: self.max_readme_chars,
            ..ReduceOptions::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().context("Could not determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        write_config_atomic(path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/reporecon/config.toml".to_string())
    }
}

fn override_number<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring {}={:?}: not a number", name, raw),
        }
    }
}

/// Write through a temp file and rename, owner-only on unix.
fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let tmp_path = path.with_extension("tmp");
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    drop(file);

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
