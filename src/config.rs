//! Configuration for blokaudit.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags, with BLOKAUDIT_* env fallbacks (handled by clap)
//! 2. Config file (.blokaudit/config.yaml)
//! 3. Built-in defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .blokaudit/config.yaml
//! - Falls back to ~/.blokaudit/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::story::ContentVersion;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<AuditConfig, String>> = OnceLock::new();

/// Oversize threshold used when neither flag nor file sets one (KiB).
pub const DEFAULT_THRESHOLD_KB: u64 = 300;

/// Config file schema (matches YAML structure). Everything is optional;
/// command-line flags override whatever is set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Primary space id.
    pub space_id: Option<u64>,

    /// Delivery API token.
    pub delivery_token: Option<String>,

    /// Management API personal access token.
    pub management_token: Option<String>,

    /// Oversize threshold in KiB.
    pub threshold_kb: Option<u64>,

    /// Asset kinds to audit (image, video, doc, unknown, or all).
    #[serde(default)]
    pub kinds: Vec<String>,

    /// Content version to scan (published or draft).
    pub version: Option<ContentVersion>,

    /// Base URL overrides, for API-compatible self-hosted setups.
    pub delivery_base_url: Option<String>,
    pub management_base_url: Option<String>,
}

/// Resolved configuration: file contents plus where they came from.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub space_id: Option<u64>,
    pub delivery_token: Option<String>,
    pub management_token: Option<String>,
    pub threshold_kb: Option<u64>,
    pub kinds: Vec<String>,
    pub version: Option<ContentVersion>,
    pub delivery_base_url: Option<String>,
    pub management_base_url: Option<String>,

    /// Path of the config file actually loaded, if any.
    pub config_file: Option<PathBuf>,
}

/// Find the config file: nearest `.blokaudit/config.yaml` walking up from
/// the current directory, else `~/.blokaudit/config.yaml`.
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(".blokaudit").join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    let fallback = dirs::home_dir()?.join(".blokaudit").join("config.yaml");
    if fallback.exists() {
        return Some(fallback);
    }

    None
}

/// Load and parse a config file. An empty file counts as all-defaults.
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all file sources
fn load_config() -> Result<AuditConfig> {
    let config_path = find_config_file();

    let file = match &config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(AuditConfig {
        space_id: file.space_id,
        delivery_token: file.delivery_token,
        management_token: file.management_token,
        threshold_kb: file.threshold_kb,
        kinds: file.kinds,
        version: file.version,
        delivery_base_url: file.delivery_base_url,
        management_base_url: file.management_base_url,
        config_file: config_path,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static AuditConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<AuditConfig> {
    load_config()
}

/// Convert a threshold given in KiB to bytes.
pub fn threshold_bytes(threshold_kb: u64) -> u64 {
    threshold_kb * 1024
}
