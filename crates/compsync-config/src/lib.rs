//! Shared configuration for the compsync CLI.
//!
//! A TOML file layered under `COMPSYNC_` environment overrides, and its
//! translation to `compsync_core::SyncOptions` and
//! `compsync_core::RegistrySettings`. Core never reads configuration
//! itself; everything it needs arrives through those two values.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use compsync_core::{RegistrySettings, SyncOptions};

/// Prefix for environment overrides. Nested keys use a double underscore,
/// e.g. `COMPSYNC_SYNC__MAX_CONCURRENCY=4`.
pub const ENV_PREFIX: &str = "COMPSYNC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Comparison and apply behavior.
    #[serde(default)]
    pub sync: SyncSection,

    /// Registry assembly.
    #[serde(default)]
    pub discovery: DiscoverySection,

    /// Output defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncSection {
    #[serde(default = "default_true")]
    pub compare_description: bool,

    #[serde(default = "default_true")]
    pub case_sensitive_name_match: bool,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Interface types hidden from interface comparisons.
    #[serde(default = "default_interface_exclusions")]
    pub exclude_interface_type_list: Vec<String>,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            compare_description: true,
            case_sensitive_name_match: true,
            max_concurrency: default_max_concurrency(),
            exclude_interface_type_list: default_interface_exclusions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscoverySection {
    #[serde(default = "default_true")]
    pub enable_auto_discovery: bool,

    /// Kinds discovery must skip, matched case-insensitively.
    #[serde(default)]
    pub exclude_kind_list: Vec<String>,

    #[serde(default = "default_max_models")]
    pub max_models: usize,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            enable_auto_discovery: true,
            exclude_kind_list: Vec::new(),
            max_models: default_max_models(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_concurrency() -> usize {
    16
}
fn default_max_models() -> usize {
    50
}
fn default_interface_exclusions() -> Vec<String> {
    vec!["lag".into(), "bridge".into()]
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

const OUTPUTS: [&str; 5] = ["table", "json", "json-compact", "yaml", "plain"];
const COLORS: [&str; 3] = ["auto", "always", "never"];

impl Config {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.max_concurrency == 0 {
            return Err(ConfigError::Validation {
                field: "sync.max_concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !OUTPUTS.contains(&self.defaults.output.as_str()) {
            return Err(ConfigError::Validation {
                field: "defaults.output".into(),
                reason: format!(
                    "expected one of {}, got '{}'",
                    OUTPUTS.join(", "),
                    self.defaults.output
                ),
            });
        }
        if !COLORS.contains(&self.defaults.color.as_str()) {
            return Err(ConfigError::Validation {
                field: "defaults.color".into(),
                reason: format!("expected auto, always or never, got '{}'", self.defaults.color),
            });
        }
        Ok(())
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            compare_description: self.sync.compare_description,
            case_sensitive_names: self.sync.case_sensitive_name_match,
            max_concurrency: self.sync.max_concurrency,
        }
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            enable_auto_discovery: self.discovery.enable_auto_discovery,
            excluded_kinds: self
                .discovery
                .exclude_kind_list
                .iter()
                .map(|k| k.trim().to_owned())
                .filter(|k| !k.is_empty())
                .collect::<BTreeSet<_>>(),
            max_discovered: self.discovery.max_models,
            exclude_interface_types: self.sync.exclude_interface_type_list.clone(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "compsync", "compsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("compsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate the config at `path` (missing files are fine) with
/// environment overrides applied.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Load the config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}
