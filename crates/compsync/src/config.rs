//! CLI configuration — thin wrapper around `compsync_config`.
//!
//! Loads the config file named by `--config` (or the platform default)
//! and lets global flags override what it says.

use std::path::PathBuf;

use clap::ValueEnum;

use compsync_core::{RegistrySettings, SyncOptions};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use compsync_config::{Config, config_path, load_config_from, save_config_to};

/// Everything a command handler needs from flags and config combined.
#[derive(Debug)]
pub struct Settings {
    pub output: OutputFormat,
    pub color: ColorMode,
    pub quiet: bool,
    pub yes: bool,
    pub sync: SyncOptions,
    pub registry: RegistrySettings,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config` / `COMPSYNC_CONFIG`, else the
/// platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config and apply flag overrides. Flags beat the file, the
/// file beats built-in defaults.
pub fn resolve(global: &GlobalOpts) -> Result<Settings, CliError> {
    let cfg = load_config_from(&config_file(global))?;

    let mut sync = cfg.sync_options();
    if global.ignore_description {
        sync.compare_description = false;
    }
    if global.case_insensitive {
        sync.case_sensitive_names = false;
    }

    Ok(Settings {
        output: global.output.unwrap_or_else(|| {
            OutputFormat::from_str(&cfg.defaults.output, true).unwrap_or(OutputFormat::Table)
        }),
        color: global.color.unwrap_or_else(|| {
            ColorMode::from_str(&cfg.defaults.color, true).unwrap_or(ColorMode::Auto)
        }),
        quiet: global.quiet,
        yes: global.yes,
        sync,
        registry: cfg.registry_settings(),
    })
}
