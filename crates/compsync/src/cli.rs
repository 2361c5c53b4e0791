//! Clap derive structures for the `compsync` CLI.
//!
//! Defines the command tree, global flags, and shared types. Depends only
//! on clap and clap_complete so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// compsync -- reconcile device components with device type templates
#[derive(Debug, Parser)]
#[command(
    name = "compsync",
    version,
    about = "Compare device components with their device type templates and fix the drift",
    long_about = "Compare the components of a device (interfaces, power ports, console ports, \
        bays, ...) with the component templates of its device type, then create, \
        delete, or rename components until they match.\n\n\
        Operates on an inventory file (JSON or YAML) holding device types, devices, \
        components, templates, and an optional model catalog for auto-discovery.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "COMPSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "COMPSYNC_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Leave descriptions out of comparisons and writes
    #[arg(long, global = true)]
    pub ignore_description: bool,

    /// Pair component names case-insensitively
    #[arg(long, global = true)]
    pub case_insensitive: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect the registered component kinds
    #[command(alias = "k")]
    Kinds(KindsArgs),

    /// Compare a device's components with its device type's templates
    #[command(alias = "d")]
    Diff(DiffArgs),

    /// Apply additions, removals, and renames to a device
    #[command(alias = "s")]
    Sync(SyncArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Target Arguments ──────────────────────────────────────────

/// Which inventory, device, and kind a command works on.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Inventory file (JSON, or YAML by .yaml/.yml extension)
    #[arg(long, short = 'i', env = "COMPSYNC_INVENTORY")]
    pub inventory: PathBuf,

    /// Device id or name
    #[arg(long, short = 'd')]
    pub device: String,

    /// Component kind (see `compsync kinds`)
    #[arg(long, short = 'k')]
    pub kind: String,
}

// ── Kinds ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct KindsArgs {
    /// Inventory file whose model catalog feeds auto-discovery
    #[arg(long, short = 'i', env = "COMPSYNC_INVENTORY")]
    pub inventory: Option<PathBuf>,

    /// Show field sets, filters, and permissions for each kind
    #[arg(long)]
    pub detailed: bool,

    /// Only show this kind
    #[arg(long, short = 'k')]
    pub kind: Option<String>,
}

// ── Diff ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Hide synchronized components
    #[arg(long)]
    pub changed_only: bool,
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Create every template-only component and update mismatched ones
    #[arg(long)]
    pub add_missing: bool,

    /// Rename components whose names drifted from their template
    #[arg(long)]
    pub repair: bool,

    /// Delete every component the device type does not declare
    #[arg(long)]
    pub remove_extra: bool,

    /// Everything above
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Create (or update) from this template id
    #[arg(long = "add", value_name = "TEMPLATE_ID")]
    pub add: Vec<u64>,

    /// Delete this component id
    #[arg(long = "remove", value_name = "COMPONENT_ID")]
    pub remove: Vec<u64>,

    /// Rename a component, as ID=NAME
    #[arg(long = "rename", value_name = "ID=NAME", value_parser = parse_rename)]
    pub rename: Vec<(u64, String)>,

    /// Save the resulting inventory back to the file
    #[arg(long, short = 'w')]
    pub write: bool,
}

fn parse_rename(raw: &str) -> Result<(u64, String), String> {
    let (id, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=NAME, got '{raw}'"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("'{id}' is not a component id"))?;
    Ok((id, name.to_owned()))
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration (file + environment)
    Show,

    /// Print the config file location
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
