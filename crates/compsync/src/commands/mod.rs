//! Command dispatch: bridges CLI args -> reconciler -> output formatting.

pub mod config_cmd;
pub mod diff;
pub mod kinds;
pub mod sync;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a command that works on the registry or an inventory.
pub async fn dispatch(cmd: &Command, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = config::resolve(global)?;
    match cmd {
        Command::Kinds(args) => kinds::handle(args, &settings),
        Command::Diff(args) => diff::handle(args, &settings).await,
        Command::Sync(args) => sync::handle(args, &settings).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
