//! CLI error types with miette diagnostics.
//!
//! Maps `SyncError` and friends into user-facing errors with actionable
//! help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use compsync_config::ConfigError;
use compsync_core::{RegistryError, SyncError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const PARTIAL: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Lookup ───────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(compsync::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Inventory ────────────────────────────────────────────────────
    #[error("Could not read inventory {path}")]
    #[diagnostic(
        code(compsync::inventory_io),
        help("Pass an existing file with --inventory or set COMPSYNC_INVENTORY.")
    )]
    InventoryIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Inventory {path} is malformed: {reason}")]
    #[diagnostic(
        code(compsync::inventory_format),
        help("Inventories are JSON, or YAML when the file ends in .yaml/.yml.")
    )]
    InventoryFormat { path: String, reason: String },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Device {device} cannot be reconciled: {reason}")]
    #[diagnostic(
        code(compsync::no_device_type),
        help("Assign a device type to the device in the inventory.")
    )]
    NoDeviceType { device: String, reason: String },

    #[error("Request rejected: {reason}")]
    #[diagnostic(
        code(compsync::invalid_request),
        help("Run: compsync diff to see valid component and template ids")
    )]
    InvalidRequest { reason: String },

    #[error("{failed} of the requested changes failed")]
    #[diagnostic(
        code(compsync::partial_failure),
        help("Re-run the diff to see what is still out of sync.")
    )]
    PartialFailure { failed: usize },

    #[error("Reconciliation was interrupted")]
    #[diagnostic(
        code(compsync::cancelled),
        help("Changes that started before the interrupt were applied; re-run to finish.")
    )]
    Cancelled,

    #[error("Storage failure: {message}")]
    #[diagnostic(code(compsync::store))]
    Store { message: String },

    #[error(transparent)]
    #[diagnostic(code(compsync::registry))]
    Registry(#[from] RegistryError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(compsync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(compsync::config),
        help("Check the config file (compsync config path) and COMPSYNC_* variables.")
    )]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Writing '{path}' requires confirmation")]
    #[diagnostic(
        code(compsync::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { path: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(compsync::serialize))]
    Serialize(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PartialFailure { .. } | Self::Cancelled => exit_code::PARTIAL,
            Self::Validation { .. }
            | Self::InvalidRequest { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── SyncError → CliError mapping ─────────────────────────────────────

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::UnknownKind { kind } => CliError::NotFound {
                resource_type: "component kind".into(),
                identifier: kind,
                hint: "Run: compsync kinds to see registered kinds".into(),
            },
            SyncError::DeviceNotFound { device } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: device.to_string(),
                hint: "Check the devices listed in the inventory file".into(),
            },
            SyncError::DeviceTypeNotFound { device_type } => CliError::NotFound {
                resource_type: "device type".into(),
                identifier: device_type.to_string(),
                hint: "Add the device type to the inventory's device_types".into(),
            },
            SyncError::DeviceTypeMissing { device } => CliError::NoDeviceType {
                device: device.to_string(),
                reason: "it has no device type".into(),
            },
            err @ (SyncError::InvalidReference { .. } | SyncError::InvalidRequest { .. }) => {
                CliError::InvalidRequest {
                    reason: err.to_string(),
                }
            }
            SyncError::Store(err) => CliError::Store {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compsync_core::ObjectId;

    #[test]
    fn lookup_failures_exit_not_found() {
        let err = CliError::from(SyncError::unknown_kind("gpu"));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "component kind 'gpu' not found");
    }

    #[test]
    fn rejected_requests_are_usage_errors() {
        let err = CliError::from(SyncError::InvalidReference {
            kind: "interface".into(),
            id: ObjectId::new(9),
            reason: "belongs to another device".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("interface 9"));
    }

    #[test]
    fn partial_failures_have_their_own_code() {
        assert_eq!(CliError::PartialFailure { failed: 2 }.exit_code(), exit_code::PARTIAL);
        assert_eq!(CliError::Cancelled.exit_code(), exit_code::PARTIAL);
    }
}
