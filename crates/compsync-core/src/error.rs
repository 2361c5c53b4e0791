// ── Core error types ──
//
// One enum per layer. `SyncError` is what callers of the reconciler see;
// the narrower enums are recovered from locally (skip a record, record a
// per-item failure) or converted into `SyncError` when they are systemic.

use thiserror::Error;

use crate::model::ObjectId;

/// Failure reported by the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("permission denied: {action}")]
    PermissionDenied { action: String },

    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

/// A record could not be normalized from its instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    #[error("{kind} {record}: field '{field}' could not be extracted: {reason}")]
    FieldExtraction {
        kind: String,
        record: ObjectId,
        field: String,
        reason: String,
    },
}

/// Registry construction failures. Always fatal at build time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("component kind must not be empty")]
    EmptyKind,

    #[error("component kind '{kind}' registered twice")]
    DuplicateKind { kind: String },

    #[error("component kind '{kind}' compares field '{field}' which it never reads")]
    UnknownComparableField { kind: String, field: String },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// The host catalog could not be enumerated at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("host model catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },
}

/// Errors surfaced by `Reconciler` operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown component kind: {kind}")]
    UnknownKind { kind: String },

    #[error("device {device} not found")]
    DeviceNotFound { device: ObjectId },

    #[error("device {device} has no device type")]
    DeviceTypeMissing { device: ObjectId },

    #[error("device type {device_type} not found")]
    DeviceTypeNotFound { device_type: ObjectId },

    #[error("invalid reference to {kind} {id}: {reason}")]
    InvalidReference {
        kind: String,
        id: ObjectId,
        reason: String,
    },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }
}
