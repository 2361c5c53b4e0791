//! Diff-and-apply engine reconciling device components with the component
//! templates of their device type.
//!
//! - **[`Registry`]** — Immutable kind → [`ComponentConfig`] map, built by
//!   [`build_registry`] from the static DCIM kinds plus whatever
//!   [`discover`](registry::discover) synthesizes from a [`HostCatalog`].
//!   Shared through a [`RegistryHandle`] so a reload swaps it atomically.
//!
//! - **Record factory** ([`record`]) — Normalizes a component or template
//!   instance into a [`ComparisonRecord`] according to its kind's config.
//!
//! - **Differ** ([`diff`]) — Pairs device-side and template-side records by
//!   name and classifies each key as synchronized, mismatched, renamed,
//!   device-only, or template-only.
//!
//! - **Apply engine** ([`apply`]) — Executes a validated
//!   [`ReconciliationRequest`] as concurrent per-item futures against a
//!   [`ComponentStore`], isolating per-item failures.
//!
//! - **[`Reconciler`]** — Facade tying the above to one store, one registry
//!   handle, and one set of [`SyncOptions`].

pub mod apply;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod naming;
pub mod reconciler;
pub mod record;
pub mod registry;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apply::{
    ItemAction, ItemFailure, ReconciliationRequest, ReconciliationResult, RenamePair, SyncAction,
    plan,
};
pub use config::{RegistrySettings, SyncOptions};
pub use diff::{
    Comparison, DiffCounts, DiffReport, FieldDiff, Outcome, SkippedRecord, SyncStatus,
    diff_records,
};
pub use error::{DiscoveryError, FactoryError, RegistryError, StoreError, SyncError};
pub use model::{Device, DeviceType, FieldMap, FieldSource, FieldValue, Instance, ObjectId};
pub use reconciler::Reconciler;
pub use record::{ComparisonRecord, ExtractContext};
pub use registry::{
    ComponentConfig, DiscoveryReport, Extractor, HostCatalog, KindOrigin, ModelPair, Registry,
    RegistryHandle, StaticCatalog, build_registry,
};
pub use store::{ComponentStore, Inventory, MemoryStore};
