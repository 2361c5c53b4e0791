// ── Runtime engine settings ──
//
// Plain values describing how the registry is built and how comparisons
// and applies behave. The config crate builds these from TOML/env; core
// never touches disk.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Per-request comparison and apply behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Whether `description` participates in field diffing. When off,
    /// descriptions are also left untouched on creation/update.
    pub compare_description: bool,
    /// Pair names exactly (`true`) or after lower-casing (`false`).
    pub case_sensitive_names: bool,
    /// Upper bound on in-flight persistence calls during an apply.
    pub max_concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            compare_description: true,
            case_sensitive_names: true,
            max_concurrency: 16,
        }
    }
}

/// How the registry is assembled at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    pub enable_auto_discovery: bool,
    /// Kinds auto-discovery must never produce. Compared case-insensitively.
    pub excluded_kinds: BTreeSet<String>,
    /// Safety cap on how many component kinds discovery may synthesize.
    pub max_discovered: usize,
    /// Interface type codes hidden from device-side interface listings.
    pub exclude_interface_types: Vec<String>,
}

impl RegistrySettings {
    pub fn is_excluded(&self, kind: &str) -> bool {
        self.excluded_kinds
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(kind))
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            enable_auto_discovery: true,
            excluded_kinds: BTreeSet::new(),
            max_discovered: 50,
            exclude_interface_types: vec!["lag".into(), "bridge".into()],
        }
    }
}
