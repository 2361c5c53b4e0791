// ── Component kind registry ──
//
// Immutable mapping from kind identifier to `ComponentConfig`, built once
// from the static declarations plus whatever auto-discovery finds. Readers
// take cheap snapshots; a reload swaps the whole registry atomically.

pub mod builtin;
pub mod component_config;
pub mod discovery;

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, info};

pub use builtin::{BUILTIN_KINDS, builtin_configs};
pub use component_config::{
    CORE_FIELDS, ComponentConfig, ExtractFn, Extractor, InstanceFilter, SpecialField,
};
pub use discovery::{
    DiscoveryReport, FieldDescriptor, FieldKind, HostCatalog, ModelDescriptor, ModelPair,
    SkippedModel, StaticCatalog, discover,
};

use crate::config::RegistrySettings;
use crate::error::{RegistryError, SyncError};

/// Where a kind's config came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KindOrigin {
    Static,
    Discovered,
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub config: Arc<ComponentConfig>,
    pub origin: KindOrigin,
}

// ── Registry ─────────────────────────────────────────────────────

/// Read-only kind lookup. Never mutated after `RegistryBuilder::build`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a kind's config.
    pub fn get(&self, kind: &str) -> Result<Arc<ComponentConfig>, SyncError> {
        self.entries
            .get(kind)
            .map(|e| Arc::clone(&e.config))
            .ok_or_else(|| SyncError::unknown_kind(kind))
    }

    pub fn origin(&self, kind: &str) -> Option<KindOrigin> {
        self.entries.get(kind).map(|e| e.origin)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// All registered kind identifiers, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validating accumulator for `Registry`.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<String, RegistryEntry>,
}

impl RegistryBuilder {
    /// Add a kind. Rejects empty or duplicate kinds and comparable fields
    /// the config never extracts.
    pub fn register(
        mut self,
        config: ComponentConfig,
        origin: KindOrigin,
    ) -> Result<Self, RegistryError> {
        validate(&config)?;
        if self.entries.contains_key(&config.kind) {
            return Err(RegistryError::DuplicateKind { kind: config.kind });
        }
        self.entries.insert(
            config.kind.clone(),
            RegistryEntry {
                config: Arc::new(config),
                origin,
            },
        );
        Ok(self)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}

fn validate(config: &ComponentConfig) -> Result<(), RegistryError> {
    if config.kind.trim().is_empty() {
        return Err(RegistryError::EmptyKind);
    }
    for field in &config.comparable_fields {
        let known = CORE_FIELDS.contains(&field.as_str())
            || config.has_verbatim(field)
            || config.has_special(field);
        if !known {
            return Err(RegistryError::UnknownComparableField {
                kind: config.kind.clone(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

/// Assemble the registry: static kinds first, then discovered kinds that
/// do not collide with them.
pub fn build_registry(
    catalog: Option<&dyn HostCatalog>,
    settings: &RegistrySettings,
) -> Result<(Registry, DiscoveryReport), RegistryError> {
    let mut builder = Registry::builder();
    for config in builtin_configs(settings) {
        builder = builder.register(config, KindOrigin::Static)?;
    }

    let mut report = match catalog {
        Some(catalog) => discover(catalog, settings)?,
        None => DiscoveryReport::default(),
    };

    let discovered = std::mem::take(&mut report.kinds);
    for (kind, config) in discovered {
        if builder.contains(&kind) {
            debug!(%kind, "static config takes precedence over discovered kind");
            continue;
        }
        builder = builder.register(config.clone(), KindOrigin::Discovered)?;
        report.kinds.insert(kind, config);
    }

    let registry = builder.build();
    info!(
        kinds = registry.len(),
        discovered = report.kinds.len(),
        "component registry built"
    );
    Ok((registry, report))
}

// ── RegistryHandle ───────────────────────────────────────────────

/// Shared, atomically replaceable registry.
///
/// In-flight operations keep the snapshot they started with; a reload
/// only affects operations that begin afterwards.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    inner: Arc<ArcSwap<Registry>>,
}

impl RegistryHandle {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(registry)),
        }
    }

    pub fn snapshot(&self) -> Arc<Registry> {
        self.inner.load_full()
    }

    pub fn replace(&self, registry: Registry) {
        self.inner.store(Arc::new(registry));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn catalog_with(name: &str) -> StaticCatalog {
        let model = |n: &str| {
            ModelDescriptor::new(n)
                .field(FieldDescriptor::new("id", FieldKind::Integer))
                .field(FieldDescriptor::new("name", FieldKind::Char))
                .field(FieldDescriptor::new("label", FieldKind::Char))
        };
        StaticCatalog::new(vec![ModelPair {
            component: model(name).tagged(discovery::COMPONENT_TAG),
            template: Some(model(&format!("{name}Template"))),
        }])
    }

    #[test]
    fn static_kinds_are_always_present() {
        let (registry, _) = build_registry(None, &RegistrySettings::default()).unwrap();
        for kind in BUILTIN_KINDS {
            assert_eq!(registry.origin(kind), Some(KindOrigin::Static));
        }
        assert!(matches!(
            registry.get("nope"),
            Err(SyncError::UnknownKind { .. })
        ));
    }

    #[test]
    fn discovered_kinds_never_replace_static_ones() {
        let catalog = catalog_with("Interface");
        let (registry, report) =
            build_registry(Some(&catalog), &RegistrySettings::default()).unwrap();
        assert_eq!(registry.origin("interface"), Some(KindOrigin::Static));
        assert!(report.kinds.is_empty());
        assert!(registry.get("interface").unwrap().has_verbatim("mgmt_only"));
    }

    #[test]
    fn new_kinds_are_registered_as_discovered() {
        let catalog = catalog_with("InventoryItem");
        let (registry, report) =
            build_registry(Some(&catalog), &RegistrySettings::default()).unwrap();
        assert_eq!(registry.origin("inventoryitem"), Some(KindOrigin::Discovered));
        assert_eq!(registry.len(), BUILTIN_KINDS.len() + 1);
        assert!(report.kinds.contains_key("inventoryitem"));
    }

    #[test]
    fn builder_rejects_bad_configs() {
        let dup = Registry::builder()
            .register(ComponentConfig::new("x", "X"), KindOrigin::Static)
            .unwrap()
            .register(ComponentConfig::new("x", "X"), KindOrigin::Static);
        assert!(matches!(dup, Err(RegistryError::DuplicateKind { .. })));

        let empty = Registry::builder().register(ComponentConfig::new(" ", "X"), KindOrigin::Static);
        assert!(matches!(empty, Err(RegistryError::EmptyKind)));

        let unknown = Registry::builder().register(
            ComponentConfig::new("x", "X").comparable(["speed"]),
            KindOrigin::Static,
        );
        assert!(matches!(
            unknown,
            Err(RegistryError::UnknownComparableField { .. })
        ));
    }

    #[test]
    fn handle_swaps_without_disturbing_snapshots() {
        let (registry, _) = build_registry(None, &RegistrySettings::default()).unwrap();
        let handle = RegistryHandle::new(registry);
        let before = handle.snapshot();

        handle.replace(Registry::default());
        assert_eq!(before.len(), BUILTIN_KINDS.len());
        assert!(handle.snapshot().is_empty());
    }
}
