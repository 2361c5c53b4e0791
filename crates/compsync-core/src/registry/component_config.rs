// ── Per-kind configuration ──
//
// A `ComponentConfig` is everything the engine knows about one kind of
// component: which fields to read, which to derive, which to compare,
// and which device-side instances to ignore.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::model::{FieldSource, FieldValue};

/// Fields every record carries outside its `extras` map.
pub const CORE_FIELDS: [&str; 5] = ["id", "name", "label", "description", "type"];

/// Operations a permission id is synthesized for, in host order.
const PERMISSION_ACTIONS: [&str; 4] = ["view", "add", "change", "delete"];

/// Signature of a free-form extraction function.
pub type ExtractFn = dyn Fn(&dyn FieldSource) -> Result<FieldValue, String> + Send + Sync;

/// How a special field's value is computed from an instance.
#[derive(Clone)]
pub enum Extractor {
    /// Human label for an enumerated code, e.g. `type` -> "SFP+ (10GE)".
    /// Unknown codes fall back to the raw code.
    ChoiceLabel {
        source: String,
        choices: Arc<BTreeMap<String, String>>,
    },
    /// Name of the same-side sibling instance referenced by `id_field`.
    /// Unresolvable references produce an empty name.
    Reference {
        id_field: String,
        target_kind: String,
    },
    Custom(Arc<ExtractFn>),
}

impl Extractor {
    pub fn choice_label<I, K, V>(source: &str, choices: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::ChoiceLabel {
            source: source.to_owned(),
            choices: Arc::new(
                choices
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn reference(id_field: &str, target_kind: &str) -> Self {
        Self::Reference {
            id_field: id_field.to_owned(),
            target_kind: target_kind.to_owned(),
        }
    }

    pub fn custom(
        f: impl Fn(&dyn FieldSource) -> Result<FieldValue, String> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// The kind whose names must be indexed before this extractor can run.
    pub fn reference_kind(&self) -> Option<&str> {
        match self {
            Self::Reference { target_kind, .. } => Some(target_kind),
            Self::ChoiceLabel { .. } | Self::Custom(_) => None,
        }
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChoiceLabel { source, choices } => f
                .debug_struct("ChoiceLabel")
                .field("source", source)
                .field("choices", &choices.len())
                .finish(),
            Self::Reference {
                id_field,
                target_kind,
            } => f
                .debug_struct("Reference")
                .field("id_field", id_field)
                .field("target_kind", target_kind)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A derived field: stored on the record under `name`.
#[derive(Debug, Clone)]
pub struct SpecialField {
    pub name: String,
    pub extractor: Extractor,
}

/// Rules hiding instances from comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceFilter {
    /// Drop instances attached to a module (non-null `module`).
    ExcludeModuleMembers,
    /// Keep only top-level instances (`level` absent, null or 0).
    TopLevelOnly,
    /// Drop instances whose `type` is one of these codes.
    ExcludeTypes(Vec<String>),
}

impl InstanceFilter {
    pub fn admits(&self, instance: &dyn FieldSource) -> bool {
        match self {
            Self::ExcludeModuleMembers => instance
                .field_value("module")
                .is_none_or(|v| v.is_null()),
            Self::TopLevelOnly => instance
                .field_value("level")
                .is_none_or(|v| v.is_null() || v.as_int() == Some(0)),
            Self::ExcludeTypes(types) => instance
                .field_value("type")
                .and_then(|v| v.as_str().map(str::to_owned))
                .is_none_or(|t| !types.contains(&t)),
        }
    }
}

/// Everything the engine knows about one component kind.
#[derive(Debug, Clone)]
pub struct ComponentConfig {
    pub kind: String,
    /// Plural human label, e.g. "Power ports".
    pub label: String,
    /// Fields copied as-is from an instance into its record.
    pub verbatim_fields: Vec<String>,
    pub special_fields: Vec<SpecialField>,
    /// Fields whose inequality makes a paired record mismatched.
    /// `description` is handled separately through `SyncOptions`.
    pub comparable_fields: Vec<String>,
    /// Fields present on only one of the two models. Never compared.
    pub non_comparable_fields: Vec<String>,
    /// Opaque permission ids, passed through to the caller.
    pub permissions: Vec<String>,
    /// Exclude this kind from description comparison and copying.
    pub skip_description: bool,
    pub filters: Vec<InstanceFilter>,
}

impl ComponentConfig {
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: label.into(),
            verbatim_fields: Vec::new(),
            special_fields: Vec::new(),
            comparable_fields: Vec::new(),
            non_comparable_fields: Vec::new(),
            permissions: Vec::new(),
            skip_description: false,
            filters: Vec::new(),
        }
    }

    pub fn verbatim<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verbatim_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn comparable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comparable_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn special(mut self, name: &str, extractor: Extractor) -> Self {
        self.special_fields.push(SpecialField {
            name: name.to_owned(),
            extractor,
        });
        self
    }

    pub fn filter(mut self, filter: InstanceFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn without_description(mut self) -> Self {
        self.skip_description = true;
        self
    }

    /// Synthesize `{app}.{view,add,change,delete}_{model}` permission ids.
    pub fn with_model_permissions(mut self, app_label: &str, model: &str) -> Self {
        self.permissions = PERMISSION_ACTIONS
            .iter()
            .map(|action| format!("{app_label}.{action}_{model}"))
            .collect();
        self
    }

    pub fn has_verbatim(&self, field: &str) -> bool {
        self.verbatim_fields.iter().any(|f| f == field)
    }

    pub fn has_special(&self, field: &str) -> bool {
        self.special_fields.iter().any(|s| s.name == field)
    }

    /// Whether `description` takes part in diffing for this kind.
    pub fn compares_description(&self, compare_description: bool) -> bool {
        compare_description && !self.skip_description && self.has_verbatim("description")
    }

    /// Kinds whose names must be indexed to evaluate reference fields.
    pub fn referenced_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self
            .special_fields
            .iter()
            .filter_map(|s| s.extractor.reference_kind())
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    pub fn admits(&self, instance: &dyn FieldSource) -> bool {
        self.filters.iter().all(|f| f.admits(instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instance, ObjectId};

    fn iface(kind_type: &str) -> Instance {
        Instance::new(ObjectId::new(1), ObjectId::new(1), "interface")
            .with("name", "eth0")
            .with("type", kind_type)
    }

    #[test]
    fn model_permissions_follow_host_convention() {
        let cfg = ComponentConfig::new("rearport", "Rear ports").with_model_permissions("dcim", "rearport");
        assert_eq!(
            cfg.permissions,
            vec![
                "dcim.view_rearport",
                "dcim.add_rearport",
                "dcim.change_rearport",
                "dcim.delete_rearport",
            ]
        );
    }

    #[test]
    fn exclude_types_filter() {
        let filter = InstanceFilter::ExcludeTypes(vec!["lag".into()]);
        assert!(!filter.admits(&iface("lag")));
        assert!(filter.admits(&iface("1000base-t")));
    }

    #[test]
    fn module_members_are_filtered() {
        let filter = InstanceFilter::ExcludeModuleMembers;
        assert!(filter.admits(&iface("virtual")));
        assert!(filter.admits(&iface("virtual").with("module", FieldValue::Null)));
        assert!(!filter.admits(&iface("virtual").with("module", 4)));
    }

    #[test]
    fn top_level_only() {
        let filter = InstanceFilter::TopLevelOnly;
        assert!(filter.admits(&iface("x").with("level", 0)));
        assert!(!filter.admits(&iface("x").with("level", 1)));
    }

    #[test]
    fn description_comparison_needs_the_field() {
        let cfg = ComponentConfig::new("devicebay", "Device bays").verbatim(["id", "name", "label"]);
        assert!(!cfg.compares_description(true));
        let cfg = cfg.verbatim(["description"]);
        assert!(cfg.compares_description(true));
        assert!(!cfg.compares_description(false));
        assert!(!cfg.without_description().compares_description(true));
    }
}
