// ── Component kind auto-discovery ──
//
// Walks the host's model catalog, pairs every component model with its
// template model, and synthesizes a `ComponentConfig` for each pair.
// Pairs that cannot be introspected are skipped and reported; discovery
// itself only fails when the catalog cannot be enumerated at all.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use super::component_config::{ComponentConfig, Extractor, InstanceFilter};
use crate::config::RegistrySettings;
use crate::error::DiscoveryError;

/// Tag marking a model as a device component.
pub const COMPONENT_TAG: &str = "component";

/// Relational and bookkeeping fields that never take part in comparison.
const EXCLUDED_FIELDS: [&str; 13] = [
    "created",
    "last_updated",
    "custom_field_data",
    "tags",
    "device",
    "device_type",
    "module",
    "module_type",
    "_cable_peer",
    "cable",
    "link_peers",
    "connected_endpoints",
    "mark_connected",
];

// ── Catalog descriptors ─────────────────────────────────────────────

/// Storage shape of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    Char,
    Text,
    Integer,
    PositiveInteger,
    SmallInteger,
    Decimal,
    Boolean,
    ForeignKey,
    ManyToMany,
    Reverse,
    DateTime,
    Json,
}

impl FieldKind {
    /// Plain column values that can be copied and compared directly.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::Text
                | Self::Integer
                | Self::PositiveInteger
                | Self::SmallInteger
                | Self::Decimal
                | Self::Boolean
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Enumerated code -> human label, for choice fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub choices: BTreeMap<String, String>,
    /// Target model name, for foreign keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            choices: BTreeMap::new(),
            references: None,
        }
    }

    pub fn referencing(mut self, model: &str) -> Self {
        self.references = Some(model.to_owned());
        self
    }

    pub fn with_choices<'a>(mut self, choices: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.choices = choices
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        self
    }
}

/// Structural description of one host model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// CamelCase model name, e.g. `PowerPort`.
    pub name: String,
    #[serde(default = "default_app_label")]
    pub app_label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

fn default_app_label() -> String {
    "dcim".into()
}

impl ModelDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            app_label: default_app_label(),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_owned());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Tagged as a component, or shaped like one: a non-template model
    /// holding a foreign key to `Device`.
    pub fn is_component(&self) -> bool {
        if self.tags.iter().any(|t| t == COMPONENT_TAG) {
            return true;
        }
        !self.name.ends_with("Template")
            && self.fields.iter().any(|f| {
                f.kind == FieldKind::ForeignKey && f.references.as_deref() == Some("Device")
            })
    }

    /// Scalar field names eligible for copying, sorted.
    fn scalar_fields(&self) -> BTreeSet<&str> {
        self.fields
            .iter()
            .filter(|f| f.kind.is_scalar() && !EXCLUDED_FIELDS.contains(&f.name.as_str()))
            .map(|f| f.name.as_str())
            .collect()
    }
}

/// A component model and its template sibling, if the host has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPair {
    pub component: ModelDescriptor,
    #[serde(default)]
    pub template: Option<ModelDescriptor>,
}

/// Source of model pairs. Implemented by whatever can describe the host's
/// data model.
pub trait HostCatalog {
    fn component_model_pairs(&self) -> Result<Vec<ModelPair>, DiscoveryError>;
}

/// A catalog backed by a fixed list, e.g. loaded from an inventory file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    pub pairs: Vec<ModelPair>,
}

impl StaticCatalog {
    pub fn new(pairs: Vec<ModelPair>) -> Self {
        Self { pairs }
    }
}

impl HostCatalog for StaticCatalog {
    fn component_model_pairs(&self) -> Result<Vec<ModelPair>, DiscoveryError> {
        Ok(self.pairs.clone())
    }
}

// ── Report ──────────────────────────────────────────────────────────

/// A model discovery could not turn into a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedModel {
    pub model: String,
    pub reason: String,
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub kinds: BTreeMap<String, ComponentConfig>,
    pub skipped: Vec<SkippedModel>,
    pub excluded: Vec<String>,
}

// ── Discovery ───────────────────────────────────────────────────────

/// Synthesize configs for every component/template pair in the catalog.
pub fn discover(
    catalog: &dyn HostCatalog,
    settings: &RegistrySettings,
) -> Result<DiscoveryReport, DiscoveryError> {
    let mut report = DiscoveryReport::default();
    if !settings.enable_auto_discovery {
        info!("auto-discovery is disabled");
        return Ok(report);
    }

    let pairs = catalog.component_model_pairs()?;
    let component_models: BTreeSet<&str> = pairs
        .iter()
        .filter(|p| p.template.is_some())
        .map(|p| p.component.name.as_str())
        .collect();

    for pair in &pairs {
        if report.kinds.len() >= settings.max_discovered {
            warn!(
                limit = settings.max_discovered,
                "component discovery limit reached, stopping"
            );
            break;
        }

        let kind = pair.component.name.to_lowercase();
        if settings.is_excluded(&kind) {
            debug!(%kind, "excluding component kind per configuration");
            report.excluded.push(kind);
            continue;
        }

        match synthesize(pair, &kind, &component_models, settings) {
            Ok(config) => {
                debug!(%kind, fields = config.verbatim_fields.len(), "discovered component kind");
                report.kinds.insert(kind, config);
            }
            Err(reason) => {
                warn!(model = %pair.component.name, %reason, "skipping model");
                report.skipped.push(SkippedModel {
                    model: pair.component.name.clone(),
                    reason,
                });
            }
        }
    }

    info!(
        discovered = report.kinds.len(),
        skipped = report.skipped.len(),
        "auto-discovery completed"
    );
    Ok(report)
}

fn synthesize(
    pair: &ModelPair,
    kind: &str,
    component_models: &BTreeSet<&str>,
    settings: &RegistrySettings,
) -> Result<ComponentConfig, String> {
    let component = &pair.component;
    if !component.is_component() {
        return Err("not a component model".into());
    }
    let Some(template) = pair.template.as_ref() else {
        return Err(format!("no template model for {}", component.name));
    };
    for model in [component, template] {
        if model.get_field("name").is_none() {
            return Err(format!("{} is missing expected attribute 'name'", model.name));
        }
    }

    let component_fields = component.scalar_fields();
    let template_fields = template.scalar_fields();

    let mut verbatim: Vec<&str> = vec!["id"];
    verbatim.extend(
        component_fields
            .intersection(&template_fields)
            .copied()
            .filter(|f| *f != "id"),
    );
    let non_comparable: Vec<&str> = component_fields
        .symmetric_difference(&template_fields)
        .copied()
        .collect();
    let comparable: Vec<&str> = verbatim
        .iter()
        .copied()
        .filter(|f| !matches!(*f, "id" | "name" | "description"))
        .collect();

    let mut config = ComponentConfig::new(kind, component_label(&component.name))
        .verbatim(verbatim.iter().copied())
        .comparable(comparable)
        .with_model_permissions(&component.app_label, kind);
    config.non_comparable_fields = non_comparable.into_iter().map(str::to_owned).collect();

    for field in &component.fields {
        if !field.choices.is_empty() && config.has_verbatim(&field.name) {
            config = config.special(
                &format!("{}_display", field.name),
                Extractor::choice_label(&field.name, field.choices.clone()),
            );
        }
        if field.kind != FieldKind::ForeignKey || template.get_field(&field.name).is_none() {
            continue;
        }
        if let Some(target) = field
            .references
            .as_deref()
            .filter(|target| component_models.contains(target))
        {
            let special = format!("{}_name", field.name);
            config = config
                .special(&special, Extractor::reference(&field.name, &target.to_lowercase()))
                .comparable([special]);
        }
    }

    if component.get_field("module").is_some() {
        config = config.filter(InstanceFilter::ExcludeModuleMembers);
    }
    if component.get_field("level").is_some() {
        config = config.filter(InstanceFilter::TopLevelOnly);
    }
    if kind == "interface" && !settings.exclude_interface_types.is_empty() {
        config = config.filter(InstanceFilter::ExcludeTypes(
            settings.exclude_interface_types.clone(),
        ));
    }

    Ok(config)
}

/// `ConsoleServerPort` -> "Console server ports".
pub fn component_label(model_name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for (i, ch) in model_name.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            words.push(String::new());
        }
        match words.last_mut() {
            Some(word) => word.push(ch),
            None => words.push(ch.to_string()),
        }
    }
    let sentence = words
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.clone() } else { w.to_lowercase() })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{sentence}s")
}
