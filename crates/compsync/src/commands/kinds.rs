//! Kind registry inspection.

use serde::Serialize;
use tabled::Tabled;

use compsync_core::registry::{InstanceFilter, RegistryEntry};
use compsync_core::{ComponentConfig, Extractor, KindOrigin};

use crate::cli::KindsArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct KindView {
    kind: String,
    label: String,
    origin: KindOrigin,
    verbatim: Vec<String>,
    special: Vec<SpecialView>,
    comparable: Vec<String>,
    non_comparable: Vec<String>,
    filters: Vec<String>,
    permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SpecialView {
    name: String,
    derived_from: String,
}

fn describe_extractor(extractor: &Extractor) -> String {
    match extractor {
        Extractor::ChoiceLabel { source, choices } => {
            format!("label of '{source}' ({} choices)", choices.len())
        }
        Extractor::Reference {
            id_field,
            target_kind,
        } => format!("name of the {target_kind} in '{id_field}'"),
        Extractor::Custom(_) => "custom".into(),
    }
}

fn describe_filter(filter: &InstanceFilter) -> String {
    match filter {
        InstanceFilter::ExcludeModuleMembers => "excludes module members".into(),
        InstanceFilter::TopLevelOnly => "top-level only".into(),
        InstanceFilter::ExcludeTypes(types) => format!("excludes types {}", types.join(", ")),
    }
}

impl KindView {
    fn new(entry: &RegistryEntry) -> Self {
        let config: &ComponentConfig = &entry.config;
        Self {
            kind: config.kind.clone(),
            label: config.label.clone(),
            origin: entry.origin,
            verbatim: config.verbatim_fields.clone(),
            special: config
                .special_fields
                .iter()
                .map(|s| SpecialView {
                    name: s.name.clone(),
                    derived_from: describe_extractor(&s.extractor),
                })
                .collect(),
            comparable: config.comparable_fields.clone(),
            non_comparable: config.non_comparable_fields.clone(),
            filters: config.filters.iter().map(describe_filter).collect(),
            permissions: config.permissions.clone(),
        }
    }

    fn detail(&self) -> String {
        let list = |items: &[String]| {
            if items.is_empty() {
                "-".to_owned()
            } else {
                items.join(", ")
            }
        };
        let special: Vec<String> = self
            .special
            .iter()
            .map(|s| format!("{} ({})", s.name, s.derived_from))
            .collect();
        [
            format!("{} [{}]", self.kind, self.origin),
            format!("  Label:           {}", self.label),
            format!("  Fields:          {}", list(&self.verbatim)),
            format!("  Derived:         {}", list(&special)),
            format!("  Compared:        {}", list(&self.comparable)),
            format!("  One-sided:       {}", list(&self.non_comparable)),
            format!("  Filters:         {}", list(&self.filters)),
            format!("  Permissions:     {}", list(&self.permissions)),
        ]
        .join("\n")
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Origin")]
    origin: String,
    #[tabled(rename = "Compared")]
    compared: String,
}

impl From<&KindView> for KindRow {
    fn from(v: &KindView) -> Self {
        Self {
            kind: v.kind.clone(),
            label: v.label.clone(),
            origin: v.origin.to_string(),
            compared: v.comparable.join(", "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &KindsArgs, settings: &Settings) -> Result<(), CliError> {
    let inventory = args
        .inventory
        .as_deref()
        .map(util::read_inventory)
        .transpose()?;
    let (registry, report) = util::registry_for(inventory.as_ref(), &settings.registry)?;

    let views: Vec<KindView> = match &args.kind {
        Some(kind) => {
            let entry = registry
                .iter()
                .find(|(k, _)| *k == kind.as_str())
                .map(|(_, e)| e)
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "component kind".into(),
                    identifier: kind.clone(),
                    hint: "Run: compsync kinds to see registered kinds".into(),
                })?;
            vec![KindView::new(entry)]
        }
        None => registry.iter().map(|(_, e)| KindView::new(e)).collect(),
    };

    let out = if args.detailed {
        output::render_single(
            settings.output,
            &views,
            |vs| vs.iter().map(KindView::detail).collect::<Vec<_>>().join("\n\n"),
            |vs| vs.iter().map(|v| v.kind.clone()).collect::<Vec<_>>().join("\n"),
        )
    } else {
        output::render_list(settings.output, &views, |v| KindRow::from(v), |v| v.kind.clone())
    };
    output::print_output(&out, settings.quiet);

    let color = output::should_color(settings.color);
    for skipped in &report.skipped {
        output::status(
            &format!("skipped model {}: {}", skipped.model, skipped.reason),
            Tone::Warn,
            color,
            settings.quiet,
        );
    }
    if args.detailed && !report.excluded.is_empty() {
        output::status(
            &format!("excluded by config: {}", report.excluded.join(", ")),
            Tone::Warn,
            color,
            settings.quiet,
        );
    }
    Ok(())
}
