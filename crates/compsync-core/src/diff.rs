// ── Differ ──
//
// Pairs a device's records with its type's template records by name and
// classifies every unified key. Pure: the same inputs always produce the
// same comparisons in the same order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::Serialize;
use strum::Display;
use tracing::{debug, warn};

use crate::config::SyncOptions;
use crate::model::{FieldValue, ObjectId};
use crate::naming::{loose_key, match_key, natural_cmp};
use crate::record::ComparisonRecord;
use crate::registry::ComponentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synchronized,
    Mismatched,
}

/// Device-side and template-side value of one differing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub device: FieldValue,
    pub template: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    BothPresent {
        device: ComparisonRecord,
        template: ComparisonRecord,
        status: SyncStatus,
        field_diffs: BTreeMap<String, FieldDiff>,
        /// Names differ only by case or surrounding whitespace; a rename
        /// suggestion rather than an add/remove pair.
        name_drift: bool,
    },
    DeviceOnly {
        device: ComparisonRecord,
        /// A later duplicate of a name already paired or reported.
        shadowed: bool,
    },
    TemplateOnly {
        template: ComparisonRecord,
        shadowed: bool,
    },
}

/// One unified key and what was found under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub key: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Comparison {
    pub fn device(&self) -> Option<&ComparisonRecord> {
        match &self.outcome {
            Outcome::BothPresent { device, .. } | Outcome::DeviceOnly { device, .. } => Some(device),
            Outcome::TemplateOnly { .. } => None,
        }
    }

    pub fn template(&self) -> Option<&ComparisonRecord> {
        match &self.outcome {
            Outcome::BothPresent { template, .. } | Outcome::TemplateOnly { template, .. } => {
                Some(template)
            }
            Outcome::DeviceOnly { .. } => None,
        }
    }

    pub fn is_synchronized(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::BothPresent {
                status: SyncStatus::Synchronized,
                ..
            }
        )
    }

    pub fn is_name_drift(&self) -> bool {
        matches!(self.outcome, Outcome::BothPresent { name_drift: true, .. })
    }

    /// Short state label for listings.
    pub fn state(&self) -> &'static str {
        match &self.outcome {
            Outcome::BothPresent { name_drift: true, .. } => "rename",
            Outcome::BothPresent {
                status: SyncStatus::Synchronized,
                ..
            } => "synchronized",
            Outcome::BothPresent { .. } => "mismatched",
            Outcome::DeviceOnly { .. } => "device-only",
            Outcome::TemplateOnly { .. } => "template-only",
        }
    }

    fn sort_id(&self) -> ObjectId {
        self.device()
            .or_else(|| self.template())
            .map_or(ObjectId::new(0), |r| r.id)
    }
}

// ── Diff report ──────────────────────────────────────────────────

/// A record the factory could not build; left out of the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub id: ObjectId,
    pub is_template: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub synchronized: usize,
    pub mismatched: usize,
    pub renames: usize,
    pub device_only: usize,
    pub template_only: usize,
}

/// Everything `Reconciler::diff` produces for one device and kind.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub kind: String,
    pub label: String,
    pub device: ObjectId,
    pub device_type: ObjectId,
    pub comparisons: Vec<Comparison>,
    pub skipped: Vec<SkippedRecord>,
}

impl DiffReport {
    pub fn counts(&self) -> DiffCounts {
        let mut counts = DiffCounts::default();
        for comparison in &self.comparisons {
            match &comparison.outcome {
                Outcome::BothPresent { name_drift: true, .. } => counts.renames += 1,
                Outcome::BothPresent {
                    status: SyncStatus::Synchronized,
                    ..
                } => counts.synchronized += 1,
                Outcome::BothPresent { .. } => counts.mismatched += 1,
                Outcome::DeviceOnly { .. } => counts.device_only += 1,
                Outcome::TemplateOnly { .. } => counts.template_only += 1,
            }
        }
        counts
    }

    /// Every key paired and identical, and nothing skipped.
    pub fn is_synchronized(&self) -> bool {
        self.skipped.is_empty() && self.comparisons.iter().all(Comparison::is_synchronized)
    }
}

// ── Algorithm ────────────────────────────────────────────────────

/// First-occurrence-wins index plus the duplicates it shadowed.
fn index(
    records: Vec<ComparisonRecord>,
    case_sensitive: bool,
) -> (BTreeMap<String, ComparisonRecord>, Vec<ComparisonRecord>) {
    let mut by_key = BTreeMap::new();
    let mut shadowed = Vec::new();
    for record in records {
        match by_key.entry(match_key(&record.name, case_sensitive)) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(slot) => {
                warn!(
                    kind = %record.kind,
                    name = %slot.key(),
                    id = %record.id,
                    template = record.is_template,
                    "duplicate component name, later record shadowed"
                );
                shadowed.push(record);
            }
        }
    }
    (by_key, shadowed)
}

fn compared_fields(config: &ComponentConfig, options: &SyncOptions) -> Vec<String> {
    let mut fields = config.comparable_fields.clone();
    if config.compares_description(options.compare_description) {
        fields.push("description".into());
    }
    fields
}

fn field_diffs(
    device: &ComparisonRecord,
    template: &ComparisonRecord,
    fields: &[String],
) -> BTreeMap<String, FieldDiff> {
    fields
        .iter()
        .filter_map(|field| {
            let (d, t) = (device.value(field), template.value(field));
            (d != t).then(|| {
                (
                    field.clone(),
                    FieldDiff {
                        device: d,
                        template: t,
                    },
                )
            })
        })
        .collect()
}

fn pair(
    key: String,
    device: ComparisonRecord,
    template: ComparisonRecord,
    fields: &[String],
    name_drift: bool,
) -> Comparison {
    let mut diffs = field_diffs(&device, &template, fields);
    if name_drift {
        diffs.insert(
            "name".into(),
            FieldDiff {
                device: device.name.as_str().into(),
                template: template.name.as_str().into(),
            },
        );
    }
    let status = if diffs.is_empty() {
        SyncStatus::Synchronized
    } else {
        SyncStatus::Mismatched
    };
    Comparison {
        key,
        outcome: Outcome::BothPresent {
            device,
            template,
            status,
            field_diffs: diffs,
            name_drift,
        },
    }
}

fn drift_candidate(device: &ComparisonRecord, template: &ComparisonRecord) -> bool {
    device.name != template.name
        && loose_key(&device.name) == loose_key(&template.name)
        && device.type_code == template.type_code
        && device.label == template.label
}

/// Classify every unified key across the two collections.
pub fn diff_records(
    device_records: Vec<ComparisonRecord>,
    template_records: Vec<ComparisonRecord>,
    config: &ComponentConfig,
    options: &SyncOptions,
) -> Vec<Comparison> {
    let fields = compared_fields(config, options);
    let (mut devices, device_shadowed) = index(device_records, options.case_sensitive_names);
    let (templates, template_shadowed) = index(template_records, options.case_sensitive_names);

    let mut out = Vec::with_capacity(devices.len() + templates.len());
    let mut unpaired_templates = Vec::new();
    for (key, template) in templates {
        match devices.remove(&key) {
            Some(device) => out.push(pair(key, device, template, &fields, false)),
            None => unpaired_templates.push((key, template)),
        }
    }

    let mut unpaired_devices: Vec<(String, ComparisonRecord)> = devices.into_iter().collect();
    for (key, template) in unpaired_templates {
        let drifted = unpaired_devices
            .iter()
            .position(|(_, device)| drift_candidate(device, &template));
        match drifted {
            Some(pos) => {
                let (_, device) = unpaired_devices.swap_remove(pos);
                debug!(
                    kind = %config.kind,
                    device = %device.name,
                    template = %template.name,
                    "name drift detected"
                );
                out.push(pair(key, device, template, &fields, true));
            }
            None => out.push(Comparison {
                key,
                outcome: Outcome::TemplateOnly {
                    template,
                    shadowed: false,
                },
            }),
        }
    }

    out.extend(unpaired_devices.into_iter().map(|(key, device)| Comparison {
        key,
        outcome: Outcome::DeviceOnly {
            device,
            shadowed: false,
        },
    }));
    out.extend(device_shadowed.into_iter().map(|device| Comparison {
        key: match_key(&device.name, options.case_sensitive_names),
        outcome: Outcome::DeviceOnly {
            device,
            shadowed: true,
        },
    }));
    out.extend(template_shadowed.into_iter().map(|template| Comparison {
        key: match_key(&template.name, options.case_sensitive_names),
        outcome: Outcome::TemplateOnly {
            template,
            shadowed: true,
        },
    }));

    out.sort_by(compare_comparisons);
    out
}

fn outcome_rank(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::BothPresent { .. } => 0,
        Outcome::TemplateOnly { .. } => 1,
        Outcome::DeviceOnly { .. } => 2,
    }
}

fn compare_comparisons(a: &Comparison, b: &Comparison) -> Ordering {
    natural_cmp(&a.key, &b.key)
        .then_with(|| a.sort_id().cmp(&b.sort_id()))
        .then_with(|| outcome_rank(&a.outcome).cmp(&outcome_rank(&b.outcome)))
}
