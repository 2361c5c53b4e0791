// ── Reconciliation requests ──
//
// What a caller asks the apply engine to do, and the bulk actions that
// turn a diff into such a request.

mod engine;
mod result;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub(crate) use engine::{apply, validate};
pub use result::{ItemAction, ItemFailure, ReconciliationResult};

use crate::diff::{Comparison, Outcome, SyncStatus};
use crate::model::ObjectId;

/// Rename a device component to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePair {
    pub component: ObjectId,
    pub name: String,
}

/// A caller-selected set of operations against one device and kind.
///
/// `add` holds template ids, `remove` and `rename` device component ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    pub device: ObjectId,
    pub kind: String,
    #[serde(default)]
    pub add: Vec<ObjectId>,
    #[serde(default)]
    pub remove: Vec<ObjectId>,
    #[serde(default)]
    pub rename: Vec<RenamePair>,
}

impl ReconciliationRequest {
    pub fn new(device: ObjectId, kind: impl Into<String>) -> Self {
        Self {
            device,
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn add(mut self, template: ObjectId) -> Self {
        self.add.push(template);
        self
    }

    pub fn remove(mut self, component: ObjectId) -> Self {
        self.remove.push(component);
        self
    }

    pub fn rename(mut self, component: ObjectId, name: impl Into<String>) -> Self {
        self.rename.push(RenamePair {
            component,
            name: name.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.rename.is_empty()
    }

    pub fn len(&self) -> usize {
        self.add.len() + self.remove.len() + self.rename.len()
    }
}

// ── Bulk actions ─────────────────────────────────────────────────

/// Whole-diff operations offered next to per-item selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SyncAction {
    /// Create every template-only component and update mismatched pairs.
    AddMissing,
    /// Rename components whose names drifted from their template.
    RepairNames,
    /// Delete every device-only component.
    RemoveExtra,
    SyncAll,
}

impl SyncAction {
    fn adds(self) -> bool {
        matches!(self, Self::AddMissing | Self::SyncAll)
    }

    fn repairs(self) -> bool {
        matches!(self, Self::RepairNames | Self::SyncAll)
    }

    fn removes(self) -> bool {
        matches!(self, Self::RemoveExtra | Self::SyncAll)
    }
}

/// Translate `actions` over `comparisons` into a request.
///
/// Shadowed template duplicates are never added: their name already
/// belongs to the first template of that name.
pub fn plan(
    device: ObjectId,
    kind: &str,
    comparisons: &[Comparison],
    actions: &[SyncAction],
) -> ReconciliationRequest {
    let wants = |pred: fn(SyncAction) -> bool| actions.iter().copied().any(pred);
    let (adds, repairs, removes) = (
        wants(SyncAction::adds),
        wants(SyncAction::repairs),
        wants(SyncAction::removes),
    );

    let mut request = ReconciliationRequest::new(device, kind);
    for comparison in comparisons {
        match &comparison.outcome {
            Outcome::TemplateOnly {
                template,
                shadowed: false,
            }
            | Outcome::BothPresent {
                template,
                status: SyncStatus::Mismatched,
                name_drift: false,
                ..
            } if adds => request.add.push(template.id),
            Outcome::BothPresent {
                device,
                template,
                name_drift: true,
                ..
            } if repairs => request.rename.push(RenamePair {
                component: device.id,
                name: template.name.clone(),
            }),
            Outcome::DeviceOnly { device, .. } if removes => request.remove.push(device.id),
            _ => {}
        }
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncOptions;
    use crate::diff::diff_records;
    use crate::record::ComparisonRecord;
    use crate::registry::ComponentConfig;
    use std::collections::BTreeMap;

    fn rec(id: u64, name: &str, label: &str, is_template: bool) -> ComparisonRecord {
        ComparisonRecord {
            id: ObjectId::new(id),
            name: name.into(),
            label: label.into(),
            type_code: None,
            description: None,
            kind: "devicebay".into(),
            is_template,
            extras: BTreeMap::new(),
        }
    }

    fn comparisons() -> Vec<Comparison> {
        let config = ComponentConfig::new("devicebay", "Device bays")
            .verbatim(["id", "name", "label"])
            .comparable(["label"]);
        diff_records(
            vec![
                rec(1, "bay1", "", false),
                rec(2, "bay2", "x", false),
                rec(3, "BAY3 ", "", false),
                rec(4, "old", "", false),
            ],
            vec![
                rec(11, "bay1", "", true),
                rec(12, "bay2", "y", true),
                rec(13, "bay3", "", true),
                rec(14, "bay4", "", true),
            ],
            &config,
            &SyncOptions::default(),
        )
    }

    #[test]
    fn add_missing_covers_creates_and_updates() {
        let request = plan(ObjectId::new(1), "devicebay", &comparisons(), &[SyncAction::AddMissing]);
        assert_eq!(request.add, vec![ObjectId::new(12), ObjectId::new(14)]);
        assert!(request.remove.is_empty());
        assert!(request.rename.is_empty());
    }

    #[test]
    fn repair_names_renames_drifted_components() {
        let request = plan(ObjectId::new(1), "devicebay", &comparisons(), &[SyncAction::RepairNames]);
        assert_eq!(
            request.rename,
            vec![RenamePair {
                component: ObjectId::new(3),
                name: "bay3".into(),
            }]
        );
    }

    #[test]
    fn sync_all_is_the_union() {
        let request = plan(ObjectId::new(1), "devicebay", &comparisons(), &[SyncAction::SyncAll]);
        assert_eq!(request.len(), 4);
        assert_eq!(request.remove, vec![ObjectId::new(4)]);
    }

    #[test]
    fn actions_parse_from_kebab_case() {
        assert_eq!("remove-extra".parse::<SyncAction>().ok(), Some(SyncAction::RemoveExtra));
        assert_eq!(SyncAction::AddMissing.to_string(), "add-missing");
    }
}
