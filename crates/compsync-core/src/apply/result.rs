use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::model::ObjectId;

/// Which group a failed item belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Add,
    Remove,
    Rename,
}

/// One item that did not apply, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub action: ItemAction,
    /// Template id for adds, component id otherwise.
    pub id: ObjectId,
    pub reason: String,
}

/// Aggregate outcome of one apply call. Always produced once validation
/// passes, whatever happened to individual items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub device: ObjectId,
    pub kind: String,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub renamed: usize,
    /// Already-absent deletes, no-op renames, and items never started
    /// because of cancellation.
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
    pub completed_at: DateTime<Utc>,
}

impl ReconciliationResult {
    pub(crate) fn new(device: ObjectId, kind: &str) -> Self {
        Self {
            device,
            kind: kind.to_owned(),
            created: 0,
            updated: 0,
            deleted: 0,
            renamed: 0,
            skipped: 0,
            failures: Vec::new(),
            cancelled: false,
            completed_at: Utc::now(),
        }
    }

    /// Every requested item applied and nothing was cut short.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted + self.renamed
    }

    /// One-line human summary, e.g. "Created 2 interfaces; deleted 1 interfaces".
    pub fn summary(&self, label: &str) -> String {
        let label = label.to_lowercase();
        let mut parts: Vec<String> = [
            ("created", self.created),
            ("updated", self.updated),
            ("deleted", self.deleted),
            ("renamed", self.renamed),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(verb, count)| format!("{verb} {count} {label}"))
        .collect();

        if !self.failures.is_empty() {
            parts.push(format!("{} failed", self.failures.len()));
        }
        if self.cancelled {
            parts.push("cancelled".into());
        }

        let Some(first) = parts.first_mut() else {
            return format!("No changes made to {label}");
        };
        if let Some(initial) = first.get(..1) {
            *first = format!("{}{}", initial.to_uppercase(), &first[1..]);
        }
        parts.join("; ")
    }
}
