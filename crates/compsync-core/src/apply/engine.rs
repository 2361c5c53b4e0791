// ── Apply engine ──
//
// Validates a request up front, then runs every item as its own future
// on the caller's task with bounded concurrency. Item failures are
// captured, never propagated; the call returns once all items settle.

use std::collections::{BTreeMap, BTreeSet};

use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::result::{ItemAction, ItemFailure, ReconciliationResult};
use super::{ReconciliationRequest, RenamePair};
use crate::config::SyncOptions;
use crate::error::{StoreError, SyncError};
use crate::model::{Device, FieldMap, FieldValue, Instance, ObjectId};
use crate::naming::match_key;
use crate::record::creation_fields;
use crate::registry::ComponentConfig;
use crate::store::{ComponentStore, require_device, require_device_type};

/// A request that passed the systemic checks.
#[derive(Debug)]
pub(crate) struct ValidatedRequest {
    pub device: Device,
    /// Templates to add, in request order.
    pub add: Vec<Instance>,
    pub remove: Vec<ObjectId>,
    pub rename: Vec<RenamePair>,
}

/// All-or-nothing checks. Absent component ids pass: deleting them is a
/// no-op and renaming them is a per-item failure.
pub(crate) async fn validate(
    store: &dyn ComponentStore,
    config: &ComponentConfig,
    request: &ReconciliationRequest,
) -> Result<ValidatedRequest, SyncError> {
    let kind = config.kind.as_str();
    let device = require_device(store, request.device).await?;
    let type_id = require_device_type(store, &device).await?.id;

    let mut templates: BTreeMap<ObjectId, Instance> = store
        .list_by_device_type(kind, type_id)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    let mut add = Vec::with_capacity(request.add.len());
    for id in dedup(&request.add) {
        let template = templates.remove(&id).ok_or_else(|| SyncError::InvalidReference {
            kind: kind.to_owned(),
            id,
            reason: format!("not a template of device type {type_id}"),
        })?;
        add.push(template);
    }

    let remove = dedup(&request.remove);
    let mut seen = BTreeSet::new();
    for pair in &request.rename {
        if pair.name.trim().is_empty() {
            return Err(SyncError::InvalidRequest {
                message: format!("rename of {} to an empty name", pair.component),
            });
        }
        if !seen.insert(pair.component) || remove.contains(&pair.component) {
            return Err(SyncError::InvalidRequest {
                message: format!("component {} is selected more than once", pair.component),
            });
        }
    }

    let referenced = remove.iter().chain(request.rename.iter().map(|r| &r.component));
    for &id in referenced {
        let foreign = store
            .get_component(kind, id)
            .await?
            .filter(|c| c.owner != device.id);
        if let Some(component) = foreign {
            return Err(SyncError::InvalidReference {
                kind: kind.to_owned(),
                id,
                reason: format!(
                    "belongs to device {}, not {}",
                    component.owner, device.id
                ),
            });
        }
    }

    Ok(ValidatedRequest {
        device,
        add,
        remove,
        rename: request.rename.clone(),
    })
}

fn dedup(ids: &[ObjectId]) -> Vec<ObjectId> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

// ── Items ────────────────────────────────────────────────────────

enum WorkItem {
    Add(Instance),
    Remove(ObjectId),
    Rename(RenamePair),
}

impl WorkItem {
    fn action(&self) -> ItemAction {
        match self {
            Self::Add(_) => ItemAction::Add,
            Self::Remove(_) => ItemAction::Remove,
            Self::Rename(_) => ItemAction::Rename,
        }
    }

    fn id(&self) -> ObjectId {
        match self {
            Self::Add(template) => template.id,
            Self::Remove(id) => *id,
            Self::Rename(pair) => pair.component,
        }
    }
}

enum ItemOutcome {
    Created,
    Updated,
    Deleted,
    Renamed,
    Skipped,
    NotStarted,
    Failed(ItemFailure),
}

struct Worker<'a> {
    store: &'a dyn ComponentStore,
    config: &'a ComponentConfig,
    options: &'a SyncOptions,
    device: ObjectId,
}

impl Worker<'_> {
    fn kind(&self) -> &str {
        &self.config.kind
    }

    async fn run(&self, item: WorkItem) -> ItemOutcome {
        let (action, id) = (item.action(), item.id());
        let outcome = match item {
            WorkItem::Add(template) => self.add(&template).await,
            WorkItem::Remove(id) => self.remove(id).await,
            WorkItem::Rename(pair) => self.rename(&pair).await,
        };
        outcome.unwrap_or_else(|reason| {
            warn!(kind = self.kind(), %action, %id, %reason, "item failed");
            ItemOutcome::Failed(ItemFailure { action, id, reason })
        })
    }

    async fn remove(&self, id: ObjectId) -> Result<ItemOutcome, String> {
        match self.store.delete(self.kind(), id).await {
            Ok(true) => Ok(ItemOutcome::Deleted),
            Ok(false) => {
                debug!(kind = self.kind(), %id, "already absent");
                Ok(ItemOutcome::Skipped)
            }
            Err(e) if e.is_not_found() => Ok(ItemOutcome::Skipped),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Create-or-update keyed by (device, name).
    async fn add(&self, template: &Instance) -> Result<ItemOutcome, String> {
        let fields =
            creation_fields(self.config, template, self.options).map_err(|e| e.to_string())?;
        let name = fields
            .get("name")
            .map(FieldValue::to_text)
            .ok_or_else(|| "template has no name".to_owned())?;

        if let Some(existing) = self.find(&name).await? {
            return self.overwrite(existing.id, fields).await;
        }
        match self.store.create(self.kind(), self.device, fields.clone()).await {
            Ok(created) => {
                debug!(kind = self.kind(), id = %created.id, %name, "created");
                Ok(ItemOutcome::Created)
            }
            Err(e) if e.is_constraint_violation() => {
                // Lost a race with a concurrent create of the same name.
                match self.find(&name).await? {
                    Some(winner) => self.overwrite(winner.id, fields).await,
                    None => Err(e.to_string()),
                }
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn overwrite(&self, id: ObjectId, fields: FieldMap) -> Result<ItemOutcome, String> {
        self.store
            .update(self.kind(), id, fields)
            .await
            .map(|_| ItemOutcome::Updated)
            .map_err(|e| e.to_string())
    }

    async fn rename(&self, pair: &RenamePair) -> Result<ItemOutcome, String> {
        let current = self
            .store
            .get_component(self.kind(), pair.component)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("component {} no longer exists", pair.component))?;
        if current.name() == Some(pair.name.as_str()) {
            return Ok(ItemOutcome::Skipped);
        }
        let taken = self
            .find(&pair.name)
            .await?
            .filter(|other| other.id != pair.component);
        if let Some(other) = taken {
            return Err(collision(&pair.name, other.id));
        }

        let fields = FieldMap::from([("name".to_owned(), FieldValue::from(pair.name.as_str()))]);
        match self.store.update(self.kind(), pair.component, fields).await {
            Ok(_) => Ok(ItemOutcome::Renamed),
            Err(StoreError::ConstraintViolation { message }) => {
                Err(format!("name '{}' is already taken: {message}", pair.name))
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// The component owning `name` under the configured match key. With
    /// case-insensitive matching, `CON0` owns `con0`, and the lowest id wins
    /// among several candidates, as in the differ.
    async fn find(&self, name: &str) -> Result<Option<Instance>, String> {
        let exact = self
            .store
            .find_by_name(self.kind(), self.device, name)
            .await
            .map_err(|e| e.to_string())?;
        if exact.is_some() || self.options.case_sensitive_names {
            return Ok(exact);
        }

        let key = match_key(name, false);
        let mut candidates = self
            .store
            .list_by_device(self.kind(), self.device)
            .await
            .map_err(|e| e.to_string())?;
        candidates.sort_by_key(|c| c.id);
        Ok(candidates
            .into_iter()
            .find(|c| c.name().is_some_and(|n| match_key(n, false) == key)))
    }
}

fn collision(name: &str, other: ObjectId) -> String {
    format!("name '{name}' is already taken by component {other}")
}

/// Run every item of a validated request and aggregate the outcomes.
pub(crate) async fn apply(
    store: &dyn ComponentStore,
    config: &ComponentConfig,
    options: &SyncOptions,
    request: ValidatedRequest,
    cancel: &CancellationToken,
) -> ReconciliationResult {
    let worker = Worker {
        store,
        config,
        options,
        device: request.device.id,
    };
    let items: Vec<WorkItem> = request
        .remove
        .into_iter()
        .map(WorkItem::Remove)
        .chain(request.add.into_iter().map(WorkItem::Add))
        .chain(request.rename.into_iter().map(WorkItem::Rename))
        .collect();
    let total = items.len();

    let worker = &worker;
    let outcomes: Vec<ItemOutcome> = stream::iter(items)
        .map(|item| async move {
            if cancel.is_cancelled() {
                return ItemOutcome::NotStarted;
            }
            worker.run(item).await
        })
        .buffer_unordered(options.max_concurrency.max(1))
        .collect()
        .await;

    let mut result = ReconciliationResult::new(request.device.id, &config.kind);
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Created => result.created += 1,
            ItemOutcome::Updated => result.updated += 1,
            ItemOutcome::Deleted => result.deleted += 1,
            ItemOutcome::Renamed => result.renamed += 1,
            ItemOutcome::Skipped => result.skipped += 1,
            ItemOutcome::NotStarted => {
                result.skipped += 1;
                result.cancelled = true;
            }
            ItemOutcome::Failed(failure) => result.failures.push(failure),
        }
    }
    result.failures.sort_by_key(|f| (f.action, f.id));

    info!(
        kind = %config.kind,
        device = %request.device.id,
        items = total,
        created = result.created,
        updated = result.updated,
        deleted = result.deleted,
        renamed = result.renamed,
        skipped = result.skipped,
        failed = result.failures.len(),
        cancelled = result.cancelled,
        "reconciliation applied"
    );
    result
}
