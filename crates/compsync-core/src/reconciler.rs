// ── Reconciler facade ──
//
// Entry point for callers: loads both collections through the store,
// runs the factory and the differ, and drives the apply engine. Holds no
// component state between calls; every diff re-reads the store.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::apply::{self, ReconciliationRequest, ReconciliationResult, SyncAction};
use crate::config::SyncOptions;
use crate::diff::{DiffReport, SkippedRecord, diff_records};
use crate::error::SyncError;
use crate::model::{Instance, ObjectId};
use crate::record::{self, ComparisonRecord, ExtractContext};
use crate::registry::{ComponentConfig, Registry, RegistryHandle};
use crate::store::{ComponentStore, require_device, require_device_type};

/// Cheaply cloneable handle over a store, a registry and the sync options.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<ReconcilerInner>,
}

struct ReconcilerInner {
    store: Arc<dyn ComponentStore>,
    registry: RegistryHandle,
    options: SyncOptions,
    /// Parent of every per-apply token; cancelled by `shutdown`.
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ComponentStore>, registry: RegistryHandle, options: SyncOptions) -> Self {
        Self {
            inner: Arc::new(ReconcilerInner {
                store,
                registry,
                options,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.inner.options
    }

    /// The registry as of now. Later reloads do not affect this snapshot.
    pub fn registry(&self) -> Arc<Registry> {
        self.inner.registry.snapshot()
    }

    pub fn registry_handle(&self) -> &RegistryHandle {
        &self.inner.registry
    }

    pub fn store(&self) -> &Arc<dyn ComponentStore> {
        &self.inner.store
    }

    /// Stop starting new items in every running and future apply.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    // ── Diff ─────────────────────────────────────────────────────

    /// Compare the device's components of `kind` with its type's templates.
    pub async fn diff(&self, device: ObjectId, kind: &str) -> Result<DiffReport, SyncError> {
        let config = self.registry().get(kind)?;
        let store = self.inner.store.as_ref();
        let device = require_device(store, device).await?;
        let type_id = require_device_type(store, &device).await?.id;

        let components = store.list_by_device(kind, device.id).await?;
        let templates = store.list_by_device_type(kind, type_id).await?;

        let mut device_ctx = ExtractContext::new();
        let mut template_ctx = ExtractContext::new();
        for referenced in config.referenced_kinds() {
            if referenced == kind {
                device_ctx.index(referenced, &components);
                template_ctx.index(referenced, &templates);
            } else {
                let siblings = store.list_by_device(referenced, device.id).await?;
                device_ctx.index(referenced, &siblings);
                let siblings = store.list_by_device_type(referenced, type_id).await?;
                template_ctx.index(referenced, &siblings);
            }
        }

        let mut skipped = Vec::new();
        let device_records = self.build_records(&config, &components, false, &device_ctx, &mut skipped);
        let template_records = self.build_records(&config, &templates, true, &template_ctx, &mut skipped);
        let comparisons = diff_records(device_records, template_records, &config, &self.inner.options);

        debug!(
            kind,
            device = %device.id,
            components = components.len(),
            templates = templates.len(),
            comparisons = comparisons.len(),
            "diff computed"
        );
        Ok(DiffReport {
            kind: config.kind.clone(),
            label: config.label.clone(),
            device: device.id,
            device_type: type_id,
            comparisons,
            skipped,
        })
    }

    fn build_records(
        &self,
        config: &ComponentConfig,
        instances: &[Instance],
        is_template: bool,
        ctx: &ExtractContext,
        skipped: &mut Vec<SkippedRecord>,
    ) -> Vec<ComparisonRecord> {
        instances
            .iter()
            .filter(|i| config.admits(*i))
            .filter_map(|instance| {
                match record::build(config, instance, is_template, ctx, &self.inner.options) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(error = %e, "skipping record");
                        skipped.push(SkippedRecord {
                            id: instance.id,
                            is_template,
                            reason: e.to_string(),
                        });
                        None
                    }
                }
            })
            .collect()
    }

    // ── Plan / apply ─────────────────────────────────────────────

    /// Diff, then turn bulk `actions` into a request.
    pub async fn plan(
        &self,
        device: ObjectId,
        kind: &str,
        actions: &[SyncAction],
    ) -> Result<(DiffReport, ReconciliationRequest), SyncError> {
        let report = self.diff(device, kind).await?;
        let request = apply::plan(report.device, &report.kind, &report.comparisons, actions);
        Ok((report, request))
    }

    /// Apply a request. Fails only on systemic problems; per-item failures
    /// are reported in the result.
    pub async fn apply(
        &self,
        request: &ReconciliationRequest,
    ) -> Result<ReconciliationResult, SyncError> {
        let token = self.inner.cancel.child_token();
        self.apply_with_cancel(request, &token).await
    }

    /// Like [`apply`](Self::apply), with a caller-owned cancellation token.
    /// Items already started finish; items not yet started are skipped.
    pub async fn apply_with_cancel(
        &self,
        request: &ReconciliationRequest,
        cancel: &CancellationToken,
    ) -> Result<ReconciliationResult, SyncError> {
        let config = self.registry().get(&request.kind)?;
        let store = self.inner.store.as_ref();
        let validated = apply::validate(store, &config, request).await?;
        info!(
            kind = %config.kind,
            device = %request.device,
            items = request.len(),
            "applying reconciliation"
        );
        Ok(apply::apply(store, &config, &self.inner.options, validated, cancel).await)
    }
}
