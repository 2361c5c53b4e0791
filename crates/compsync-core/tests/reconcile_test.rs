#![allow(clippy::unwrap_used)]
// End-to-end reconciliation tests against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use compsync_core::{
    Comparison, ComponentStore, Device, DeviceType, FieldMap, FieldValue, Instance, Inventory,
    ItemAction, MemoryStore, ObjectId, Outcome, Reconciler, ReconciliationRequest, Registry,
    RegistryHandle, RegistrySettings, StoreError, SyncAction, SyncError, SyncOptions,
    build_registry,
};

// ── Helpers ─────────────────────────────────────────────────────────

const SW1: ObjectId = ObjectId::new(1);
const SW2: ObjectId = ObjectId::new(2);
const UNTYPED: ObjectId = ObjectId::new(3);
const SWITCH_TYPE: ObjectId = ObjectId::new(1);

fn id(raw: u64) -> ObjectId {
    ObjectId::new(raw)
}

fn console(raw: u64, owner: ObjectId, name: &str, type_code: &str) -> Instance {
    Instance::new(id(raw), owner, "consoleport")
        .with("name", name)
        .with("label", "")
        .with("description", "")
        .with("type", type_code)
}

fn inventory(components: Vec<Instance>, templates: Vec<Instance>) -> Inventory {
    Inventory {
        device_types: vec![DeviceType {
            id: SWITCH_TYPE,
            model: "SW-48".into(),
        }],
        devices: vec![
            Device {
                id: SW1,
                name: "sw1".into(),
                device_type: Some(SWITCH_TYPE),
            },
            Device {
                id: SW2,
                name: "sw2".into(),
                device_type: Some(SWITCH_TYPE),
            },
            Device {
                id: UNTYPED,
                name: "patch-panel".into(),
                device_type: None,
            },
        ],
        components,
        templates,
        catalog: None,
    }
}

fn store_of(inventory: Inventory) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(inventory).unwrap())
}

fn reconciler_with(store: &Arc<MemoryStore>, options: SyncOptions) -> Reconciler {
    let (registry, _) = build_registry(None, &RegistrySettings::default()).unwrap();
    Reconciler::new(store.clone(), RegistryHandle::new(registry), options)
}

fn setup(components: Vec<Instance>, templates: Vec<Instance>) -> (Arc<MemoryStore>, Reconciler) {
    let store = store_of(inventory(components, templates));
    let reconciler = reconciler_with(&store, SyncOptions::default());
    (store, reconciler)
}

/// Device A(rj-45), B(usb-a); type A(rj-45), C(de-9).
fn abc() -> (Arc<MemoryStore>, Reconciler) {
    setup(
        vec![
            console(1, SW1, "A", "rj-45"),
            console(2, SW1, "B", "usb-a"),
        ],
        vec![
            console(101, SWITCH_TYPE, "A", "rj-45"),
            console(102, SWITCH_TYPE, "C", "de-9"),
        ],
    )
}

fn states(comparisons: &[Comparison]) -> Vec<(String, &'static str)> {
    comparisons.iter().map(|c| (c.key.clone(), c.state())).collect()
}

async fn names_on(store: &MemoryStore, device: ObjectId) -> Vec<String> {
    let mut names: Vec<String> = store
        .list_by_device("consoleport", device)
        .await
        .unwrap()
        .iter()
        .filter_map(|c| c.name().map(str::to_owned))
        .collect();
    names.sort();
    names
}

// ── Diff ────────────────────────────────────────────────────────────

#[tokio::test]
async fn abc_scenario_diff_then_apply() {
    let (store, reconciler) = abc();

    let report = reconciler.diff(SW1, "consoleport").await.unwrap();
    assert_eq!(
        states(&report.comparisons),
        vec![
            ("A".to_owned(), "synchronized"),
            ("B".to_owned(), "device-only"),
            ("C".to_owned(), "template-only"),
        ]
    );

    let request = ReconciliationRequest::new(SW1, "consoleport")
        .add(id(102))
        .remove(id(2));
    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!((result.created, result.deleted), (1, 1));
    assert!(result.is_clean());
    assert_eq!(names_on(&store, SW1).await, vec!["A", "C"]);
}

#[tokio::test]
async fn diff_is_deterministic() {
    let (_, reconciler) = abc();
    let first = reconciler.diff(SW1, "consoleport").await.unwrap();
    let second = reconciler.diff(SW1, "consoleport").await.unwrap();
    assert_eq!(first.comparisons, second.comparisons);
}

#[tokio::test]
async fn identical_collections_are_all_synchronized() {
    let (_, reconciler) = setup(
        vec![console(1, SW1, "con0", "rj-45"), console(2, SW1, "con1", "usb-a")],
        vec![
            console(101, SWITCH_TYPE, "con0", "rj-45"),
            console(102, SWITCH_TYPE, "con1", "usb-a"),
        ],
    );
    let report = reconciler.diff(SW1, "consoleport").await.unwrap();
    assert_eq!(report.comparisons.len(), 2);
    assert!(report.is_synchronized());
}

#[tokio::test]
async fn description_is_ignored_when_disabled() {
    let components = vec![console(1, SW1, "con0", "rj-45").with("description", "to router")];
    let templates = vec![console(101, SWITCH_TYPE, "con0", "rj-45").with("description", "uplink")];
    let store = store_of(inventory(components, templates));

    let strict = reconciler_with(&store, SyncOptions::default());
    let report = strict.diff(SW1, "consoleport").await.unwrap();
    assert_eq!(report.comparisons[0].state(), "mismatched");

    let relaxed = reconciler_with(
        &store,
        SyncOptions {
            compare_description: false,
            ..SyncOptions::default()
        },
    );
    let report = relaxed.diff(SW1, "consoleport").await.unwrap();
    assert_eq!(report.comparisons[0].state(), "synchronized");
}

#[tokio::test]
async fn records_that_cannot_be_built_are_skipped() {
    let broken = Instance::new(id(3), SW1, "consoleport").with("name", "con9");
    let (_, reconciler) = setup(
        vec![console(1, SW1, "con0", "rj-45"), broken],
        vec![console(101, SWITCH_TYPE, "con0", "rj-45")],
    );
    let report = reconciler.diff(SW1, "consoleport").await.unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, id(3));
    assert_eq!(states(&report.comparisons), vec![("con0".to_owned(), "synchronized")]);
    assert!(!report.is_synchronized());
}

#[tokio::test]
async fn module_members_are_not_compared() {
    let (_, reconciler) = setup(
        vec![
            console(1, SW1, "con0", "rj-45"),
            console(2, SW1, "mod-con0", "rj-45").with("module", 7),
        ],
        vec![console(101, SWITCH_TYPE, "con0", "rj-45")],
    );
    let report = reconciler.diff(SW1, "consoleport").await.unwrap();
    assert!(report.is_synchronized());
}

#[tokio::test]
async fn power_outlet_references_are_compared_by_name() {
    let outlet = |raw: u64, owner: ObjectId, port: u64| {
        Instance::new(id(raw), owner, "poweroutlet")
            .with("name", "out1")
            .with("label", "")
            .with("description", "")
            .with("type", "iec-60320-c13")
            .with("feed_leg", FieldValue::Null)
            .with("power_port", id(port))
    };
    let psu = |raw: u64, owner: ObjectId, name: &str| {
        Instance::new(id(raw), owner, "powerport").with("name", name)
    };

    let store = store_of(Inventory {
        components: vec![psu(1, SW1, "PSU1"), psu(2, SW1, "PSU2"), outlet(3, SW1, 1)],
        templates: vec![
            psu(101, SWITCH_TYPE, "PSU1"),
            psu(102, SWITCH_TYPE, "PSU2"),
            outlet(103, SWITCH_TYPE, 102),
        ],
        ..inventory(Vec::new(), Vec::new())
    });
    let reconciler = reconciler_with(&store, SyncOptions::default());

    let report = reconciler.diff(SW1, "poweroutlet").await.unwrap();
    let Outcome::BothPresent { field_diffs, .. } = &report.comparisons[0].outcome else {
        panic!("expected out1 to be paired");
    };
    assert_eq!(field_diffs["power_port_name"].device, FieldValue::from("PSU1"));
    assert_eq!(field_diffs["power_port_name"].template, FieldValue::from("PSU2"));
}

// ── Apply ───────────────────────────────────────────────────────────

#[tokio::test]
async fn adding_every_template_only_converges() {
    let (_, reconciler) = abc();
    let (_, request) = reconciler
        .plan(SW1, "consoleport", &[SyncAction::AddMissing])
        .await
        .unwrap();
    assert_eq!(request.add, vec![id(102)]);
    reconciler.apply(&request).await.unwrap();

    let report = reconciler.diff(SW1, "consoleport").await.unwrap();
    assert_eq!(report.counts().template_only, 0);
}

#[tokio::test]
async fn sync_all_makes_the_device_match_its_type() {
    let (store, reconciler) = setup(
        vec![
            console(1, SW1, "con0", "rj-45"),
            console(2, SW1, "CON1 ", "usb-a"),
            console(3, SW1, "con2", "de-9"),
            console(4, SW1, "stray", "de-9"),
        ],
        vec![
            console(101, SWITCH_TYPE, "con0", "rj-45"),
            console(102, SWITCH_TYPE, "con1", "usb-a"),
            console(103, SWITCH_TYPE, "con2", "usb-c"),
            console(104, SWITCH_TYPE, "con3", "rj-45"),
        ],
    );
    let (_, request) = reconciler
        .plan(SW1, "consoleport", &[SyncAction::SyncAll])
        .await
        .unwrap();
    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!(
        (result.created, result.updated, result.deleted, result.renamed),
        (1, 1, 1, 1)
    );

    assert!(reconciler.diff(SW1, "consoleport").await.unwrap().is_synchronized());
    assert_eq!(names_on(&store, SW1).await, vec!["con0", "con1", "con2", "con3"]);
}

#[tokio::test]
async fn deleting_twice_is_not_a_failure() {
    let (_, reconciler) = abc();
    let request = ReconciliationRequest::new(SW1, "consoleport").remove(id(2));

    let first = reconciler.apply(&request).await.unwrap();
    assert_eq!(first.deleted, 1);

    let second = reconciler.apply(&request).await.unwrap();
    assert_eq!((second.deleted, second.skipped), (0, 1));
    assert!(second.is_clean());
}

#[tokio::test]
async fn concurrent_duplicate_creates_yield_one_component() {
    let (store, reconciler) = abc();
    let other = reconciler.clone();
    let request = ReconciliationRequest::new(SW1, "consoleport").add(id(102));

    let (a, b) = tokio::join!(reconciler.apply(&request), other.apply(&request));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(a.is_clean() && b.is_clean());
    assert_eq!(a.created + b.created, 1);
    assert_eq!(a.created + a.updated + b.created + b.updated, 2);
    assert_eq!(names_on(&store, SW1).await, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn trailing_space_is_a_rename_not_add_and_remove() {
    let (store, reconciler) = setup(
        vec![console(1, SW1, "Gi0/1 ", "rj-45")],
        vec![console(101, SWITCH_TYPE, "Gi0/1", "rj-45")],
    );
    let (report, request) = reconciler
        .plan(SW1, "consoleport", &[SyncAction::SyncAll])
        .await
        .unwrap();
    assert_eq!(report.comparisons.len(), 1);
    assert!(report.comparisons[0].is_name_drift());
    assert!(request.add.is_empty() && request.remove.is_empty());

    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!(result.renamed, 1);
    assert_eq!(names_on(&store, SW1).await, vec!["Gi0/1"]);
}

fn case_insensitive() -> SyncOptions {
    SyncOptions {
        case_sensitive_names: false,
        ..SyncOptions::default()
    }
}

#[tokio::test]
async fn case_insensitive_add_updates_the_paired_component() {
    let store = store_of(inventory(
        vec![console(1, SW1, "CON0", "rj-45").with("label", "x")],
        vec![console(101, SWITCH_TYPE, "con0", "rj-45").with("label", "y")],
    ));
    let reconciler = reconciler_with(&store, case_insensitive());

    let (report, request) = reconciler
        .plan(SW1, "consoleport", &[SyncAction::SyncAll])
        .await
        .unwrap();
    assert_eq!(states(&report.comparisons), vec![("con0".to_owned(), "mismatched")]);
    assert_eq!(request.add, vec![id(101)]);

    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!((result.created, result.updated), (0, 1));
    assert_eq!(names_on(&store, SW1).await, vec!["con0"]);
    assert!(reconciler.diff(SW1, "consoleport").await.unwrap().is_synchronized());
}

#[tokio::test]
async fn case_insensitive_rename_treats_case_variants_as_taken() {
    let components = vec![console(1, SW1, "con0", "rj-45"), console(2, SW1, "con1", "rj-45")];
    let request = ReconciliationRequest::new(SW1, "consoleport").rename(id(1), "CON1");

    let store = store_of(inventory(components.clone(), Vec::new()));
    let result = reconciler_with(&store, case_insensitive()).apply(&request).await.unwrap();
    assert_eq!(result.renamed, 0);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].reason.contains("already taken by component 2"));

    let store = store_of(inventory(components, Vec::new()));
    let result = reconciler_with(&store, SyncOptions::default()).apply(&request).await.unwrap();
    assert_eq!(result.renamed, 1);
    assert_eq!(names_on(&store, SW1).await, vec!["CON1", "con1"]);
}

#[tokio::test]
async fn case_insensitive_name_drift_is_repaired() {
    let store = store_of(inventory(
        vec![console(1, SW1, "CON1 ", "rj-45")],
        vec![console(101, SWITCH_TYPE, "con1", "rj-45")],
    ));
    let reconciler = reconciler_with(&store, case_insensitive());
    let (_, request) = reconciler
        .plan(SW1, "consoleport", &[SyncAction::RepairNames])
        .await
        .unwrap();
    assert_eq!(request.rename.len(), 1);

    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!(result.renamed, 1);
    assert_eq!(names_on(&store, SW1).await, vec!["con1"]);
}

#[tokio::test]
async fn item_failures_do_not_stop_other_items() {
    let (store, reconciler) = abc();
    store.deny(id(2)).await;
    let request = ReconciliationRequest::new(SW1, "consoleport")
        .add(id(102))
        .remove(id(2));

    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!(result.created, 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].action, ItemAction::Remove);
    assert_eq!(result.failures[0].id, id(2));
    assert!(!result.is_clean());
    assert_eq!(names_on(&store, SW1).await, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn rejected_creates_fail_only_their_own_item() {
    let (store, reconciler) = abc();
    store.deny_create("C").await;
    let request = ReconciliationRequest::new(SW1, "consoleport")
        .add(id(101))
        .add(id(102))
        .remove(id(2));

    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!((result.updated, result.deleted, result.created), (1, 1, 0));
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].action, ItemAction::Add);
    assert_eq!(result.failures[0].id, id(102));
    assert!(result.failures[0].reason.contains("permission denied"));
    assert_eq!(names_on(&store, SW1).await, vec!["A"]);
}

#[tokio::test]
async fn rename_into_an_existing_name_fails_per_item() {
    let (_, reconciler) = abc();
    let request = ReconciliationRequest::new(SW1, "consoleport")
        .rename(id(2), "A")
        .add(id(102));

    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!(result.created, 1);
    assert_eq!(result.renamed, 0);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].reason.contains("already taken"));
}

#[tokio::test]
async fn cancelled_requests_start_nothing_new() {
    let (store, reconciler) = abc();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let request = ReconciliationRequest::new(SW1, "consoleport")
        .add(id(102))
        .remove(id(2));

    let result = reconciler.apply_with_cancel(&request, &cancel).await.unwrap();
    assert!(result.cancelled);
    assert_eq!(result.skipped, 2);
    assert_eq!(result.changes(), 0);
    assert!(!result.is_clean());
    assert_eq!(names_on(&store, SW1).await, vec!["A", "B"]);
}

/// Delegates to a `MemoryStore` and cancels `token` once a delete settles.
struct CancelAfterDelete {
    inner: Arc<MemoryStore>,
    token: CancellationToken,
}

#[async_trait]
impl ComponentStore for CancelAfterDelete {
    async fn device(&self, id: ObjectId) -> Result<Device, StoreError> {
        self.inner.device(id).await
    }

    async fn device_type(&self, id: ObjectId) -> Result<DeviceType, StoreError> {
        self.inner.device_type(id).await
    }

    async fn list_by_device(&self, kind: &str, device: ObjectId) -> Result<Vec<Instance>, StoreError> {
        self.inner.list_by_device(kind, device).await
    }

    async fn list_by_device_type(
        &self,
        kind: &str,
        device_type: ObjectId,
    ) -> Result<Vec<Instance>, StoreError> {
        self.inner.list_by_device_type(kind, device_type).await
    }

    async fn get_component(&self, kind: &str, id: ObjectId) -> Result<Option<Instance>, StoreError> {
        self.inner.get_component(kind, id).await
    }

    async fn find_by_name(
        &self,
        kind: &str,
        device: ObjectId,
        name: &str,
    ) -> Result<Option<Instance>, StoreError> {
        self.inner.find_by_name(kind, device, name).await
    }

    async fn create(&self, kind: &str, device: ObjectId, fields: FieldMap) -> Result<Instance, StoreError> {
        self.inner.create(kind, device, fields).await
    }

    async fn update(&self, kind: &str, id: ObjectId, fields: FieldMap) -> Result<Instance, StoreError> {
        self.inner.update(kind, id, fields).await
    }

    async fn delete(&self, kind: &str, id: ObjectId) -> Result<bool, StoreError> {
        let deleted = self.inner.delete(kind, id).await;
        self.token.cancel();
        deleted
    }
}

#[tokio::test]
async fn cancelling_mid_apply_keeps_settled_items() {
    let (store, _) = abc();
    let token = CancellationToken::new();
    let hooked = Arc::new(CancelAfterDelete {
        inner: store.clone(),
        token: token.clone(),
    });
    let (registry, _) = build_registry(None, &RegistrySettings::default()).unwrap();
    let reconciler = Reconciler::new(
        hooked,
        RegistryHandle::new(registry),
        SyncOptions {
            max_concurrency: 1,
            ..SyncOptions::default()
        },
    );
    let request = ReconciliationRequest::new(SW1, "consoleport")
        .remove(id(2))
        .add(id(102))
        .rename(id(1), "A1");

    let result = reconciler.apply_with_cancel(&request, &token).await.unwrap();
    assert!(result.cancelled);
    assert_eq!(result.deleted, 1);
    assert_eq!((result.created, result.renamed, result.skipped), (0, 0, 2));
    assert!(result.failures.is_empty());
    assert_eq!(names_on(&store, SW1).await, vec!["A"]);
}

// ── Systemic failures ───────────────────────────────────────────────

#[tokio::test]
async fn components_of_other_devices_are_invalid_references() {
    let (store, reconciler) = setup(
        vec![console(1, SW1, "A", "rj-45"), console(2, SW2, "A", "rj-45")],
        vec![console(101, SWITCH_TYPE, "C", "de-9")],
    );
    let request = ReconciliationRequest::new(SW1, "consoleport")
        .add(id(101))
        .remove(id(2));

    let err = reconciler.apply(&request).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidReference { id, .. } if id == ObjectId::new(2)));
    assert_eq!(names_on(&store, SW1).await, vec!["A"]);
    assert_eq!(names_on(&store, SW2).await, vec!["A"]);
}

#[tokio::test]
async fn adds_must_be_templates_of_the_device_type() {
    let (_, reconciler) = abc();
    let request = ReconciliationRequest::new(SW1, "consoleport").add(id(1));
    let err = reconciler.apply(&request).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidReference { .. }));
}

#[tokio::test]
async fn lookup_failures_are_systemic() {
    let (_, reconciler) = abc();
    assert!(matches!(
        reconciler.diff(SW1, "gpu").await,
        Err(SyncError::UnknownKind { .. })
    ));
    assert!(matches!(
        reconciler.diff(id(99), "consoleport").await,
        Err(SyncError::DeviceNotFound { .. })
    ));
    assert!(matches!(
        reconciler.diff(UNTYPED, "consoleport").await,
        Err(SyncError::DeviceTypeMissing { .. })
    ));
}

#[tokio::test]
async fn registry_reload_applies_to_later_calls() {
    let (_, reconciler) = abc();
    assert!(reconciler.diff(SW1, "consoleport").await.is_ok());

    reconciler.registry_handle().replace(Registry::default());
    assert!(matches!(
        reconciler.diff(SW1, "consoleport").await,
        Err(SyncError::UnknownKind { .. })
    ));
}

// ── Discovered kinds ────────────────────────────────────────────────

#[tokio::test]
async fn discovered_kinds_diff_like_static_ones() {
    use compsync_core::ModelPair;
    use compsync_core::registry::discovery::COMPONENT_TAG;
    use compsync_core::registry::{FieldDescriptor, FieldKind, ModelDescriptor};

    let model = |name: &str| {
        ModelDescriptor::new(name)
            .field(FieldDescriptor::new("id", FieldKind::Integer))
            .field(FieldDescriptor::new("name", FieldKind::Char))
            .field(FieldDescriptor::new("label", FieldKind::Char))
            .field(FieldDescriptor::new("part_id", FieldKind::Char))
    };
    let catalog = compsync_core::StaticCatalog::new(vec![ModelPair {
        component: model("InventoryItem").tagged(COMPONENT_TAG),
        template: Some(model("InventoryItemTemplate")),
    }]);
    let item = |raw: u64, owner: ObjectId, part: &str| {
        Instance::new(id(raw), owner, "inventoryitem")
            .with("name", "fan0")
            .with("label", "")
            .with("part_id", part)
    };

    let store = store_of(Inventory {
        components: vec![item(1, SW1, "FAN-A")],
        templates: vec![item(101, SWITCH_TYPE, "FAN-B")],
        ..inventory(Vec::new(), Vec::new())
    });
    let (registry, report) = build_registry(Some(&catalog), &RegistrySettings::default()).unwrap();
    assert!(report.kinds.contains_key("inventoryitem"));
    let reconciler = Reconciler::new(store, RegistryHandle::new(registry), SyncOptions::default());

    let report = reconciler.diff(SW1, "inventoryitem").await.unwrap();
    assert_eq!(states(&report.comparisons), vec![("fan0".to_owned(), "mismatched")]);

    let (_, request) = reconciler
        .plan(SW1, "inventoryitem", &[SyncAction::AddMissing])
        .await
        .unwrap();
    let result = reconciler.apply(&request).await.unwrap();
    assert_eq!(result.updated, 1);
    assert!(reconciler.diff(SW1, "inventoryitem").await.unwrap().is_synchronized());
}
