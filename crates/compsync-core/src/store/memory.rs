// ── In-memory component store ──
//
// A `ComponentStore` over a loaded inventory document. Used by the CLI to
// reconcile inventory files and by tests to exercise the engine against
// a store that enforces the same uniqueness constraint as a real one.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::ComponentStore;
use crate::error::StoreError;
use crate::model::{Device, DeviceType, FieldMap, FieldValue, Instance, ObjectId};
use crate::registry::StaticCatalog;

/// Serialized inventory: everything the in-memory store holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub device_types: Vec<DeviceType>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub components: Vec<Instance>,
    #[serde(default)]
    pub templates: Vec<Instance>,
    /// Host model catalog for auto-discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<StaticCatalog>,
}

#[derive(Debug, Default)]
struct State {
    device_types: BTreeMap<ObjectId, DeviceType>,
    devices: BTreeMap<ObjectId, Device>,
    components: BTreeMap<ObjectId, Instance>,
    templates: BTreeMap<ObjectId, Instance>,
    next_id: u64,
    denied: BTreeSet<ObjectId>,
    denied_names: BTreeSet<String>,
}

impl State {
    fn name_taken(&self, kind: &str, device: ObjectId, name: &str, except: Option<ObjectId>) -> bool {
        self.components.values().any(|c| {
            c.kind == kind && c.owner == device && c.name() == Some(name) && Some(c.id) != except
        })
    }

    fn check_allowed(&self, id: ObjectId, action: &str) -> Result<(), StoreError> {
        if self.denied.contains(&id) {
            return Err(StoreError::PermissionDenied {
                action: format!("{action} {id}"),
            });
        }
        Ok(())
    }
}

/// Mutex-guarded in-memory store. Every call yields to the scheduler
/// first, so concurrent requests interleave at the same points they would
/// against a remote store.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    catalog: Option<StaticCatalog>,
}

impl MemoryStore {
    /// Load `inventory`. Fails if its ids leave no room for new components.
    pub fn new(inventory: Inventory) -> Result<Self, StoreError> {
        let highest = inventory
            .components
            .iter()
            .chain(&inventory.templates)
            .map(|i| i.id.get())
            .max()
            .unwrap_or(0);
        let next_id = highest
            .checked_add(1)
            .ok_or_else(|| exhausted(highest))?;
        let state = State {
            device_types: inventory.device_types.into_iter().map(|t| (t.id, t)).collect(),
            devices: inventory.devices.into_iter().map(|d| (d.id, d)).collect(),
            components: inventory.components.into_iter().map(|c| (c.id, c)).collect(),
            templates: inventory.templates.into_iter().map(|t| (t.id, t)).collect(),
            next_id,
            ..State::default()
        };
        Ok(Self {
            state: Mutex::new(state),
            catalog: inventory.catalog,
        })
    }

    pub fn catalog(&self) -> Option<&StaticCatalog> {
        self.catalog.as_ref()
    }

    /// Current contents, in id order.
    pub async fn snapshot(&self) -> Inventory {
        let state = self.state.lock().await;
        Inventory {
            device_types: state.device_types.values().cloned().collect(),
            devices: state.devices.values().cloned().collect(),
            components: state.components.values().cloned().collect(),
            templates: state.templates.values().cloned().collect(),
            catalog: self.catalog.clone(),
        }
    }

    /// Make every mutation of component `id` fail with `PermissionDenied`.
    pub async fn deny(&self, id: ObjectId) {
        self.state.lock().await.denied.insert(id);
    }

    /// Make creation of components named `name` fail with `PermissionDenied`.
    pub async fn deny_create(&self, name: &str) {
        self.state.lock().await.denied_names.insert(name.to_owned());
    }
}

fn exhausted(highest: u64) -> StoreError {
    StoreError::Backend(format!("no component id left after {highest}"))
}

#[async_trait]
impl ComponentStore for MemoryStore {
    async fn device(&self, id: ObjectId) -> Result<Device, StoreError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        state
            .devices
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("device", id))
    }

    async fn device_type(&self, id: ObjectId) -> Result<DeviceType, StoreError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        state
            .device_types
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("device type", id))
    }

    async fn list_by_device(
        &self,
        kind: &str,
        device: ObjectId,
    ) -> Result<Vec<Instance>, StoreError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .components
            .values()
            .filter(|c| c.kind == kind && c.owner == device)
            .cloned()
            .collect())
    }

    async fn list_by_device_type(
        &self,
        kind: &str,
        device_type: ObjectId,
    ) -> Result<Vec<Instance>, StoreError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .templates
            .values()
            .filter(|t| t.kind == kind && t.owner == device_type)
            .cloned()
            .collect())
    }

    async fn get_component(
        &self,
        kind: &str,
        id: ObjectId,
    ) -> Result<Option<Instance>, StoreError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        Ok(state.components.get(&id).filter(|c| c.kind == kind).cloned())
    }

    async fn find_by_name(
        &self,
        kind: &str,
        device: ObjectId,
        name: &str,
    ) -> Result<Option<Instance>, StoreError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .components
            .values()
            .find(|c| c.kind == kind && c.owner == device && c.name() == Some(name))
            .cloned())
    }

    async fn create(
        &self,
        kind: &str,
        device: ObjectId,
        fields: FieldMap,
    ) -> Result<Instance, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        if !state.devices.contains_key(&device) {
            return Err(StoreError::not_found("device", device));
        }
        let name = fields
            .get("name")
            .and_then(FieldValue::as_str)
            .ok_or_else(|| StoreError::ConstraintViolation {
                message: "component name is required".into(),
            })?
            .to_owned();
        if state.denied_names.contains(&name) {
            return Err(StoreError::PermissionDenied {
                action: format!("create {kind} {name}"),
            });
        }
        if state.name_taken(kind, device, &name, None) {
            return Err(StoreError::ConstraintViolation {
                message: format!("{kind} named '{name}' already exists on device {device}"),
            });
        }

        let raw = state.next_id;
        state.next_id = raw.checked_add(1).ok_or_else(|| exhausted(raw))?;
        let id = ObjectId::new(raw);
        let mut instance = Instance::new(id, device, kind);
        instance.fields = fields;
        instance.fields.remove("id");
        state.components.insert(id, instance.clone());
        debug!(kind, %id, %device, %name, "component created");
        Ok(instance)
    }

    async fn update(
        &self,
        kind: &str,
        id: ObjectId,
        fields: FieldMap,
    ) -> Result<Instance, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.check_allowed(id, "update")?;
        let Some(current) = state.components.get(&id).filter(|c| c.kind == kind) else {
            return Err(StoreError::not_found(kind, id));
        };
        let owner = current.owner;
        let collides = fields
            .get("name")
            .and_then(FieldValue::as_str)
            .filter(|name| state.name_taken(kind, owner, name, Some(id)));
        if let Some(name) = collides {
            return Err(StoreError::ConstraintViolation {
                message: format!("{kind} named '{name}' already exists on device {owner}"),
            });
        }

        let Some(component) = state.components.get_mut(&id) else {
            return Err(StoreError::not_found(kind, id));
        };
        for (name, value) in fields {
            if name != "id" {
                component.fields.insert(name, value);
            }
        }
        debug!(kind, %id, "component updated");
        Ok(component.clone())
    }

    async fn delete(&self, kind: &str, id: ObjectId) -> Result<bool, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.check_allowed(id, "delete")?;
        let present = state.components.get(&id).is_some_and(|c| c.kind == kind);
        if present {
            state.components.remove(&id);
            debug!(kind, %id, "component deleted");
        }
        Ok(present)
    }
}
