// ── Persistence boundary ──
//
// The only shared mutable resource the engine touches. Every call is a
// suspension point; nothing read through it is cached across requests.

pub mod memory;

use async_trait::async_trait;

pub use memory::{Inventory, MemoryStore};

use crate::error::{StoreError, SyncError};
use crate::model::{Device, DeviceType, FieldMap, Instance, ObjectId};

/// Per-kind component and template storage.
///
/// Implementations must enforce uniqueness of component names per
/// (device, kind) and report a violation as
/// [`StoreError::ConstraintViolation`].
#[async_trait]
pub trait ComponentStore: Send + Sync {
    async fn device(&self, id: ObjectId) -> Result<Device, StoreError>;

    async fn device_type(&self, id: ObjectId) -> Result<DeviceType, StoreError>;

    /// Live components of `kind` attached to `device`.
    async fn list_by_device(&self, kind: &str, device: ObjectId)
    -> Result<Vec<Instance>, StoreError>;

    /// Templates of `kind` declared by `device_type`.
    async fn list_by_device_type(
        &self,
        kind: &str,
        device_type: ObjectId,
    ) -> Result<Vec<Instance>, StoreError>;

    /// A component by id, regardless of owner. `None` if absent.
    async fn get_component(&self, kind: &str, id: ObjectId)
    -> Result<Option<Instance>, StoreError>;

    async fn find_by_name(
        &self,
        kind: &str,
        device: ObjectId,
        name: &str,
    ) -> Result<Option<Instance>, StoreError>;

    async fn create(
        &self,
        kind: &str,
        device: ObjectId,
        fields: FieldMap,
    ) -> Result<Instance, StoreError>;

    /// Merge `fields` into an existing component.
    async fn update(
        &self,
        kind: &str,
        id: ObjectId,
        fields: FieldMap,
    ) -> Result<Instance, StoreError>;

    /// `true` if something was deleted.
    async fn delete(&self, kind: &str, id: ObjectId) -> Result<bool, StoreError>;
}

/// Load a device, mapping absence to `SyncError::DeviceNotFound`.
pub(crate) async fn require_device(
    store: &dyn ComponentStore,
    id: ObjectId,
) -> Result<Device, SyncError> {
    store.device(id).await.map_err(|e| {
        if e.is_not_found() {
            SyncError::DeviceNotFound { device: id }
        } else {
            SyncError::Store(e)
        }
    })
}

/// Resolve the device's type, which must be declared and exist.
pub(crate) async fn require_device_type(
    store: &dyn ComponentStore,
    device: &Device,
) -> Result<DeviceType, SyncError> {
    let id = device
        .device_type
        .ok_or(SyncError::DeviceTypeMissing { device: device.id })?;
    store.device_type(id).await.map_err(|e| {
        if e.is_not_found() {
            SyncError::DeviceTypeNotFound { device_type: id }
        } else {
            SyncError::Store(e)
        }
    })
}
