// ── Domain model ──
//
// Devices, device types, and the component/template instances hanging off
// them. Components and templates share one representation (`Instance`);
// only their owner differs.

pub mod field;
pub mod inventory;
pub mod object_id;

// ── Re-exports ──────────────────────────────────────────────────────

pub use field::{FieldMap, FieldSource, FieldValue};
pub use inventory::{Device, DeviceType, Instance};
pub use object_id::ObjectId;
