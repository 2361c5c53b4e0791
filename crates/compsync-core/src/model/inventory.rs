// ── Inventory objects ──
//
// The shapes the persistence boundary hands back. Components belong to a
// device, templates belong to a device type; both are `Instance`s whose
// `owner` points at the respective parent.

use serde::{Deserialize, Serialize};

use super::{FieldMap, FieldSource, FieldValue, ObjectId};

/// A concrete managed device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: ObjectId,
    pub name: String,
    /// The declared type. Devices without one cannot be reconciled.
    #[serde(default)]
    pub device_type: Option<ObjectId>,
}

/// A device type: the blueprint whose templates devices are compared to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: ObjectId,
    pub model: String,
}

/// A live component or a template, depending on who owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: ObjectId,
    /// Device id for components, device type id for templates.
    pub owner: ObjectId,
    pub kind: String,
    #[serde(default)]
    pub fields: FieldMap,
}

impl Instance {
    pub fn new(id: ObjectId, owner: ObjectId, kind: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            kind: kind.into(),
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_owned(), value.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(FieldValue::as_str)
    }
}

impl FieldSource for Instance {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn field_names(&self) -> Vec<&str> {
        std::iter::once("id")
            .chain(self.fields.keys().map(String::as_str))
            .collect()
    }

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        if name == "id" {
            return Some(self.id.into());
        }
        self.fields.get(name).cloned()
    }
}
