// ── Record factory ──
//
// Normalizes a component or template instance into a `ComparisonRecord`
// according to its kind's `ComponentConfig`. Records are throwaway views
// built per request; they are never written back.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SyncOptions;
use crate::error::FactoryError;
use crate::model::{FieldMap, FieldSource, FieldValue, ObjectId};
use crate::registry::{ComponentConfig, Extractor};

/// Normalized snapshot of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRecord {
    pub id: ObjectId,
    /// Unification key.
    pub name: String,
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
    /// Present only when description takes part in comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: String,
    pub is_template: bool,
    /// Remaining verbatim fields and every special field.
    pub extras: BTreeMap<String, FieldValue>,
}

impl ComparisonRecord {
    /// Read a field by name, core fields included. Unknown fields are null.
    pub fn value(&self, field: &str) -> FieldValue {
        match field {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            "label" => self.label.as_str().into(),
            "type" => self.type_code.clone().into(),
            "description" => self.description.clone().into(),
            other => self.extras.get(other).cloned().unwrap_or_default(),
        }
    }

    /// Human label of the type code, when the kind derives one.
    pub fn type_display(&self) -> Option<&str> {
        self.extras.get("type_display").and_then(FieldValue::as_str)
    }
}

// ── Extraction context ───────────────────────────────────────────

/// Same-side name lookups needed by `Extractor::Reference`.
///
/// Device-side records resolve against the device's components, template
/// records against the device type's templates.
#[derive(Debug, Clone, Default)]
pub struct ExtractContext {
    names: BTreeMap<String, BTreeMap<ObjectId, String>>,
}

impl ExtractContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the names of `sources` under `kind`.
    pub fn index<'a, S, I>(&mut self, kind: &str, sources: I)
    where
        S: FieldSource + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        let names = self.names.entry(kind.to_owned()).or_default();
        for source in sources {
            if let Some(name) = source.field_value("name") {
                names.insert(source.id(), name.to_text());
            }
        }
    }

    pub fn name_of(&self, kind: &str, id: ObjectId) -> Option<&str> {
        self.names.get(kind)?.get(&id).map(String::as_str)
    }
}

// ── Factory ──────────────────────────────────────────────────────

fn missing(config: &ComponentConfig, source: &dyn FieldSource, field: &str) -> FactoryError {
    FactoryError::FieldExtraction {
        kind: config.kind.clone(),
        record: source.id(),
        field: field.to_owned(),
        reason: "field is absent on the instance".into(),
    }
}

fn read(
    config: &ComponentConfig,
    source: &dyn FieldSource,
    field: &str,
) -> Result<FieldValue, FactoryError> {
    source
        .field_value(field)
        .ok_or_else(|| missing(config, source, field))
}

fn extract(
    config: &ComponentConfig,
    source: &dyn FieldSource,
    field: &str,
    extractor: &Extractor,
    ctx: &ExtractContext,
) -> Result<FieldValue, FactoryError> {
    match extractor {
        Extractor::ChoiceLabel { source: code_field, choices } => {
            let code = read(config, source, code_field)?;
            if code.is_null() {
                return Ok(FieldValue::from(""));
            }
            let code = code.to_text();
            Ok(choices.get(&code).cloned().unwrap_or(code).into())
        }
        Extractor::Reference {
            id_field,
            target_kind,
        } => {
            let target = read(config, source, id_field)?;
            let name = target
                .as_object_id()
                .and_then(|id| ctx.name_of(target_kind, id))
                .unwrap_or_default();
            Ok(name.into())
        }
        Extractor::Custom(f) => f(source).map_err(|reason| FactoryError::FieldExtraction {
            kind: config.kind.clone(),
            record: source.id(),
            field: field.to_owned(),
            reason,
        }),
    }
}

/// Build the record for one instance.
pub fn build(
    config: &ComponentConfig,
    source: &dyn FieldSource,
    is_template: bool,
    ctx: &ExtractContext,
    options: &SyncOptions,
) -> Result<ComparisonRecord, FactoryError> {
    let compare_description = config.compares_description(options.compare_description);
    let mut record = ComparisonRecord {
        id: source.id(),
        name: read(config, source, "name")?.to_text(),
        label: String::new(),
        type_code: None,
        description: None,
        kind: config.kind.clone(),
        is_template,
        extras: BTreeMap::new(),
    };

    for field in &config.verbatim_fields {
        match field.as_str() {
            "id" | "name" => {}
            "label" => record.label = read(config, source, field)?.to_text(),
            "type" => {
                let value = read(config, source, field)?;
                record.type_code = (!value.is_null()).then(|| value.to_text());
            }
            "description" => {
                let value = read(config, source, field)?;
                if compare_description {
                    record.description = Some(value.to_text());
                }
            }
            other => {
                let value = read(config, source, other)?;
                record.extras.insert(other.to_owned(), value);
            }
        }
    }

    for special in &config.special_fields {
        let value = extract(config, source, &special.name, &special.extractor, ctx)?;
        record.extras.insert(special.name.clone(), value);
    }

    Ok(record)
}

/// Field values to write onto a device component created or updated from
/// `template`. Identity and foreign keys are never copied; `description`
/// only when it is compared.
pub fn creation_fields(
    config: &ComponentConfig,
    template: &dyn FieldSource,
    options: &SyncOptions,
) -> Result<FieldMap, FactoryError> {
    let compare_description = config.compares_description(options.compare_description);
    let mut fields = FieldMap::new();
    for field in &config.verbatim_fields {
        if field == "id" || (field == "description" && !compare_description) {
            continue;
        }
        fields.insert(field.clone(), read(config, template, field)?);
    }
    if !fields.contains_key("name") {
        fields.insert("name".into(), read(config, template, "name")?);
    }
    Ok(fields)
}
