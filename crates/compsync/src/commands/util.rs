//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use compsync_core::{
    DiscoveryReport, HostCatalog, Inventory, MemoryStore, ObjectId, Reconciler, Registry,
    RegistryHandle, RegistrySettings, SyncOptions, build_registry,
};

use crate::error::CliError;

// ── Inventory files ─────────────────────────────────────────────────

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

/// Read an inventory: YAML by extension, JSON otherwise.
pub fn read_inventory(path: &Path) -> Result<Inventory, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::InventoryIo {
        path: path.display().to_string(),
        source,
    })?;
    let parsed = if is_yaml(path) {
        serde_yaml::from_str(&contents).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| CliError::InventoryFormat {
        path: path.display().to_string(),
        reason,
    })
}

/// Write an inventory in the format its extension implies.
pub fn write_inventory(path: &Path, inventory: &Inventory) -> Result<(), CliError> {
    let rendered = if is_yaml(path) {
        serde_yaml::to_string(inventory).map_err(|e| CliError::Serialize(e.to_string()))?
    } else {
        serde_json::to_string_pretty(inventory).map_err(|e| CliError::Serialize(e.to_string()))?
    };
    std::fs::write(path, rendered)?;
    Ok(())
}

// ── Sessions ────────────────────────────────────────────────────────

/// An inventory loaded into a store, with a registry built from its
/// catalog and a reconciler over both.
pub struct Session {
    pub store: Arc<MemoryStore>,
    pub reconciler: Reconciler,
}

/// Build the registry, feeding the inventory's catalog (if any) to
/// auto-discovery.
pub fn registry_for(
    inventory: Option<&Inventory>,
    settings: &RegistrySettings,
) -> Result<(Registry, DiscoveryReport), CliError> {
    let catalog = inventory
        .and_then(|inv| inv.catalog.as_ref())
        .map(|c| c as &dyn HostCatalog);
    Ok(build_registry(catalog, settings)?)
}

pub fn open_session(
    path: &Path,
    registry_settings: &RegistrySettings,
    options: SyncOptions,
) -> Result<Session, CliError> {
    let inventory = read_inventory(path)?;
    let (registry, report) = registry_for(Some(&inventory), registry_settings)?;
    for skipped in &report.skipped {
        tracing::warn!(model = %skipped.model, reason = %skipped.reason, "catalog model skipped");
    }
    let store = MemoryStore::new(inventory).map_err(|e| CliError::InventoryFormat {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let store = Arc::new(store);
    let reconciler = Reconciler::new(store.clone(), RegistryHandle::new(registry), options);
    Ok(Session { store, reconciler })
}

/// Resolve a device identifier (numeric id or exact name).
pub async fn resolve_device(store: &MemoryStore, identifier: &str) -> Result<ObjectId, CliError> {
    let devices = store.snapshot().await.devices;
    let by_id = identifier
        .parse::<ObjectId>()
        .ok()
        .filter(|id| devices.iter().any(|d| d.id == *id));
    by_id
        .or_else(|| {
            devices
                .iter()
                .find(|d| d.name == identifier)
                .map(|d| d.id)
        })
        .ok_or_else(|| CliError::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            hint: "Use a device id or name from the inventory file".into(),
        })
}

// ── Prompts ─────────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
/// Without a terminal there is nobody to ask, so `--yes` is required.
pub fn confirm_write(path: &Path, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            path: path.display().to_string(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
