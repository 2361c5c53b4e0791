// ── Statically declared component kinds ──
//
// The nine DCIM component kinds every host ships with. Auto-discovery
// may add more, but never replaces these.

use super::component_config::{ComponentConfig, Extractor, InstanceFilter};
use crate::config::RegistrySettings;

const INTERFACE_TYPES: [(&str, &str); 12] = [
    ("virtual", "Virtual"),
    ("bridge", "Bridge"),
    ("lag", "Link Aggregation Group (LAG)"),
    ("100base-tx", "100BASE-TX (10/100ME)"),
    ("1000base-t", "1000BASE-T (1GE)"),
    ("2.5gbase-t", "2.5GBASE-T (2.5GE)"),
    ("10gbase-t", "10GBASE-T (10GE)"),
    ("1000base-x-sfp", "SFP (1GE)"),
    ("10gbase-x-sfpp", "SFP+ (10GE)"),
    ("25gbase-x-sfp28", "SFP28 (25GE)"),
    ("40gbase-x-qsfpp", "QSFP+ (40GE)"),
    ("100gbase-x-qsfp28", "QSFP28 (100GE)"),
];

const CONSOLE_TYPES: [(&str, &str); 6] = [
    ("de-9", "DE-9"),
    ("db-25", "DB-25"),
    ("rj-11", "RJ-11"),
    ("rj-45", "RJ-45"),
    ("usb-a", "USB Type A"),
    ("usb-c", "USB Type C"),
];

const POWER_PORT_TYPES: [(&str, &str); 5] = [
    ("iec-60320-c6", "C6"),
    ("iec-60320-c8", "C8"),
    ("iec-60320-c14", "C14"),
    ("iec-60320-c20", "C20"),
    ("nema-5-15p", "NEMA 5-15P"),
];

const POWER_OUTLET_TYPES: [(&str, &str); 5] = [
    ("iec-60320-c5", "C5"),
    ("iec-60320-c7", "C7"),
    ("iec-60320-c13", "C13"),
    ("iec-60320-c19", "C19"),
    ("nema-5-15r", "NEMA 5-15R"),
];

const PORT_TYPES: [(&str, &str); 7] = [
    ("8p8c", "8P8C"),
    ("8p6c", "8P6C"),
    ("110-punch", "110 Punch"),
    ("bnc", "BNC"),
    ("lc", "LC"),
    ("sc", "SC"),
    ("mpo", "MPO"),
];

/// Kinds that are always registered, in the order the host lists them.
pub const BUILTIN_KINDS: [&str; 9] = [
    "interface",
    "powerport",
    "consoleport",
    "consoleserverport",
    "poweroutlet",
    "frontport",
    "rearport",
    "devicebay",
    "modulebay",
];

fn typed(kind: &str, label: &str, choices: &[(&str, &str)]) -> ComponentConfig {
    ComponentConfig::new(kind, label)
        .verbatim(["id", "name", "label", "description", "type"])
        .special("type_display", Extractor::choice_label("type", choices.iter().copied()))
        .comparable(["label", "type"])
        .with_model_permissions("dcim", kind)
        .filter(InstanceFilter::ExcludeModuleMembers)
}

/// Build the static configs. Interface listings honor the configured
/// type exclusions.
pub fn builtin_configs(settings: &RegistrySettings) -> Vec<ComponentConfig> {
    let mut interface = typed("interface", "Interfaces", &INTERFACE_TYPES)
        .verbatim(["enabled", "mgmt_only", "poe_mode", "poe_type", "rf_role"])
        .comparable(["enabled", "mgmt_only", "poe_mode", "poe_type", "rf_role"]);
    if !settings.exclude_interface_types.is_empty() {
        interface = interface.filter(InstanceFilter::ExcludeTypes(
            settings.exclude_interface_types.clone(),
        ));
    }

    vec![
        interface,
        typed("powerport", "Power ports", &POWER_PORT_TYPES)
            .verbatim(["maximum_draw", "allocated_draw"])
            .comparable(["maximum_draw", "allocated_draw"]),
        typed("consoleport", "Console ports", &CONSOLE_TYPES),
        typed("consoleserverport", "Console server ports", &CONSOLE_TYPES),
        typed("poweroutlet", "Power outlets", &POWER_OUTLET_TYPES)
            .verbatim(["feed_leg"])
            .special(
                "power_port_name",
                Extractor::reference("power_port", "powerport"),
            )
            .comparable(["power_port_name", "feed_leg"]),
        typed("frontport", "Front ports", &PORT_TYPES)
            .verbatim(["color", "rear_port_position"])
            .comparable(["color", "rear_port_position"]),
        typed("rearport", "Rear ports", &PORT_TYPES)
            .verbatim(["color", "positions"])
            .comparable(["color", "positions"]),
        ComponentConfig::new("devicebay", "Device bays")
            .verbatim(["id", "name", "label", "description"])
            .comparable(["label"])
            .with_model_permissions("dcim", "devicebay")
            .filter(InstanceFilter::ExcludeModuleMembers),
        ComponentConfig::new("modulebay", "Module bays")
            .verbatim(["id", "name", "label", "description", "position"])
            .comparable(["label", "position"])
            .with_model_permissions("dcim", "modulebay")
            .filter(InstanceFilter::TopLevelOnly),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_kind_has_a_config() {
        let configs = builtin_configs(&RegistrySettings::default());
        let kinds: Vec<&str> = configs.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, BUILTIN_KINDS);
    }

    #[test]
    fn interface_exclusions_come_from_settings() {
        let configs = builtin_configs(&RegistrySettings {
            exclude_interface_types: Vec::new(),
            ..RegistrySettings::default()
        });
        let interface = &configs[0];
        assert!(
            !interface
                .filters
                .iter()
                .any(|f| matches!(f, InstanceFilter::ExcludeTypes(_)))
        );
    }

    #[test]
    fn power_outlet_references_power_ports() {
        let configs = builtin_configs(&RegistrySettings::default());
        let outlet = configs.iter().find(|c| c.kind == "poweroutlet");
        assert_eq!(outlet.map(ComponentConfig::referenced_kinds), Some(vec!["powerport"]));
    }
}
