//! Unit registration handlers.

use tabled::Tabled;
use tracing::info;

use bmsdash_core::{CoreError, HvacUnitConfig};

use crate::cli::{AddUnitArgs, GlobalOpts, UnitsArgs, UnitsCommand};
use crate::config::{self, Needs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Device ID")]
    device_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Protocol")]
    protocol: &'static str,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Enabled")]
    enabled: &'static str,
}

impl From<&HvacUnitConfig> for UnitRow {
    fn from(u: &HvacUnitConfig) -> Self {
        let location = [&u.building, &u.floor, &u.room]
            .into_iter()
            .filter_map(|part| part.as_deref().filter(|s| !s.is_empty()))
            .collect::<Vec<_>>()
            .join(" / ");
        Self {
            id: u.id.map(|id| id.to_string()).unwrap_or_default(),
            device_id: u.device_id.clone(),
            name: u.unit_name.clone(),
            protocol: u.protocol.label(),
            location,
            enabled: if u.enabled { "yes" } else { "no" },
        }
    }
}

fn unit_from_args(args: &AddUnitArgs) -> Result<HvacUnitConfig, CliError> {
    let device_id = args.device_id.trim();
    if device_id.is_empty() {
        return Err(CliError::Validation {
            field: "device-id".into(),
            reason: "must not be empty".into(),
        });
    }
    if args.name.trim().is_empty() {
        return Err(CliError::Validation {
            field: "name".into(),
            reason: "must not be empty".into(),
        });
    }

    let bacnet_device_instance = if args.protocol.requires_unique_device_id() {
        args.bacnet_instance.or_else(|| device_id.parse().ok())
    } else {
        args.bacnet_instance
    };

    Ok(HvacUnitConfig {
        device_id: device_id.to_owned(),
        unit_name: args.name.trim().to_owned(),
        building: args.building.clone(),
        floor: args.floor.clone(),
        room: args.room.clone(),
        protocol: args.protocol,
        modbus_host: args.modbus_host.clone(),
        modbus_port: args.modbus_port,
        modbus_unit_id: args.modbus_unit_id,
        bacnet_device_instance,
        enabled: !args.disabled,
        ..HvacUnitConfig::default()
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: UnitsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let dashboard = config::resolve_dashboard_config(global, Needs::Rest)?;
    let client = dashboard.config_client()?;

    match args.command {
        UnitsCommand::List => {
            let units = client.list_configs().await.map_err(CoreError::from)?;
            let out = output::render_list(
                global.output,
                &units,
                |u| UnitRow::from(u),
                |u| u.device_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UnitsCommand::Add(add) => {
            let unit = unit_from_args(&add)?;

            if unit.protocol.requires_unique_device_id()
                && client
                    .device_id_exists(unit.protocol, &unit.device_id)
                    .await
                    .map_err(CoreError::from)?
            {
                return Err(CliError::Conflict {
                    resource_type: "device id".into(),
                    identifier: unit.device_id,
                });
            }

            let created = client.create_config(&unit).await.map_err(CoreError::from)?;
            info!(id = ?created.id, device_id = %created.device_id, "Unit registered");

            let out = output::render_single(
                global.output,
                &created,
                |u| {
                    format!(
                        "HVAC unit '{}' registered{}",
                        u.unit_name,
                        u.id.map(|id| format!(" (id {id})")).unwrap_or_default()
                    )
                },
                |u| u.id.map(|id| id.to_string()).unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use bmsdash_core::Protocol;

    use super::*;

    fn add_args(protocol: Protocol, device_id: &str) -> AddUnitArgs {
        AddUnitArgs {
            device_id: device_id.into(),
            name: "AHU-7".into(),
            protocol,
            building: Some("HQ".into()),
            floor: None,
            room: Some("101".into()),
            bacnet_instance: None,
            modbus_host: None,
            modbus_port: None,
            modbus_unit_id: None,
            disabled: false,
        }
    }

    #[test]
    fn bacnet_instance_defaults_to_numeric_device_id() {
        let unit = unit_from_args(&add_args(Protocol::Bacnet, " 12345 ")).unwrap();
        assert_eq!(unit.device_id, "12345");
        assert_eq!(unit.bacnet_device_instance, Some(12345));
        assert!(unit.enabled);
    }

    #[test]
    fn simulator_units_get_no_bacnet_instance() {
        let unit = unit_from_args(&add_args(Protocol::Simulator, "12345")).unwrap();
        assert_eq!(unit.bacnet_device_instance, None);
    }

    #[test]
    fn blank_device_id_is_rejected() {
        assert!(matches!(
            unit_from_args(&add_args(Protocol::Bacnet, "  ")),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn location_joins_present_parts() {
        let unit = unit_from_args(&add_args(Protocol::Simulator, "SIM-1")).unwrap();
        assert_eq!(UnitRow::from(&unit).location, "HQ / 101");
    }
}
