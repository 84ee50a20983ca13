// Wire types for the HVAC configuration REST API.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Field-bus protocol a unit is reached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Protocol {
    #[default]
    Simulator,
    Bacnet,
    Modbus,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Self::Simulator, Self::Bacnet, Self::Modbus];

    /// Whether device ids for this protocol must be unique backend-wide.
    ///
    /// BACnet device instances are network-global; simulator and Modbus ids
    /// are scoped by host and need no remote check.
    pub fn requires_unique_device_id(self) -> bool {
        matches!(self, Self::Bacnet)
    }

    /// Human label used by forms.
    pub fn label(self) -> &'static str {
        match self {
            Self::Simulator => "Simulator / JSON",
            Self::Bacnet => "BACnet",
            Self::Modbus => "Modbus",
        }
    }
}

/// Configuration record for one HVAC unit as served by `/api/hvac/config`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HvacUnitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub device_id: String,
    pub unit_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_setpoint: Option<f64>,

    // Modbus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modbus_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modbus_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modbus_unit_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_temp: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_setpoint: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_onoff: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_fan_speed: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_flow_rate: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_fault: Option<u16>,

    // BACnet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bacnet_device_instance: Option<u32>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Body of `GET /api/hvac/config/exists`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ExistsResponse {
    pub exists: bool,
}
