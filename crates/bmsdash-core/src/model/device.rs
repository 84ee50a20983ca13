use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Live reading of one HVAC unit.
///
/// Recreated on every push; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub id: i64,
    /// Field-bus device id. The backend sends a number for BACnet units and
    /// a string for simulated ones.
    #[serde(
        default,
        deserialize_with = "lenient_device_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_id: Option<String>,
    #[serde(rename = "unitName")]
    pub display_name: String,
    pub temperature: f64,
    pub setpoint: f64,
    pub on_state: bool,
    #[serde(rename = "fanSpeed")]
    pub fan_speed_percent: f64,
    pub flow_rate: f64,
    pub fault: bool,
    #[serde(rename = "telemetryTime", deserialize_with = "telemetry_time")]
    pub sample_time: DateTime<Utc>,
}

impl DeviceState {
    pub fn on_off_label(&self) -> &'static str {
        if self.on_state { "ON" } else { "OFF" }
    }

    pub fn fault_label(&self) -> &'static str {
        if self.fault { "FAULT" } else { "OK" }
    }
}

fn lenient_device_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(serde_json::Number),
        Text(String),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    }))
}

/// RFC 3339, or a zone-less local timestamp taken as UTC (Java
/// `LocalDateTime` serialization).
fn telemetry_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid telemetryTime {raw:?}"))
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
