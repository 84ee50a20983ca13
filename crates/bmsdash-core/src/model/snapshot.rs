use indexmap::IndexMap;
use indexmap::map::Entry;
use thiserror::Error;

use super::device::DeviceState;
use super::summary::FleetSummary;

/// Why an inbound frame was not applied.
#[derive(Debug, Error)]
pub enum MalformedFrame {
    #[error("frame body is not a JSON array of device states: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame lists device {0} more than once")]
    DuplicateId(i64),
}

/// One complete push of device states, in the order the backend sent them.
///
/// Always replaced wholesale; there is no per-device merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    devices: IndexMap<i64, DeviceState>,
}

impl TelemetrySnapshot {
    /// Parse a MESSAGE body.
    pub fn parse(body: &str) -> Result<Self, MalformedFrame> {
        let devices: Vec<DeviceState> = serde_json::from_str(body)?;
        Self::from_devices(devices)
    }

    /// Build from a list, rejecting repeated ids.
    pub fn from_devices(devices: Vec<DeviceState>) -> Result<Self, MalformedFrame> {
        let mut map = IndexMap::with_capacity(devices.len());
        for device in devices {
            match map.entry(device.id) {
                Entry::Occupied(_) => return Err(MalformedFrame::DuplicateId(device.id)),
                Entry::Vacant(slot) => {
                    slot.insert(device);
                }
            }
        }
        Ok(Self { devices: map })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&DeviceState> {
        self.devices.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceState> {
        self.devices.values()
    }

    pub fn summary(&self) -> FleetSummary {
        FleetSummary::from_devices(self.iter())
    }
}

impl<'a> IntoIterator for &'a TelemetrySnapshot {
    type Item = &'a DeviceState;
    type IntoIter = indexmap::map::Values<'a, i64, DeviceState>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.values()
    }
}
