use serde::Serialize;

use super::device::DeviceState;

/// Aggregates shown in the dashboard header cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    /// Units reporting `onState`.
    pub active: usize,
    pub faulted: usize,
    /// `None` when there are no units.
    pub mean_temperature: Option<f64>,
}

impl FleetSummary {
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a DeviceState>) -> Self {
        let mut summary = Self::default();
        let mut temp_sum = 0.0;
        let mut temp_count = 0.0;

        for device in devices {
            summary.total += 1;
            if device.on_state {
                summary.active += 1;
            }
            if device.fault {
                summary.faulted += 1;
            }
            temp_sum += device.temperature;
            temp_count += 1.0;
        }

        if summary.total > 0 {
            summary.mean_temperature = Some(temp_sum / temp_count);
        }
        summary
    }
}
