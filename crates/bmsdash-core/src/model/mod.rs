// ── Telemetry domain model ──
//
// Device readings as pushed by the backend, the snapshot that holds one
// full push, and the aggregate figures derived from it.

pub mod device;
pub mod snapshot;
pub mod summary;

pub use device::DeviceState;
pub use snapshot::{MalformedFrame, TelemetrySnapshot};
pub use summary::FleetSummary;
