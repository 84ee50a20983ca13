// bmsdash-core: Live telemetry state and input validation between bmsdash-api and the CLI/TUI.

pub mod config;
pub mod connection;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;
pub mod subscription;
pub mod validator;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DashboardConfig, TlsVerification};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionOptions, ConnectionState};
pub use error::CoreError;
pub use model::{DeviceState, FleetSummary, MalformedFrame, TelemetrySnapshot};
pub use store::SnapshotStore;
pub use stream::SnapshotStream;
pub use subscription::{DEFAULT_TOPIC, SubscriptionHandler};
pub use validator::{AvailabilityCheck, AvailabilityState, DebouncedValidator, ValidatorOptions};
pub use view::LiveView;

// The wire types consumers need alongside the core API.
pub use bmsdash_api::{ConfigApiClient, HvacUnitConfig, Protocol};
