//! Every state change in the TUI is expressed as an Action.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use bmsdash_core::{AvailabilityState, ConnectionState, HvacUnitConfig, TelemetrySnapshot};

use crate::screen::ScreenId;

#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    ToggleHelp,

    // ── Live telemetry (from the data bridge) ─────────────────────
    SnapshotUpdated(Arc<TelemetrySnapshot>),
    /// When the store last applied a frame.
    LastUpdate(Option<DateTime<Utc>>),
    ConnectionChanged(ConnectionState),
    /// The push endpoint is unusable; no reconnect will follow.
    ConnectionFatal(String),

    // ── Registration form ─────────────────────────────────────────
    AvailabilityChanged(AvailabilityState),
    UnitSaved(Result<HvacUnitConfig, String>),
}

impl Action {
    /// Data actions reach every screen, not only the visible one.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            Self::Tick
                | Self::SnapshotUpdated(_)
                | Self::LastUpdate(_)
                | Self::ConnectionChanged(_)
                | Self::ConnectionFatal(_)
                | Self::AvailabilityChanged(_)
                | Self::UnitSaved(_)
        )
    }
}
