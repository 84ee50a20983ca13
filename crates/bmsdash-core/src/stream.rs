// ── Reactive snapshot stream ──
//
// Subscription type for consuming snapshot replacements from the store.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::TelemetrySnapshot;

/// A subscription to the live telemetry snapshot.
///
/// Point-in-time access plus change notification via
/// [`changed()`](Self::changed).
#[derive(Debug)]
pub struct SnapshotStream {
    current: Arc<TelemetrySnapshot>,
    receiver: watch::Receiver<Arc<TelemetrySnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<TelemetrySnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot seen at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<TelemetrySnapshot> {
        &self.current
    }

    /// Wait for the next replacement. `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<Arc<TelemetrySnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }
}
