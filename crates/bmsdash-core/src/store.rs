// ── Snapshot store ──
//
// Holds the latest successfully parsed telemetry frame. Writes replace the
// whole snapshot and are broadcast to subscribers via `watch` channels.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::TelemetrySnapshot;
use crate::stream::SnapshotStream;

/// Reactive holder of the current [`TelemetrySnapshot`].
///
/// Owned by one view; readers get `Arc` snapshots and never block the
/// writer.
#[derive(Debug)]
pub struct SnapshotStore {
    snapshot: watch::Sender<Arc<TelemetrySnapshot>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
    rejected: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(TelemetrySnapshot::default()));
        let (last_update, _) = watch::channel(None);

        Self {
            snapshot,
            last_update,
            rejected: AtomicU64::new(0),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot.subscribe())
    }

    /// When the last frame was applied, if any.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    pub fn subscribe_last_update(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_update.subscribe()
    }

    /// Frames dropped as malformed since the store was created.
    pub fn rejected_frames(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub(crate) fn replace(&self, snapshot: TelemetrySnapshot) {
        self.snapshot.send_replace(Arc::new(snapshot));
        self.last_update.send_replace(Some(Utc::now()));
    }

    pub(crate) fn record_rejected(&self) -> u64 {
        self.rejected.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
