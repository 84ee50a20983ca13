// ── Topic subscription ──
//
// Consumes MESSAGE frames on one topic and republishes each well-formed
// body as the new snapshot. Runs once per established session.

use std::sync::Arc;

use bmsdash_api::StompSession;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::model::{MalformedFrame, TelemetrySnapshot};
use crate::store::SnapshotStore;

pub const DEFAULT_TOPIC: &str = "/topic/hvac";

/// Applies telemetry pushed on `topic` to a [`SnapshotStore`].
///
/// Messages are applied in arrival order; the last one received wins.
#[derive(Debug, Clone)]
pub struct SubscriptionHandler {
    topic: String,
    store: Arc<SnapshotStore>,
}

impl SubscriptionHandler {
    pub fn new(topic: impl Into<String>, store: Arc<SnapshotStore>) -> Self {
        Self {
            topic: topic.into(),
            store,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Parse one message body and replace the snapshot with it.
    ///
    /// A malformed body is logged and counted; the snapshot is untouched.
    pub fn apply(&self, body: &str) -> Result<(), MalformedFrame> {
        match TelemetrySnapshot::parse(body) {
            Ok(snapshot) => {
                trace!(devices = snapshot.len(), "Applying telemetry frame");
                self.store.replace(snapshot);
                Ok(())
            }
            Err(e) => {
                let rejected = self.store.record_rejected();
                warn!(error = %e, rejected, "Dropping malformed telemetry frame");
                Err(e)
            }
        }
    }

    /// Subscribe on `session` and apply messages until `cancel` fires or the
    /// session fails.
    ///
    /// Cancellation unsubscribes and returns `Ok(())`. Session errors are
    /// returned as-is for the owner's reconnect policy.
    pub async fn run(
        &self,
        session: &mut StompSession,
        cancel: &CancellationToken,
    ) -> Result<(), bmsdash_api::Error> {
        let id = session.subscribe(&self.topic).await?;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    if let Err(e) = session.unsubscribe(&id).await {
                        debug!(error = %e, "UNSUBSCRIBE not delivered");
                    }
                    return Ok(());
                }
                message = session.next_message() => {
                    let message = message?;
                    if message.subscription.as_deref().is_some_and(|s| s != id) {
                        trace!(subscription = ?message.subscription, "Ignoring message for another subscription");
                    } else {
                        // Malformed frames are already logged and counted.
                        let _ = self.apply(&message.body);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_UNIT: &str = r#"[{"id":1,"unitName":"AHU-1","temperature":21.0,"setpoint":21.0,"onState":true,"fanSpeed":30,"flowRate":0.8,"fault":false,"telemetryTime":"2026-03-01T10:00:00Z"}]"#;

    fn handler() -> SubscriptionHandler {
        SubscriptionHandler::new(DEFAULT_TOPIC, Arc::new(SnapshotStore::new()))
    }

    #[test]
    fn malformed_frame_leaves_snapshot_unchanged() {
        let handler = handler();
        handler.apply(ONE_UNIT).unwrap();
        let before = handler.store().snapshot();

        assert!(handler.apply("not json").is_err());
        assert!(handler.apply(r#"[{"id":"x"}]"#).is_err());

        assert_eq!(*handler.store().snapshot(), *before);
        assert_eq!(handler.store().rejected_frames(), 2);
    }

    #[test]
    fn empty_array_clears_the_view() {
        let handler = handler();
        handler.apply(ONE_UNIT).unwrap();
        handler.apply("[]").unwrap();
        assert!(handler.store().snapshot().is_empty());
    }

    #[test]
    fn last_received_wins() {
        let handler = handler();
        handler.apply(ONE_UNIT).unwrap();
        handler
            .apply(&ONE_UNIT.replace("\"temperature\":21.0", "\"temperature\":25.5"))
            .unwrap();
        let snap = handler.store().snapshot();
        assert!((snap.get(1).unwrap().temperature - 25.5).abs() < f64::EPSILON);
    }
}
