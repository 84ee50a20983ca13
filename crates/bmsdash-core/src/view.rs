// ── Per-view live telemetry ──
//
// Everything a mounted dashboard view owns: the snapshot store and the
// connection that feeds it. Unmounting closes the session and discards the
// snapshot; nothing is shared between views.

use std::sync::Arc;

use bmsdash_api::{Connector, WebSocketConnector};
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::config::DashboardConfig;
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionOptions, ConnectionState};
use crate::model::TelemetrySnapshot;
use crate::store::SnapshotStore;
use crate::stream::SnapshotStream;
use crate::subscription::SubscriptionHandler;

/// Live telemetry for one mounted view.
pub struct LiveView<C: Connector = WebSocketConnector> {
    store: Arc<SnapshotStore>,
    connection: ConnectionManager<C>,
}

impl LiveView {
    /// Mount against the configured WebSocket endpoint.
    pub async fn mount(
        config: &DashboardConfig,
        observer: Option<mpsc::UnboundedSender<ConnectionEvent>>,
    ) -> Self {
        Self::mount_with(
            config.connector(),
            config.ws_url.clone(),
            &config.topic,
            config.connection_options(),
            observer,
        )
        .await
    }
}

impl<C: Connector> LiveView<C> {
    /// Mount over an arbitrary transport and start connecting.
    pub async fn mount_with(
        connector: C,
        endpoint: Url,
        topic: &str,
        options: ConnectionOptions,
        observer: Option<mpsc::UnboundedSender<ConnectionEvent>>,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let connection = match observer {
            Some(tx) => ConnectionManager::with_observer(connector, options, tx),
            None => ConnectionManager::new(connector, options),
        };

        connection
            .connect(endpoint, SubscriptionHandler::new(topic, Arc::clone(&store)))
            .await;

        Self { store, connection }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.store.snapshot()
    }

    pub fn snapshots(&self) -> SnapshotStream {
        self.store.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe_state()
    }

    /// Close the session and wait for it; the snapshot goes with `self`.
    pub async fn unmount(self) {
        self.connection.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryConnector, frame_body, unit_json};

    #[tokio::test(start_paused = true)]
    async fn mount_receives_frames_and_unmount_closes() {
        let (connector, mut broker) = InMemoryConnector::new();
        let view = LiveView::mount_with(
            connector,
            Url::parse("ws://bms.test/ws").unwrap(),
            "/topic/hvac",
            ConnectionOptions::default(),
            None,
        )
        .await;
        let mut state = view.subscribe_state();
        let mut snapshots = view.snapshots();

        let mut peer = broker.accept().await;
        peer.complete_handshake().await;
        let sub = peer.expect_subscribe().await;
        state
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .unwrap();

        peer.publish(&sub, &frame_body(&[unit_json(1, 20.0), unit_json(2, 24.0)]))
            .await;
        let snap = snapshots.changed().await.unwrap();
        assert_eq!(snap.len(), 2);
        assert!((snap.summary().mean_temperature.unwrap() - 22.0).abs() < 1e-9);

        // Malformed push keeps the table as it was.
        peer.publish(&sub, "not json").await;
        peer.publish(&sub, "[]").await;
        let snap = snapshots.changed().await.unwrap();
        assert!(snap.is_empty());
        assert_eq!(view.store().rejected_frames(), 1);

        let store = Arc::clone(view.store());
        view.unmount().await;
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        assert!(store.snapshot().is_empty());
    }
}
