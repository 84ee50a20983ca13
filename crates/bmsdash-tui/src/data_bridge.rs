//! Data bridge: owns the live view and forwards its changes as actions.
//!
//! The view is mounted when the bridge starts and unmounted when it is
//! cancelled, so the push session lives exactly as long as the dashboard.

use bmsdash_core::{ConnectionEvent, DashboardConfig, LiveView};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::Action;

pub async fn spawn_data_bridge(
    config: DashboardConfig,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let view = LiveView::mount(&config, Some(event_tx)).await;
    info!(endpoint = %config.ws_url, topic = %config.topic, "live view mounted");

    let mut snapshots = view.snapshots();
    let mut last_updates = view.store().subscribe_last_update();
    let _ = action_tx.send(Action::ConnectionChanged(view.connection_state()));
    let _ = action_tx.send(Action::SnapshotUpdated(snapshots.current().clone()));
    let _ = action_tx.send(Action::LastUpdate(*last_updates.borrow_and_update()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(event) = events.recv() => match event {
                ConnectionEvent::Transition { from, to } => {
                    debug!(%from, %to, "connection transition");
                    let _ = action_tx.send(Action::ConnectionChanged(to));
                }
                ConnectionEvent::Fatal(reason) => {
                    warn!(%reason, "push endpoint rejected");
                    let _ = action_tx.send(Action::ConnectionFatal(reason));
                }
            },

            Some(snapshot) = snapshots.changed() => {
                let _ = action_tx.send(Action::SnapshotUpdated(snapshot));
            }

            Ok(()) = last_updates.changed() => {
                let at = *last_updates.borrow_and_update();
                let _ = action_tx.send(Action::LastUpdate(at));
            }

            else => break,
        }
    }

    view.unmount().await;
    info!("live view unmounted");
}
