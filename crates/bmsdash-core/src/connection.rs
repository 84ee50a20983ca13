// ── Push connection lifecycle ──
//
// One background task per connection: open transport → STOMP handshake →
// subscribe → read until the session drops → wait a fixed delay → repeat.
// Transport failures never reach the caller; they only show up as state
// transitions.

use std::sync::Arc;
use std::time::Duration;

use bmsdash_api::{Connector, StompSession, WebSocketConnector, virtual_host};
use strum::{Display, IntoStaticStr};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::subscription::SubscriptionHandler;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Delivered to the registered observer, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Transition {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// The endpoint can never work; the reconnect loop has stopped.
    Fatal(String),
}

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Fixed wait between a lost session and the next attempt.
    pub reconnect_delay: Duration,
    /// Upper bound for opening the socket plus the CONNECTED reply.
    pub handshake_timeout: Duration,
    /// `host` header sent with CONNECT. `None` uses the endpoint authority.
    pub virtual_host: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            virtual_host: None,
        }
    }
}

// ── ConnectionManager ────────────────────────────────────────────

/// Owns the push session for one view.
///
/// `connect` is idempotent and returns immediately; `disconnect` tears
/// everything down and waits for the session task to finish. Dropping the
/// manager cancels the task without waiting.
pub struct ConnectionManager<C: Connector = WebSocketConnector> {
    connector: Arc<C>,
    options: ConnectionOptions,
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    observer: Option<mpsc::UnboundedSender<ConnectionEvent>>,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, options: ConnectionOptions) -> Self {
        Self::build(connector, options, None)
    }

    /// Like [`new`](Self::new), with `observer` receiving every transition.
    pub fn with_observer(
        connector: C,
        options: ConnectionOptions,
        observer: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        Self::build(connector, options, Some(observer))
    }

    fn build(
        connector: C,
        options: ConnectionOptions,
        observer: Option<mpsc::UnboundedSender<ConnectionEvent>>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector: Arc::new(connector),
            options,
            shared: Arc::new(Shared { state, observer }),
            running: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the session loop for `endpoint`.
    ///
    /// A no-op while a loop is already running, including while it waits to
    /// reconnect. Allowed again after `disconnect` or a fatal error.
    pub async fn connect(&self, endpoint: Url, subscription: SubscriptionHandler) {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("connect ignored: session loop already running");
            return;
        }

        self.shared.transition(ConnectionState::Connecting);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(session_loop(
            Arc::clone(&self.connector),
            endpoint,
            subscription,
            self.options.clone(),
            Arc::clone(&self.shared),
            cancel.clone(),
        ));
        *running = Some(Running { cancel, handle });
    }

    /// Cancel any pending reconnect, close the session and wait for the
    /// loop to exit. Safe to call in any state.
    pub async fn disconnect(&self) {
        let mut running = self.running.lock().await;
        if let Some(Running { cancel, handle }) = running.take() {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        self.shared.transition(ConnectionState::Disconnected);
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

impl Shared {
    fn transition(&self, to: ConnectionState) {
        let from = self.state.send_replace(to);
        if from != to {
            debug!(%from, %to, "connection state");
            self.emit(ConnectionEvent::Transition { from, to });
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }
}

// ── Background session loop ──────────────────────────────────────

async fn session_loop<C: Connector>(
    connector: Arc<C>,
    endpoint: Url,
    subscription: SubscriptionHandler,
    options: ConnectionOptions,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let host = options
        .virtual_host
        .clone()
        .unwrap_or_else(|| virtual_host(&endpoint));

    loop {
        shared.transition(ConnectionState::Connecting);

        match run_session(&*connector, &endpoint, &host, &subscription, &options, &shared, &cancel)
            .await
        {
            Ok(()) => break,
            Err(e) if e.is_fatal() => {
                error!(error = %e, "push endpoint unusable, not reconnecting");
                shared.transition(ConnectionState::Disconnected);
                shared.emit(ConnectionEvent::Fatal(e.to_string()));
                return;
            }
            Err(e) => warn!(error = %e, "push session lost"),
        }

        shared.transition(ConnectionState::Disconnected);

        let delay = options.reconnect_delay;
        info!(delay = ?delay, "waiting before reconnect");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    shared.transition(ConnectionState::Disconnected);
    debug!("session loop exiting");
}

/// One session: `Ok(())` only when cancelled.
async fn run_session<C: Connector>(
    connector: &C,
    endpoint: &Url,
    host: &str,
    subscription: &SubscriptionHandler,
    options: &ConnectionOptions,
    shared: &Shared,
    cancel: &CancellationToken,
) -> Result<(), bmsdash_api::Error> {
    let timeout = options.handshake_timeout;
    let opening = async {
        let channel = connector.open(endpoint).await?;
        StompSession::handshake(channel, host).await
    };

    let mut session = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        opened = tokio::time::timeout(timeout, opening) => opened.map_err(|_| {
            bmsdash_api::Error::Stomp(format!("no CONNECTED frame within {}ms", timeout.as_millis()))
        })??,
    };

    shared.transition(ConnectionState::Connected);
    info!(
        endpoint = %endpoint,
        topic = subscription.topic(),
        version = session.version(),
        server = session.server().unwrap_or("unknown"),
        "push session established"
    );

    subscription.run(&mut session, cancel).await?;

    if let Err(e) = session.disconnect().await {
        debug!(error = %e, "DISCONNECT not delivered");
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
