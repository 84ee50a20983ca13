// In-memory STOMP broker for driving the connection loop under a paused
// clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bmsdash_api::{Command, Connector, Error, Frame, FrameChannel, FramePeer};
use tokio::sync::mpsc;
use url::Url;

const PEER_CAPACITY: usize = 16;

#[derive(Default)]
struct Plan {
    opened: AtomicUsize,
    refuse: AtomicUsize,
    reject: Mutex<Option<String>>,
}

/// Connector whose transports are plain frame queues.
pub(crate) struct InMemoryConnector {
    peers: mpsc::UnboundedSender<FramePeer>,
    plan: Arc<Plan>,
}

/// Test-side control of an [`InMemoryConnector`].
pub(crate) struct Broker {
    peers: mpsc::UnboundedReceiver<FramePeer>,
    plan: Arc<Plan>,
}

impl InMemoryConnector {
    pub(crate) fn new() -> (Self, Broker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let plan = Arc::new(Plan::default());
        (
            Self {
                peers: tx,
                plan: Arc::clone(&plan),
            },
            Broker { peers: rx, plan },
        )
    }
}

impl Connector for InMemoryConnector {
    async fn open(&self, endpoint: &Url) -> Result<FrameChannel, Error> {
        self.plan.opened.fetch_add(1, Ordering::SeqCst);

        let reject = self.plan.reject.lock().unwrap().clone();
        if let Some(reason) = reject {
            return Err(Error::InvalidEndpoint {
                url: endpoint.to_string(),
                reason,
            });
        }

        let refused = self
            .plan
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(Error::WebSocketConnect("connection refused".into()));
        }

        let (channel, peer) = FrameChannel::pair(PEER_CAPACITY);
        let _ = self.peers.send(peer);
        Ok(channel)
    }
}

impl Broker {
    /// Wait for the next transport the manager opens.
    pub(crate) async fn accept(&mut self) -> BrokerPeer {
        let inner = self.peers.recv().await.unwrap();
        BrokerPeer {
            inner,
            next_message_id: 0,
        }
    }

    /// Number of `open` calls so far, refused ones included.
    pub(crate) fn opened(&self) -> usize {
        self.plan.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn refuse_next(&self, n: usize) {
        self.plan.refuse.store(n, Ordering::SeqCst);
    }

    pub(crate) fn reject_endpoint(&self, reason: &str) {
        *self.plan.reject.lock().unwrap() = Some(reason.to_owned());
    }
}

/// Server end of one transport.
pub(crate) struct BrokerPeer {
    inner: FramePeer,
    next_message_id: u64,
}

impl BrokerPeer {
    pub(crate) async fn next_frame(&mut self) -> Option<Frame> {
        self.inner.from_client.recv().await
    }

    /// Answer CONNECT with CONNECTED. Returns the client's CONNECT frame.
    pub(crate) async fn complete_handshake(&mut self) -> Frame {
        let connect = self.next_frame().await.unwrap();
        assert_eq!(connect.command, Command::Connect);
        self.send(Frame::new(Command::Connected).header("version", "1.2"))
            .await;
        connect
    }

    pub(crate) async fn expect_subscribe(&mut self) -> Frame {
        let frame = self.next_frame().await.unwrap();
        assert_eq!(frame.command, Command::Subscribe);
        frame
    }

    /// Push a MESSAGE on the subscription described by `subscribe`.
    pub(crate) async fn publish(&mut self, subscribe: &Frame, body: &str) {
        let id = self.next_message_id;
        self.next_message_id += 1;
        let frame = Frame::new(Command::Message)
            .header("destination", subscribe.get("destination").unwrap_or_default())
            .header("subscription", subscribe.get("id").unwrap_or_default())
            .header("message-id", id.to_string())
            .with_body(body);
        self.send(frame).await;
    }

    pub(crate) async fn send_error(&mut self, message: &str) {
        self.send(Frame::new(Command::Error).header("message", message))
            .await;
    }

    /// Delivery failures are ignored; the client may already be gone.
    async fn send(&mut self, frame: Frame) {
        let _ = self.inner.to_client.send(Ok(frame)).await;
    }
}

/// One device record as the backend serializes it.
pub(crate) fn unit_json(id: i64, temperature: f64) -> String {
    format!(
        r#"{{"id":{id},"deviceId":{id},"unitName":"AHU-{id}","temperature":{temperature},"setpoint":21.0,"onState":true,"fanSpeed":55,"flowRate":1.2,"fault":false,"telemetryTime":"2026-03-01T10:00:00"}}"#
    )
}

pub(crate) fn frame_body(units: &[String]) -> String {
    format!("[{}]", units.join(","))
}
