//! WebSocket transport for STOMP frames.
//!
//! A [`Connector`] opens one transport and hands back a [`FrameChannel`]:
//! a pair of bounded queues carrying decoded [`Frame`]s in each direction.
//! [`WebSocketConnector`] backs the channel with a real socket and a pump
//! task; [`FrameChannel::pair`] backs it with nothing but the two queues so
//! higher layers can be driven by an in-memory broker.
//!
//! The channel does not reconnect. Reconnection policy belongs to the
//! owner of the session (see `bmsdash_core::ConnectionManager`).

use std::future::Future;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::{CancellationToken, DropGuard};
use url::Url;

use crate::error::Error;
use crate::stomp::Frame;

// ── Channel capacities ───────────────────────────────────────────────

const OUTBOUND_CAPACITY: usize = 16;
const INBOUND_CAPACITY: usize = 64;

/// WebSocket sub-protocol announced on the upgrade request.
pub const STOMP_SUBPROTOCOL: &str = "v12.stomp";

// ── Connector ────────────────────────────────────────────────────────

/// Opens a frame transport to a push endpoint.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, endpoint: &Url) -> impl Future<Output = Result<FrameChannel, Error>> + Send;
}

// ── FrameChannel ─────────────────────────────────────────────────────

/// Bidirectional frame queue for one transport.
///
/// Dropping the channel stops the pump task behind it, which closes the
/// socket.
#[derive(Debug)]
pub struct FrameChannel {
    outbound: mpsc::Sender<Frame>,
    inbound: mpsc::Receiver<Result<Frame, Error>>,
    _guard: Option<DropGuard>,
}

impl FrameChannel {
    pub fn new(
        outbound: mpsc::Sender<Frame>,
        inbound: mpsc::Receiver<Result<Frame, Error>>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            _guard: None,
        }
    }

    /// Tie a background task's lifetime to this channel.
    pub fn with_guard(self, guard: DropGuard) -> Self {
        Self {
            outbound: self.outbound,
            inbound: self.inbound,
            _guard: Some(guard),
        }
    }

    /// An unconnected channel plus the peer end that plays the server.
    pub fn pair(capacity: usize) -> (Self, FramePeer) {
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (in_tx, in_rx) = mpsc::channel(capacity);
        (
            Self::new(out_tx, in_rx),
            FramePeer {
                from_client: out_rx,
                to_client: in_tx,
            },
        )
    }

    /// Queue a frame for the server.
    pub async fn send(&self, frame: Frame) -> Result<(), Error> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// Next frame from the server. A closed transport yields `SessionClosed`.
    pub async fn recv(&mut self) -> Result<Frame, Error> {
        self.inbound.recv().await.unwrap_or(Err(Error::SessionClosed))
    }
}

/// Server side of [`FrameChannel::pair`].
#[derive(Debug)]
pub struct FramePeer {
    pub from_client: mpsc::Receiver<Frame>,
    pub to_client: mpsc::Sender<Result<Frame, Error>>,
}

// ── WebSocketConnector ───────────────────────────────────────────────

/// Connects over `ws://` / `wss://`, announcing the STOMP 1.2 sub-protocol.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    headers: Vec<(String, String)>,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra header on the HTTP upgrade request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Connector for WebSocketConnector {
    async fn open(&self, endpoint: &Url) -> Result<FrameChannel, Error> {
        let url = ws_endpoint(endpoint)?;
        tracing::info!(url = %url, "Connecting to WebSocket");

        let uri: tungstenite::http::Uri =
            url.as_str()
                .parse()
                .map_err(|e: tungstenite::http::uri::InvalidUri| Error::InvalidEndpoint {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let mut request = ClientRequestBuilder::new(uri).with_sub_protocol(STOMP_SUBPROTOCOL);
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| match e {
                tungstenite::Error::Url(reason) => Error::InvalidEndpoint {
                    url: url.to_string(),
                    reason: reason.to_string(),
                },
                other => Error::WebSocketConnect(other.to_string()),
            })?;

        tracing::info!("WebSocket connected");

        let (write, read) = ws_stream.split();
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let cancel = CancellationToken::new();

        tokio::spawn(pump(write, read, out_rx, in_tx, cancel.clone()));

        Ok(FrameChannel::new(out_tx, in_rx).with_guard(cancel.drop_guard()))
    }
}

/// Normalize a push endpoint to a WebSocket URL.
///
/// `http`/`https` map to `ws`/`wss`; any other scheme cannot carry a
/// WebSocket and is rejected.
pub fn ws_endpoint(endpoint: &Url) -> Result<Url, Error> {
    let scheme = match endpoint.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(Error::InvalidEndpoint {
                url: endpoint.to_string(),
                reason: format!("unsupported scheme {other:?}"),
            });
        }
    };

    let mut url = endpoint.clone();
    url.set_scheme(scheme).map_err(|()| Error::InvalidEndpoint {
        url: endpoint.to_string(),
        reason: format!("cannot switch scheme to {scheme}"),
    })?;
    Ok(url)
}

// ── Pump task ────────────────────────────────────────────────────────

/// Shuttle frames between the socket and the channel until either side
/// goes away. Transport failures are delivered in-band as the last item.
///
/// On cancellation every frame already queued is written before the close
/// frame, so a session's final UNSUBSCRIBE and DISCONNECT reach the broker.
async fn pump<W, R>(
    mut write: W,
    mut read: R,
    mut outbound: mpsc::Receiver<Frame>,
    inbound: mpsc::Sender<Result<Frame, Error>>,
    cancel: CancellationToken,
) where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Frames queued before the channel was dropped still go out.
                while let Ok(frame) = outbound.try_recv() {
                    tracing::trace!(command = %frame.command, "STOMP >> (flush)");
                    if write.send(Message::text(frame.encode())).await.is_err() {
                        break;
                    }
                }
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            outgoing = outbound.recv() => {
                let Some(frame) = outgoing else {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };
                tracing::trace!(command = %frame.command, "STOMP >>");
                if let Err(e) = write.send(Message::text(frame.encode())).await {
                    let _ = inbound.send(Err(Error::WebSocketConnect(e.to_string()))).await;
                    break;
                }
            }
            incoming = read.next() => {
                let item = match incoming {
                    Some(Ok(Message::Text(text))) => decode_item(text.as_str()),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => decode_item(text),
                        Err(e) => Some(Err(Error::Stomp(format!("binary frame is not UTF-8: {e}")))),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or((1005, String::new()), |cf| {
                            (u16::from(cf.code), cf.reason.as_str().to_owned())
                        });
                        tracing::info!(code, reason = %reason, "WebSocket close frame received");
                        let _ = inbound.send(Err(Error::WebSocketClosed { code, reason })).await;
                        break;
                    }
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        let _ = inbound.send(Err(Error::WebSocketConnect(e.to_string()))).await;
                        break;
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        let _ = inbound.send(Err(Error::SessionClosed)).await;
                        break;
                    }
                };

                if let Some(item) = item {
                    if inbound.send(item).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!("WebSocket pump exiting");
}

/// `None` for heart-beats.
fn decode_item(text: &str) -> Option<Result<Frame, Error>> {
    match Frame::decode(text) {
        Ok(Some(frame)) => {
            tracing::trace!(command = %frame.command, "STOMP <<");
            Some(Ok(frame))
        }
        Ok(None) => {
            tracing::trace!("STOMP heart-beat");
            None
        }
        Err(e) => Some(Err(e)),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;
    use crate::session::StompSession;
    use crate::stomp::Command;

    #[test]
    fn http_schemes_map_to_ws() {
        let url = Url::parse("https://bms.local:8443/ws").unwrap();
        assert_eq!(ws_endpoint(&url).unwrap().as_str(), "wss://bms.local:8443/ws");

        let url = Url::parse("http://localhost:8084/ws").unwrap();
        assert_eq!(ws_endpoint(&url).unwrap().as_str(), "ws://localhost:8084/ws");

        let url = Url::parse("ws://localhost:8084/ws").unwrap();
        assert_eq!(ws_endpoint(&url).unwrap(), url);
    }

    #[test]
    fn unsupported_scheme_is_invalid_endpoint() {
        let url = Url::parse("ftp://bms.local/ws").unwrap();
        let err = ws_endpoint(&url).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn closed_pair_yields_session_closed() {
        let (mut channel, peer) = FrameChannel::pair(4);
        drop(peer);
        assert!(matches!(channel.recv().await, Err(Error::SessionClosed)));
        assert!(matches!(
            channel.send(Frame::new(Command::Disconnect)).await,
            Err(Error::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn pump_decodes_text_and_skips_heartbeats() {
        let incoming = stream::iter(vec![
            Ok(Message::text("\n")),
            Ok(Message::text("CONNECTED\nversion:1.2\n\n\0")),
        ]);
        let sink = futures_util::sink::drain::<Message>()
            .sink_map_err(|never: std::convert::Infallible| -> tungstenite::Error { match never {} });
        let (_out_tx, out_rx) = mpsc::channel(4);
        let (in_tx, mut in_rx) = mpsc::channel(4);

        pump(sink, incoming, out_rx, in_tx, CancellationToken::new()).await;

        let first = in_rx.recv().await.unwrap().unwrap();
        assert_eq!(first.command, Command::Connected);
        // Stream end is reported in-band.
        assert!(matches!(in_rx.recv().await, Some(Err(Error::SessionClosed))));
    }

    /// Sink that forwards every written message to a channel.
    fn recording_sink() -> (
        impl Sink<Message, Error = tungstenite::Error> + Unpin,
        mpsc::UnboundedReceiver<Message>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = futures_util::sink::unfold(tx, |tx, msg: Message| async move {
            let _ = tx.send(msg);
            Ok::<_, tungstenite::Error>(tx)
        });
        (Box::pin(sink), rx)
    }

    /// Command line of each text frame, `CLOSE` for the close frame.
    fn written(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(match msg {
                Message::Text(text) => text.as_str().lines().next().unwrap_or_default().to_owned(),
                Message::Close(None) => "CLOSE".to_owned(),
                other => format!("{other:?}"),
            });
        }
        out
    }

    #[tokio::test]
    async fn cancel_flushes_queued_frames_before_close() {
        let (sink, mut socket) = recording_sink();
        let (out_tx, out_rx) = mpsc::channel(4);
        let (in_tx, _in_rx) = mpsc::channel(4);
        out_tx
            .send(Frame::new(Command::Unsubscribe).header("id", "sub-0"))
            .await
            .unwrap();
        out_tx.send(Frame::new(Command::Disconnect)).await.unwrap();
        drop(out_tx);
        let cancel = CancellationToken::new();
        cancel.cancel();

        pump(sink, stream::pending(), out_rx, in_tx, cancel).await;

        assert_eq!(written(&mut socket), ["UNSUBSCRIBE", "DISCONNECT", "CLOSE"]);
    }

    #[tokio::test]
    async fn session_teardown_reaches_the_socket() {
        let (sink, mut socket) = recording_sink();
        let (out_tx, out_rx) = mpsc::channel(8);
        let (in_tx, in_rx) = mpsc::channel(8);
        in_tx
            .send(Ok(Frame::new(Command::Connected).header("version", "1.2")))
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        let channel = FrameChannel::new(out_tx, in_rx).with_guard(cancel.clone().drop_guard());

        let mut session = StompSession::handshake(channel, "bms").await.unwrap();
        let id = session.subscribe("/topic/hvac").await.unwrap();
        session.unsubscribe(&id).await.unwrap();
        // Dropping the session fires the channel's guard.
        session.disconnect().await.unwrap();
        assert!(cancel.is_cancelled());

        pump(sink, stream::pending(), out_rx, in_tx, cancel).await;

        assert_eq!(
            written(&mut socket),
            ["CONNECT", "SUBSCRIBE", "UNSUBSCRIBE", "DISCONNECT", "CLOSE"]
        );
    }

    #[tokio::test]
    async fn pump_reports_close_frame() {
        use tungstenite::protocol::CloseFrame;
        use tungstenite::protocol::frame::coding::CloseCode;

        let incoming = stream::iter(vec![Ok(Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "restarting".into(),
        })))]);
        let sink = futures_util::sink::drain::<Message>()
            .sink_map_err(|never: std::convert::Infallible| -> tungstenite::Error { match never {} });
        let (_out_tx, out_rx) = mpsc::channel(4);
        let (in_tx, mut in_rx) = mpsc::channel(4);

        pump(sink, incoming, out_rx, in_tx, CancellationToken::new()).await;

        match in_rx.recv().await {
            Some(Err(Error::WebSocketClosed { code, reason })) => {
                assert_eq!(code, 1001);
                assert_eq!(reason, "restarting");
            }
            other => panic!("expected close, got {other:?}"),
        }
    }
}
