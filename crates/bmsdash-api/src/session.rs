// STOMP 1.2 client session on top of a FrameChannel.
//
// One session per transport. The session never reconnects; when any method
// returns an error the session is finished and the owner opens a new one.

use crate::error::Error;
use crate::stomp::{Command, Frame};
use crate::websocket::FrameChannel;

/// A `MESSAGE` frame delivered on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompMessage {
    pub destination: Option<String>,
    pub subscription: Option<String>,
    pub message_id: Option<String>,
    pub body: String,
}

impl StompMessage {
    fn from_frame(frame: Frame) -> Self {
        let header = |name: &str| frame.get(name).map(str::to_owned);
        let destination = header("destination");
        let subscription = header("subscription");
        let message_id = header("message-id");
        Self {
            destination,
            subscription,
            message_id,
            body: frame.body,
        }
    }
}

/// Connected STOMP session.
#[derive(Debug)]
pub struct StompSession {
    channel: FrameChannel,
    version: String,
    server: Option<String>,
    next_subscription: u32,
}

impl StompSession {
    /// Send `CONNECT` and wait for the broker's `CONNECTED`.
    ///
    /// Heart-beating is declined (`0,0`). An `ERROR` reply is returned as
    /// [`Error::Broker`]. Callers bound the wait with their own timeout.
    pub async fn handshake(mut channel: FrameChannel, host: &str) -> Result<Self, Error> {
        let connect = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", "0,0");
        channel.send(connect).await?;

        let reply = channel.recv().await?;
        match reply.command {
            Command::Connected => {
                let version = reply.get("version").unwrap_or("1.2").to_owned();
                let server = reply.get("server").map(str::to_owned);
                tracing::debug!(version = %version, server = ?server, "STOMP session established");
                Ok(Self {
                    channel,
                    version,
                    server,
                    next_subscription: 0,
                })
            }
            Command::Error => Err(broker_error(reply)),
            other => Err(Error::Stomp(format!("expected CONNECTED, got {other}"))),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Subscribe with auto-ack. Returns the subscription id.
    pub async fn subscribe(&mut self, destination: &str) -> Result<String, Error> {
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;

        self.channel
            .send(
                Frame::new(Command::Subscribe)
                    .header("id", id.clone())
                    .header("destination", destination)
                    .header("ack", "auto"),
            )
            .await?;
        tracing::debug!(id = %id, destination, "STOMP subscribed");
        Ok(id)
    }

    pub async fn unsubscribe(&mut self, id: &str) -> Result<(), Error> {
        self.channel
            .send(Frame::new(Command::Unsubscribe).header("id", id))
            .await
    }

    /// Wait for the next `MESSAGE`.
    ///
    /// `RECEIPT` and other housekeeping frames are skipped. An `ERROR`
    /// frame ends the session.
    pub async fn next_message(&mut self) -> Result<StompMessage, Error> {
        loop {
            let frame = self.channel.recv().await?;
            match frame.command {
                Command::Message => return Ok(StompMessage::from_frame(frame)),
                Command::Error => return Err(broker_error(frame)),
                other => tracing::trace!(command = %other, "Ignoring STOMP frame"),
            }
        }
    }

    /// Queue `DISCONNECT` and drop the transport.
    ///
    /// No receipt is requested. The transport writes every queued frame,
    /// this one included, before it closes the socket.
    pub async fn disconnect(self) -> Result<(), Error> {
        self.channel.send(Frame::new(Command::Disconnect)).await
    }
}

/// Default host header for `CONNECT`: the endpoint authority.
///
/// Suits brokers that ignore the header, such as an embedded simple broker.
/// Brokers that map it to a virtual host (RabbitMQ, ActiveMQ) need the
/// vhost name instead, supplied through `ConnectionOptions::virtual_host`.
pub fn virtual_host(endpoint: &url::Url) -> String {
    match (endpoint.host_str(), endpoint.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_owned(),
        (None, _) => "localhost".to_owned(),
    }
}

fn broker_error(frame: Frame) -> Error {
    Error::Broker {
        message: frame
            .get("message")
            .unwrap_or("broker rejected the request")
            .to_owned(),
        details: frame.body,
    }
}

// ── Tests ────────────────────────────────────────────────────────────
