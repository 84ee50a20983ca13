use thiserror::Error;

/// Top-level error type for the `bmsdash-api` crate.
///
/// Covers every failure mode across both backend surfaces: the REST
/// configuration API and the STOMP-over-WebSocket telemetry push.
/// `bmsdash-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The backend rejected the bearer token (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// Non-2xx response. The body is carried verbatim as the message.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── Push transport ──────────────────────────────────────────────
    /// The push endpoint cannot be turned into a transport at all
    /// (unsupported scheme, unparsable URI). Retrying will not help.
    #[error("Invalid push endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// WebSocket connection failed or dropped.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the peer with a close frame.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// STOMP protocol violation (unexpected or unparsable frame).
    #[error("STOMP protocol error: {0}")]
    Stomp(String),

    /// Broker sent an `ERROR` frame.
    #[error("Broker error: {message}")]
    Broker { message: String, details: String },

    /// The session's frame channel is gone.
    #[error("STOMP session closed")]
    SessionClosed,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the bearer token was rejected.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the error comes from configuration rather than
    /// the network: reconnecting with the same parameters cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidEndpoint { .. } | Self::InvalidUrl(_) | Self::Tls(_))
    }
}
