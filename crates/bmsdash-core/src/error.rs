// ── Core error types ──
//
// User-facing errors from bmsdash-core. Consumers never match on HTTP or
// STOMP details directly; the `From<bmsdash_api::Error>` impl translates
// transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Push connection lost: {reason}")]
    PushDisconnected { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Backend rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response from backend: {message}")]
    UnexpectedResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<bmsdash_api::Error> for CoreError {
    fn from(err: bmsdash_api::Error) -> Self {
        use bmsdash_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            Api::InvalidEndpoint { url, reason } => CoreError::Config {
                message: format!("Invalid push endpoint {url}: {reason}"),
            },
            Api::Http { status, message } => CoreError::Rejected { status, message },
            Api::WebSocketConnect(reason) => CoreError::PushDisconnected { reason },
            Api::WebSocketClosed { code, reason } => CoreError::PushDisconnected {
                reason: format!("closed with code {code}: {reason}"),
            },
            Api::Stomp(reason) => CoreError::PushDisconnected {
                reason: format!("protocol error: {reason}"),
            },
            Api::Broker { message, .. } => CoreError::PushDisconnected {
                reason: format!("broker error: {message}"),
            },
            Api::SessionClosed => CoreError::PushDisconnected {
                reason: "session closed".into(),
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::UnexpectedResponse { message }
            }
        }
    }
}
