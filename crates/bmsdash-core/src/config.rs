// ── Runtime configuration ──
//
// Describes *where* the backend lives and how to talk to it. Built by the
// CLI/TUI from files and flags; core never touches disk.

use std::sync::Arc;
use std::time::Duration;

use bmsdash_api::{
    ConfigApiClient, NoToken, StaticToken, TlsMode, TokenProvider, TransportConfig,
    WebSocketConnector,
};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::connection::{ConnectionOptions, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_RECONNECT_DELAY};
use crate::error::CoreError;
use crate::subscription::DEFAULT_TOPIC;
use crate::validator::{DEFAULT_DEBOUNCE, ValidatorOptions};

/// TLS verification strategy for REST calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (lab backends with self-signed certs).
    DangerAcceptInvalid,
}

/// Everything needed to open a dashboard against one backend.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// REST root, e.g. `http://bms.local:8084`.
    pub api_url: Url,
    /// Push endpoint, e.g. `ws://bms.local:8084/ws`.
    pub ws_url: Url,
    pub topic: String,
    /// Bearer token for REST and the WebSocket upgrade.
    pub token: Option<SecretString>,
    pub tls: TlsVerification,
    /// REST request timeout.
    pub timeout: Duration,
    pub reconnect_delay: Duration,
    pub handshake_timeout: Duration,
    /// STOMP `host` header; `None` sends the endpoint authority.
    pub virtual_host: Option<String>,
    pub debounce: Duration,
}

impl DashboardConfig {
    /// Defaults for everything except the two endpoints.
    pub fn new(api_url: Url, ws_url: Url) -> Self {
        Self {
            api_url,
            ws_url,
            topic: DEFAULT_TOPIC.into(),
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            virtual_host: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            reconnect_delay: self.reconnect_delay,
            handshake_timeout: self.handshake_timeout,
            virtual_host: self.virtual_host.clone(),
        }
    }

    pub fn validator_options(&self) -> ValidatorOptions {
        ValidatorOptions {
            debounce: self.debounce,
            ..ValidatorOptions::default()
        }
    }

    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        match &self.token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(NoToken),
        }
    }

    /// REST client for `/api/hvac/`.
    pub fn config_client(&self) -> Result<ConfigApiClient, CoreError> {
        Ok(ConfigApiClient::new(
            self.api_url.as_str(),
            &self.transport(),
            self.token_provider(),
        )?)
    }

    /// WebSocket connector, forwarding the token on the upgrade request.
    pub fn connector(&self) -> WebSocketConnector {
        let connector = WebSocketConnector::new();
        match &self.token {
            Some(token) => connector.with_header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            ),
            None => connector,
        }
    }
}
