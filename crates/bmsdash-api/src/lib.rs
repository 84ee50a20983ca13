// bmsdash-api: Async clients for the BMS backend (STOMP telemetry push + HVAC config REST)

pub mod auth;
pub mod config_api;
pub mod error;
pub mod models;
pub mod session;
pub mod stomp;
pub mod transport;
pub mod websocket;

pub use auth::{NoToken, StaticToken, TokenProvider};
pub use config_api::ConfigApiClient;
pub use error::Error;
pub use models::{HvacUnitConfig, Protocol};
pub use session::{StompMessage, StompSession, virtual_host};
pub use stomp::{Command, Frame};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{Connector, FrameChannel, FramePeer, WebSocketConnector, ws_endpoint};
