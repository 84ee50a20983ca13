// Async client for the HVAC configuration REST API.
//
// Base path: {api}/api/hvac/
// Auth: `Authorization: Bearer <token>` from a TokenProvider, per request

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::{NoToken, TokenProvider};
use crate::error::Error;
use crate::models::{ExistsResponse, HvacUnitConfig, Protocol};
use crate::transport::TransportConfig;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the configuration endpoints under `/api/hvac/`.
#[derive(Clone)]
pub struct ConfigApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for ConfigApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ConfigApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL, transport config and token source.
    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            tokens,
        })
    }

    /// Wrap an existing `reqwest::Client`; requests go out unauthenticated.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            tokens: Arc::new(NoToken),
        })
    }

    /// Replace the token source.
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Append `/api/hvac/` to the backend root, tolerating a trailing slash.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let root = raw.trim_end_matches('/');
        Ok(Url::parse(&format!("{root}/api/hvac/"))?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/hvac/config`
    pub async fn list_configs(&self) -> Result<Vec<HvacUnitConfig>, Error> {
        self.get("config", &[]).await
    }

    /// `POST /api/hvac/config`
    pub async fn create_config(&self, config: &HvacUnitConfig) -> Result<HvacUnitConfig, Error> {
        self.post("config", config).await
    }

    /// `GET /api/hvac/config/exists?protocol=..&deviceId=..`
    ///
    /// `true` when a unit with this device id is already registered for the
    /// protocol.
    pub async fn device_id_exists(&self, protocol: Protocol, device_id: &str) -> Result<bool, Error> {
        let params = [
            ("protocol", protocol.to_string()),
            ("deviceId", device_id.to_owned()),
        ];
        let resp: ExistsResponse = self.get("config/exists", &params).await?;
        Ok(resp.exists)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .authorize(self.http.get(url))
            .query(params)
            .send()
            .await?;
        handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.authorize(self.http.post(url)).json(body).send().await?;
        handle_response(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Authentication {
            message: if raw.is_empty() {
                "bearer token rejected".into()
            } else {
                raw
            },
        };
    }

    Error::Http {
        status: status.as_u16(),
        message: if raw.is_empty() {
            status.to_string()
        } else {
            raw
        },
    }
}
