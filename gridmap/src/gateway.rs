//! Persistence gateway: the REST endpoints behind the map.
//!
//! [`MapGateway`] is the seam the session talks to; [`HttpGateway`] is the
//! reqwest implementation. Both stay thin: they move JSON and map transport
//! failures into [`GatewayError`]. Interpreting payloads (skipping malformed
//! items, feed slots) belongs to [`crate::wire`] and the engine.

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "gateway_test.rs"]
mod gateway_test;

use reqwest::Method;
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::doc::ItemId;
use crate::wire::{
    AvailableToolDto, AvailableToolsResponse, CreateToolRequest, DrawingRequest, PositionRequest, PositionSnapshot,
    SavedItemDto, parse_bootstrap_list,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by gateway calls.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

// =============================================================================
// CONFIG
// =============================================================================

/// Where and how to reach the map backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Raw `Cookie` header value; browsers attach cookies themselves.
    pub session_cookie: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            session_cookie: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    /// Build config from environment variables.
    ///
    /// - `MAP_API_BASE_URL`: default `http://127.0.0.1:8080`
    /// - `MAP_SESSION_COOKIE`: optional `Cookie` header value
    /// - `MAP_REQUEST_TIMEOUT_SECS`: default 30
    /// - `MAP_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build config from any key lookup. Unparseable timeouts use the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("MAP_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let session_cookie = lookup("MAP_SESSION_COOKIE").filter(|v| !v.trim().is_empty());
        Self {
            session_cookie,
            request_timeout_secs: parse_secs(&lookup, "MAP_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: parse_secs(&lookup, "MAP_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            ..Self::new(&base_url)
        }
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) => secs,
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring unparseable timeout");
            default
        }
    }
}

// =============================================================================
// GATEWAY TRAIT
// =============================================================================

/// Backend operations the editor needs. Enables mocking in tests.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MapGateway {
    /// `GET /api/map`. Malformed entries are skipped.
    async fn load_items(&self) -> Result<Vec<SavedItemDto>, GatewayError>;

    /// `GET /api/map/available-tools`.
    async fn load_available_tools(&self) -> Result<Vec<AvailableToolDto>, GatewayError>;

    /// `POST /api/map/tool`. Returns the saved item.
    async fn create_tool(&self, request: &CreateToolRequest) -> Result<SavedItemDto, GatewayError>;

    /// `POST /api/map/drawing`. Returns the saved item.
    async fn create_drawing(&self, request: &DrawingRequest) -> Result<SavedItemDto, GatewayError>;

    /// `PUT /api/map/drawing/{id}`.
    async fn update_drawing(&self, id: ItemId, request: &DrawingRequest) -> Result<(), GatewayError>;

    /// `PUT /api/map/{id}/position`.
    async fn update_position(&self, id: ItemId, position: PositionRequest) -> Result<(), GatewayError>;

    /// `DELETE /api/map/{id}`.
    async fn delete_item(&self, id: ItemId) -> Result<(), GatewayError>;

    /// `POST /api/map/save`.
    async fn save_state(&self, items: &[PositionSnapshot]) -> Result<(), GatewayError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// [`MapGateway`] over HTTP.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl HttpGateway {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs));
        let http = builder.build().map_err(|e| GatewayError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), session_cookie: config.session_cookie.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base_url));
        match &self.session_cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    /// Send and return the body of a successful response.
    async fn send(&self, builder: reqwest::RequestBuilder, what: &'static str) -> Result<String, GatewayError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(call = what, error = %e, "map request failed");
            GatewayError::Request(e.to_string())
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| GatewayError::Request(e.to_string()))?;
        if !status.is_success() {
            tracing::warn!(call = what, status = status.as_u16(), "map backend rejected request");
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }
        tracing::debug!(call = what, bytes = body.len(), "map request ok");
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl MapGateway for HttpGateway {
    async fn load_items(&self) -> Result<Vec<SavedItemDto>, GatewayError> {
        let body = self.send(self.request(Method::GET, "/api/map"), "load_items").await?;
        let value: Value = decode(&body)?;
        Ok(parse_bootstrap_list("map", value))
    }

    async fn load_available_tools(&self) -> Result<Vec<AvailableToolDto>, GatewayError> {
        let body = self.send(self.request(Method::GET, "/api/map/available-tools"), "load_available_tools").await?;
        let response: AvailableToolsResponse = decode(&body)?;
        Ok(response.into_tools())
    }

    async fn create_tool(&self, request: &CreateToolRequest) -> Result<SavedItemDto, GatewayError> {
        let builder = self.request(Method::POST, "/api/map/tool").json(request);
        decode(&self.send(builder, "create_tool").await?)
    }

    async fn create_drawing(&self, request: &DrawingRequest) -> Result<SavedItemDto, GatewayError> {
        let builder = self.request(Method::POST, "/api/map/drawing").json(request);
        decode(&self.send(builder, "create_drawing").await?)
    }

    async fn update_drawing(&self, id: ItemId, request: &DrawingRequest) -> Result<(), GatewayError> {
        let builder = self.request(Method::PUT, &format!("/api/map/drawing/{id}")).json(request);
        self.send(builder, "update_drawing").await?;
        Ok(())
    }

    async fn update_position(&self, id: ItemId, position: PositionRequest) -> Result<(), GatewayError> {
        let builder = self.request(Method::PUT, &format!("/api/map/{id}/position")).json(&position);
        self.send(builder, "update_position").await?;
        Ok(())
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), GatewayError> {
        self.send(self.request(Method::DELETE, &format!("/api/map/{id}")), "delete_item").await?;
        Ok(())
    }

    async fn save_state(&self, items: &[PositionSnapshot]) -> Result<(), GatewayError> {
        let builder = self.request(Method::POST, "/api/map/save").json(items);
        self.send(builder, "save_state").await?;
        Ok(())
    }
}
