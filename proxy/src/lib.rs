//! Same-origin proxy for generated images.
//!
//! Routes:
//! - GET /images/generated/{*path} - fetches `<backend>/storage/<path>`
//! - GET /healthz                  - liveness probe
//!
//! Serving results from the front end's own origin avoids cross-origin
//! restrictions on the backend's storage.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tracing::{debug, error, info};
use url::Url;

/// Content type used when the backend does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Cache policy attached to proxied images.
pub const CACHE_CONTROL: &str = "public, max-age=86400";

/// Upstream request timeout.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared proxy state.
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    storage_base: Url,
}

impl ProxyState {
    /// Creates state that forwards to `<backend_url>/storage`.
    pub fn new(backend_url: &str) -> Result<Self> {
        let mut storage_base = Url::parse(backend_url)
            .with_context(|| format!("invalid backend url {:?}", backend_url))?;
        if !matches!(storage_base.scheme(), "http" | "https") {
            anyhow::bail!("backend url must be http or https, got {}", storage_base.scheme());
        }
        storage_base
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("backend url {:?} cannot carry a path", backend_url))?
            .pop_if_empty()
            .push("storage");

        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            storage_base,
        })
    }

    pub fn storage_base(&self) -> &str {
        self.storage_base.as_str()
    }

    /// Maps a decoded storage path onto the backend, re-encoding each segment.
    pub fn upstream_url(&self, path: &str) -> Url {
        let mut url = self.storage_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.split('/'));
        }
        url
    }
}

/// Builds the proxy router.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/images/generated", get(missing_path))
        .route("/images/generated/", get(missing_path))
        .route("/images/generated/{*path}", get(proxy_image))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Binds `addr` and serves until the process exits.
///
/// `addr` may omit the host (`:8080`), meaning all interfaces.
pub async fn serve(addr: &str, backend_url: &str) -> Result<()> {
    let state = ProxyState::new(backend_url)?;
    let addr = parse_addr(addr)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("image proxy listening on http://{} -> {}", addr, state.storage_base());

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Parses an address, filling in `0.0.0.0` for a bare `:port`.
pub fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    addr.parse()
        .with_context(|| format!("invalid listen address {:?}", addr))
}

async fn missing_path() -> Response {
    bad_request("Path required")
}

async fn proxy_image(State(state): State<ProxyState>, Path(path): Path<String>) -> Response {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return bad_request("Path required");
    }
    if path.split('/').any(|seg| seg == ".." || seg == ".") {
        return bad_request("Invalid path");
    }

    let url = state.upstream_url(path);
    debug!("proxy GET {}", url);

    let upstream = match state.client.get(url.clone()).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("image proxy error for {}: {}", url, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = upstream.status();
    if !status.is_success() {
        debug!("upstream returned {} for {}", status, url);
        return StatusCode::from_u16(status.as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY)
            .into_response();
    }

    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("image proxy error reading {}: {}", url, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
        ],
        Body::from(bytes),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
