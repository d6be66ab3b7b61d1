//! Development proxy for the internal API.
//!
//! Rewrites `/api/v1/...` to the upstream `/api/virtual-assistant/v1/...`,
//! sends it through the outbound proxy with the developer's `session` cookie
//! and relays whatever comes back (status, headers, body), errors included.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
    Router,
};

use vai_core::{config::ProxyConfig, errors::Error, Result};

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub struct ProxyState {
    cfg: ProxyConfig,
    http: reqwest::Client,
}

impl ProxyState {
    pub fn new(cfg: ProxyConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(outbound) = &cfg.outbound_proxy {
            let proxy = reqwest::Proxy::all(outbound)
                .map_err(|e| Error::Config(format!("invalid outbound proxy {outbound}: {e}")))?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self { cfg, http })
    }
}

pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new().fallback(forward).with_state(state)
}

/// Bind the configured port on localhost and serve until Ctrl-C.
pub async fn run(cfg: ProxyConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.port));
    let state = Arc::new(ProxyState::new(cfg)?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, upstream = %state.cfg.upstream, "dev proxy listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

/// Replace a leading `from` prefix with `to`; other paths pass through.
pub fn rewrite_path(path_and_query: &str, from: &str, to: &str) -> String {
    match path_and_query.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => path_and_query.to_string(),
    }
}

/// Append the session cookie to whatever cookies the client sent.
pub fn merge_cookie(existing: Option<&str>, session: &str) -> String {
    let session_cookie = format!("session={session}");
    match existing.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("{c}; {session_cookie}"),
        None => session_cookie,
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !is_hop_by_hop(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

async fn forward(State(state): State<Arc<ProxyState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let url = format!(
        "{}{}",
        state.cfg.upstream,
        rewrite_path(path, &state.cfg.local_prefix, &state.cfg.upstream_prefix)
    );
    let method = parts.method.clone();

    let incoming_cookie = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let cookie = merge_cookie(incoming_cookie, &state.cfg.session);

    let body = match to_bytes(body, state.cfg.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "request body rejected");
            return plain(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
        }
    };

    let mut upstream_req = state
        .http
        .request(method.clone(), &url)
        .header(header::COOKIE, cookie);
    if let Some(ct) = parts.headers.get(header::CONTENT_TYPE) {
        upstream_req = upstream_req.header(header::CONTENT_TYPE, ct.clone());
    }
    if !body.is_empty() {
        upstream_req = upstream_req.body(body);
    }

    let resp = match upstream_req.send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Fetching {method} {url}: upstream unreachable: {e}");
            return plain(StatusCode::BAD_GATEWAY, "upstream request failed");
        }
    };

    let status = resp.status();
    tracing::info!("Fetching {method} {url}: Response status: {}", status.as_u16());

    let headers = relay_headers(resp.headers());
    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Fetching {method} {url}: body read failed: {e}");
            return plain(StatusCode::BAD_GATEWAY, "upstream body read failed");
        }
    };

    let mut out = Response::new(Body::from(bytes));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

fn plain(status: StatusCode, msg: &'static str) -> Response {
    let mut out = Response::new(Body::from(msg));
    *out.status_mut() = status;
    out.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    out
}
