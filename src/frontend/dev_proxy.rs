//! Development server: static bundle + reverse proxy + SPA fallback.
//!
//! Requests matching a [`ProxyRule`] are forwarded to the API server and the
//! upstream response is streamed back; everything else is served from the
//! bundle output directory, falling back to `index.html`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AppError;

use super::build::{BuildConfig, ProxyRule};

#[derive(Debug, Clone)]
struct DevState {
    build: Arc<BuildConfig>,
    client: reqwest::Client,
}

/// Upstream URL for a proxied request.
pub fn upstream_url(rule: &ProxyRule, path_and_query: &str) -> String {
    format!("{}{}", rule.target.trim_end_matches('/'), path_and_query)
}

/// `host[:port]` of a proxy target, used when `change_origin` is set.
pub fn target_authority(target: &str) -> Option<String> {
    let url = Url::parse(target).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Build the dev server router.
pub fn dev_router(build: BuildConfig) -> Result<Router, AppError> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| AppError::InvalidConfig(format!("failed to create proxy client: {}", e)))?;

    let state = DevState {
        build: Arc::new(build),
        client,
    };

    Ok(Router::new().fallback(proxy_or_static).with_state(state))
}

/// Serve the dev router on the configured dev-server port.
pub async fn run_dev_server(build: BuildConfig) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], build.dev_server.port));
    for rule in &build.dev_server.proxy {
        info!("Proxying {} -> {}", rule.prefix, rule.target);
    }
    info!("Serving {} on http://{}", build.out_dir.display(), addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, dev_router(build)?).await?;
    Ok(())
}

async fn proxy_or_static(State(state): State<DevState>, req: Request) -> Response {
    let rule = state.build.proxy_for(req.uri().path()).cloned();

    match rule {
        Some(rule) => match proxy_request(&state.client, &rule, req).await {
            Ok(response) => response,
            Err(e) => {
                warn!(upstream = %rule.target, "Proxy request failed: {}", e);
                StatusCode::BAD_GATEWAY.into_response()
            }
        },
        None => {
            let index = ServeFile::new(state.build.index_document());
            let serve = ServeDir::new(&state.build.out_dir).fallback(index);
            match serve.oneshot(req).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            }
        }
    }
}

async fn proxy_request(
    client: &reqwest::Client,
    rule: &ProxyRule,
    req: Request,
) -> anyhow::Result<Response> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path())
        .to_string();
    let url = upstream_url(rule, &path_and_query);
    debug!(%url, method = %req.method(), "Proxying request");

    let mut builder = client.request(req.method().clone(), &url);

    for (key, value) in req.headers() {
        if key == header::HOST && rule.change_origin {
            continue;
        }
        builder = builder.header(key, value);
    }
    if rule.change_origin {
        if let Some(authority) = target_authority(&rule.target) {
            builder = builder.header(header::HOST, authority);
        }
    }

    let body = axum::body::to_bytes(req.into_body(), usize::MAX).await?;
    if !body.is_empty() {
        builder = builder.body(body);
    }

    let upstream = builder.send().await?;

    let mut response = Response::builder().status(upstream.status());
    for (key, value) in upstream.headers() {
        response = response.header(key, value);
    }

    // Stream the body back (reqwest -> axum Body)
    Ok(response.body(Body::from_stream(upstream.bytes_stream()))?)
}
