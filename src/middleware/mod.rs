//! Request pipeline: an explicit, ordered list of middleware stages.
//!
//! [`PIPELINE`] lists the stages in the order a request passes through them.
//! The first stage is the outermost layer, so it also sees every response
//! last (including CORS preflight answers and body-limit rejections).

pub mod access_log;
pub mod security;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::{middleware, Router};
use strum::{AsRefStr, Display};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, CorsLayer};

use crate::config::Config;
use crate::error::AppError;

pub use access_log::LogFormat;

/// A named middleware stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    /// Security response headers.
    SecurityHeaders,
    /// Single-origin CORS policy with credentials.
    Cors,
    /// Transparent gzip compression.
    Compression,
    /// Request span, access log line and request metrics.
    AccessLog,
    /// Request body size limit for JSON and form bodies.
    BodyLimit,
}

/// Stages in request order.
pub const PIPELINE: [Stage; 5] = [
    Stage::SecurityHeaders,
    Stage::Cors,
    Stage::Compression,
    Stage::AccessLog,
    Stage::BodyLimit,
];

impl Stage {
    /// Wrap `router` in this stage.
    pub fn apply(self, router: Router, config: &Config) -> Result<Router, AppError> {
        let router = match self {
            Stage::SecurityHeaders => {
                router.layer(middleware::from_fn(security::set_security_headers))
            }
            Stage::Cors => router.layer(cors_layer(config)?),
            Stage::Compression => router.layer(CompressionLayer::new()),
            Stage::AccessLog => router
                .layer(middleware::from_fn(access_log::tag_response))
                .layer(access_log::trace_layer(LogFormat::for_config(config))),
            Stage::BodyLimit => router.layer(DefaultBodyLimit::max(config.body_limit_bytes)),
        };
        Ok(router)
    }
}

/// Wrap `router` in every stage of [`PIPELINE`].
///
/// Layers are applied innermost first, so the stage listed first ends up
/// outermost.
pub fn apply_pipeline(router: Router, config: &Config) -> Result<Router, AppError> {
    PIPELINE
        .iter()
        .rev()
        .try_fold(router, |router, stage| stage.apply(router, config))
}

/// CORS policy accepting only the configured origin.
pub fn cors_layer(config: &Config) -> Result<CorsLayer, AppError> {
    let origin = config
        .cors_origin_header()
        .map_err(|e| AppError::InvalidConfig(format!("CORS_ORIGIN: {}", e)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request()))
}
