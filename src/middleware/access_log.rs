//! One access-log line per request, emitted by a `tower-http` [`TraceLayer`].
//!
//! Outside production lines use the short `dev` format; in production the
//! Apache `combined` format. The trace layer's response hook only sees the
//! response, so [`tag_response`] copies the request summary onto it first.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::HttpBody;
use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderMap, Method, Response, StatusCode, Version};
use axum::middleware::Next;
use strum::{Display, EnumString};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, OnResponse, TraceLayer};
use tracing::{info, info_span, Span};

use crate::config::Config;
use crate::metrics;

/// Common Log Format timestamp, e.g. `10/Oct/2000:13:55:36 +0000`.
const CLF_DATE: &[FormatItem<'static>] = format_description!(
    "[day]/[month repr:short]/[year]:[hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
);

/// Access-log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// `GET /path 200 1.234 ms - 42`
    Dev,
    /// Apache combined log format.
    Combined,
}

impl LogFormat {
    /// Format matching the configured environment.
    pub fn for_config(config: &Config) -> Self {
        if config.is_production() {
            LogFormat::Combined
        } else {
            LogFormat::Dev
        }
    }
}

/// Request side of an access-log entry.
#[derive(Debug, Clone)]
pub struct RequestLine {
    pub method: Method,
    pub uri: String,
    pub version: Version,
    pub remote: Option<SocketAddr>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestLine {
    fn capture(request: &Request) -> Self {
        let headers = request.headers();
        Self {
            method: request.method().clone(),
            uri: request.uri().to_string(),
            version: request.version(),
            remote: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            referrer: header_text(headers, header::REFERER),
            user_agent: header_text(headers, header::USER_AGENT),
        }
    }
}

/// Response side of an access-log entry.
#[derive(Debug, Clone)]
pub struct ResponseLine {
    pub status: StatusCode,
    pub content_length: Option<u64>,
    pub latency: Duration,
    pub finished_at: OffsetDateTime,
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn response_length<B: HttpBody>(response: &Response<B>) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Render one access-log line.
pub fn format_line(format: LogFormat, request: &RequestLine, response: &ResponseLine) -> String {
    let length = or_dash(response.content_length.map(|n| n.to_string()));

    match format {
        LogFormat::Dev => format!(
            "{} {} {} {:.3} ms - {}",
            request.method,
            request.uri,
            response.status.as_u16(),
            response.latency.as_secs_f64() * 1000.0,
            length
        ),
        LogFormat::Combined => format!(
            "{} - - [{}] \"{} {} {:?}\" {} {} \"{}\" \"{}\"",
            or_dash(request.remote.map(|addr| addr.ip().to_string())),
            response
                .finished_at
                .format(CLF_DATE)
                .unwrap_or_else(|_| "-".to_string()),
            request.method,
            request.uri,
            request.version,
            response.status.as_u16(),
            length,
            or_dash(request.referrer.clone()),
            or_dash(request.user_agent.clone()),
        ),
    }
}

/// Copy the request summary onto the response for [`AccessLog`].
pub async fn tag_response(request: Request, next: Next) -> axum::response::Response {
    let line = RequestLine::capture(&request);
    let mut response = next.run(request).await;
    response.extensions_mut().insert(line);
    response
}

/// One `request` span per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessSpan;

impl<B> MakeSpan<B> for AccessSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
        )
    }
}

/// Response hook writing the access line and request metrics.
#[derive(Debug, Clone, Copy)]
pub struct AccessLog {
    format: LogFormat,
}

impl AccessLog {
    pub fn new(format: LogFormat) -> Self {
        Self { format }
    }

    /// Access line for a finished response, if it carries a request summary.
    pub fn render<B: HttpBody>(&self, response: &Response<B>, latency: Duration) -> Option<String> {
        let line = response.extensions().get::<RequestLine>()?;
        let entry = ResponseLine {
            status: response.status(),
            content_length: response_length(response),
            latency,
            finished_at: OffsetDateTime::now_utc(),
        };
        Some(format_line(self.format, line, &entry))
    }
}

impl<B: HttpBody> OnResponse<B> for AccessLog {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        if let Some(line) = self.render(response, latency) {
            info!(target: "access", "{}", line);
        }
        if let Some(request) = response.extensions().get::<RequestLine>() {
            metrics::record_http_request(&request.method, response.status(), latency);
        }
    }
}

/// Access-log trace layer: `request` span, no request event, one line per
/// response. Failures are logged by the error stage, not here.
pub type AccessTraceLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, AccessSpan, (), AccessLog, (), (), ()>;

/// Build the access-log trace layer for `format`.
pub fn trace_layer(format: LogFormat) -> AccessTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(AccessSpan)
        .on_request(())
        .on_response(AccessLog::new(format))
        .on_body_chunk(())
        .on_eos(())
        .on_failure(())
}
