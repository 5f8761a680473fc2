//! Security response headers.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// Content security policy sent with every response.
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self';\
base-uri 'self';\
font-src 'self' https: data:;\
form-action 'self';\
frame-ancestors 'self';\
img-src 'self' data: https:;\
object-src 'none';\
script-src 'self';\
script-src-attr 'none';\
style-src 'self' 'unsafe-inline';\
upgrade-insecure-requests";

/// Headers set on every response. `cross-origin-embedder-policy` is
/// deliberately absent.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Add [`SECURITY_HEADERS`] to the response, replacing any existing values.
pub async fn set_security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(*name), HeaderValue::from_static(*value));
    }

    response
}
