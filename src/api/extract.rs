//! Request body extractor accepting JSON or URL-encoded forms.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderMap};
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// How a request body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/json` or any `+json` media type.
    Json,
    /// `application/x-www-form-urlencoded`.
    Form,
    /// Anything else, including no body at all.
    Other,
}

impl BodyKind {
    /// Classify a request by its `Content-Type` header.
    pub fn of(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            return BodyKind::Other;
        };

        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json")) {
            BodyKind::Json
        } else if essence == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

/// Decoded request body.
///
/// Bodies of any other content type are not read and decode to
/// `T::default()`, so handlers see an empty payload rather than a rejection.
#[derive(Debug, Clone, Default)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match BodyKind::of(req.headers()) {
            BodyKind::Json => {
                let Json(value) = Json::<T>::from_request(req, state).await?;
                Ok(Payload(value))
            }
            BodyKind::Form => {
                let Form(value) = Form::<T>::from_request(req, state).await?;
                Ok(Payload(value))
            }
            BodyKind::Other => Ok(Payload(T::default())),
        }
    }
}
