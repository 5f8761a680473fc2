//! API error type and the final error-handling stage.
//!
//! Handlers return [`ApiError`]. Internal failures and panics both turn into
//! `500` responses carrying an [`InternalFault`] in their extensions; the
//! [`map_internal_errors`] stage is the single place that logs them and, in
//! production, strips the detail from the body.

use std::any::Any;

use anyhow::anyhow;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use thiserror::Error;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tracing::error;

use crate::models::ErrorBody;

/// Body message of every `500` served in production.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors a handler can return.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required field of the request body is missing or empty.
    #[error("Name and email are required")]
    MissingFields,

    /// Missing or malformed bearer authorization header.
    #[error("Unauthorized")]
    Unauthorized,

    /// No API route matches the request.
    #[error("API endpoint not found")]
    NotFound,

    /// The request body exceeds the configured limit.
    #[error("{message}")]
    Payload {
        /// Status chosen by the body decoder (`413`).
        status: StatusCode,
        /// Decoder message.
        message: String,
    },

    /// Anything else.
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Payload { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body decoder rejections: an over-limit body keeps its `413`, anything else
/// is an internal failure.
fn from_rejection(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Payload { status, message }
    } else {
        ApiError::Internal(anyhow!(message))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal(err) => InternalFault {
                message: err.to_string(),
                stack: format!("{err:?}"),
            }
            .into_response(),
            other => (other.status(), Json(ErrorBody::new(other.to_string()))).into_response(),
        }
    }
}

/// Detail of an internal failure, attached to the `500` response it produced.
#[derive(Debug, Clone)]
pub struct InternalFault {
    /// Top-level message.
    pub message: String,
    /// Full cause chain.
    pub stack: String,
}

impl IntoResponse for InternalFault {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message.clone(),
            stack: Some(self.stack.clone()),
        };
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Turns a handler panic into an [`InternalFault`] response.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicResponder;

impl ResponseForPanic for PanicResponder {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response {
        let message = panic_message(err.as_ref());
        InternalFault {
            stack: format!("handler panicked: {message}"),
            message,
        }
        .into_response()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    }
}

/// Final error stage: logs internal faults and redacts them in production.
pub async fn map_internal_errors(
    State(production): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let Some(fault) = response.extensions().get::<InternalFault>() else {
        return response;
    };

    error!(%method, %uri, stack = %fault.stack, "Error: {}", fault.message);

    if production {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(INTERNAL_ERROR_MESSAGE)),
        )
            .into_response();
    }

    response
}

/// Wrap a router with the panic catcher and the final error stage.
pub fn with_error_handling(router: Router, production: bool) -> Router {
    router
        .layer(CatchPanicLayer::custom(PanicResponder))
        .layer(middleware::from_fn_with_state(production, map_internal_errors))
}
