//! HTTP API handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::Config;
use crate::frontend::build::DEV_FRONTEND_URL;
use crate::models::{DevBanner, ErrorBody, HealthStatus, NewUser, ProtectedData, User};
use crate::utils::{iso_timestamp, unix_millis};

use super::error::ApiError;
use super::extract::Payload;

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Immutable process configuration.
    pub config: Arc<Config>,
    /// Source of user ids.
    pub user_ids: Arc<UserIdSequence>,
}

impl AppState {
    /// Create new app state.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            user_ids: Arc::new(UserIdSequence::default()),
        }
    }
}

/// Millisecond-timestamp user ids, strictly increasing within the process.
///
/// Two requests in the same millisecond get consecutive ids instead of the
/// same one.
#[derive(Debug, Default)]
pub struct UserIdSequence {
    last: AtomicU64,
}

impl UserIdSequence {
    /// Next id for a user created at `now_ms`.
    pub fn next(&self, now_ms: u64) -> u64 {
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now_ms.max(prev.saturating_add(1)))
            })
            .unwrap_or_else(|prev| prev);
        now_ms.max(prev.saturating_add(1))
    }
}

/// Body of `POST {base}/users`.
///
/// Kept as a raw JSON value: fields are looked up by key, so a wrong type or a
/// body that is not an object reads as "missing" instead of failing to decode.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct CreateUserRequest(Value);

impl CreateUserRequest {
    /// Both fields as non-empty strings, or `MissingFields`.
    pub fn into_new_user(self) -> Result<NewUser, ApiError> {
        match (self.text("name"), self.text("email")) {
            (Some(name), Some(email)) => Ok(NewUser {
                name: name.to_string(),
                email: email.to_string(),
            }),
            _ => Err(ApiError::MissingFields),
        }
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.0
            .as_object()?
            .get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }
}

/// Extract the bearer token, if the header has the `Bearer ` prefix.
///
/// The token itself is never checked.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn now_iso() -> Result<String, ApiError> {
    Ok(iso_timestamp(OffsetDateTime::now_utc()).context("failed to format timestamp")?)
}

/// Health check handler - always returns 200.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    Ok(Json(HealthStatus {
        status: "OK".to_string(),
        timestamp: now_iso()?,
        environment: state.config.environment().map(str::to_string),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// List the example users.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "Example users", body = [User]))
)]
pub async fn list_users() -> Json<Vec<User>> {
    Json(User::examples())
}

/// Simulate user creation. Nothing is stored.
#[utoipa::path(
    post,
    path = "/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Name or email missing", body = ErrorBody)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Payload(request): Payload<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let new_user = request.into_new_user()?;

    let now = OffsetDateTime::now_utc();
    let user = User {
        id: state.user_ids.next(unix_millis(now)),
        name: new_user.name,
        email: new_user.email,
        created_at: Some(iso_timestamp(now).context("failed to format timestamp")?),
    };

    debug!(id = user.id, "Created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Example protected route: requires a `Bearer` authorization header.
#[utoipa::path(
    get,
    path = "/protected",
    responses(
        (status = 200, description = "Protected data", body = ProtectedData),
        (status = 401, description = "Missing bearer token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn protected(headers: HeaderMap) -> Result<Json<ProtectedData>, ApiError> {
    if bearer_token(&headers).is_none() {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(ProtectedData {
        message: "This is protected data".to_string(),
        timestamp: now_iso()?,
    }))
}

/// Banner served at `/` outside production.
pub async fn dev_banner(State(state): State<AppState>) -> Json<DevBanner> {
    Json(DevBanner {
        message: "Development server running".to_string(),
        api_base: state.config.api_base_url.clone(),
        frontend: DEV_FRONTEND_URL.to_string(),
    })
}

/// Fallback for unmatched paths under the API base.
pub async fn api_not_found() -> ApiError {
    ApiError::NotFound
}
