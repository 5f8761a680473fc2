//! Wire types shared by the API server and the API client.
//!
//! Everything here is transient: built per request, serialized, dropped.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user as returned by the users endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Numeric identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Creation time (ISO-8601), only set on freshly created users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl User {
    /// The two fixed example users served by `GET {base}/users`.
    pub fn examples() -> Vec<User> {
        vec![
            User {
                id: 1,
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
                created_at: None,
            },
            User {
                id: 2,
                name: "Jane Smith".to_string(),
                email: "jane@example.com".to_string(),
                created_at: None,
            },
        ]
    }
}

/// Payload for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    /// Always "OK".
    pub status: String,
    /// Time the response was produced.
    pub timestamp: String,
    /// Runtime environment name, omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Server version.
    pub version: String,
}

/// Protected endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProtectedData {
    pub message: String,
    pub timestamp: String,
}

/// Banner returned at `/` outside production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevBanner {
    pub message: String,
    pub api_base: String,
    pub frontend: String,
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human readable error message.
    pub error: String,
    /// Cause chain, only present outside production.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorBody {
    /// Error body without a stack.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            stack: None,
        }
    }
}
