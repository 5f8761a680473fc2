//! OpenAPI document for the JSON API.

use axum::extract::State;
use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};

use crate::models::{ErrorBody, HealthStatus, NewUser, ProtectedData, User};

use super::handlers::{self, AppState};

/// Path at which the document is served outside production.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "spa-starter API"),
    paths(
        handlers::health,
        handlers::list_users,
        handlers::create_user,
        handlers::protected
    ),
    components(schemas(User, NewUser, HealthStatus, ProtectedData, ErrorBody)),
    modifiers(&BearerScheme)
)]
pub struct ApiDoc;

struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// The API document with the configured base path as its server.
pub fn document(api_base: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(api_base)]);
    doc
}

/// Serve the OpenAPI document.
pub async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(document(&state.config.api_base_url))
}
