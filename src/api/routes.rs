//! HTTP API route definitions.

use axum::http::StatusCode;
use axum::routing::{get, get_service, MethodRouter};
use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::apply_pipeline;

use super::error::with_error_handling;
use super::handlers::{
    api_not_found, create_user, dev_banner, health, list_users, protected, AppState,
};
use super::openapi::{openapi_json, OPENAPI_PATH};

/// Routes under the API base path.
///
/// A path that matches with an unsupported method falls through to the same
/// JSON 404 as an unknown path.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health).fallback(api_not_found))
        .route(
            "/users",
            get(list_users).post(create_user).fallback(api_not_found),
        )
        .route("/protected", get(protected).fallback(api_not_found))
        .fallback(api_not_found)
}

/// The full application: a router behind trailing-slash normalization.
pub type App = NormalizePath<Router>;

/// Static bundle with `index.html` fallback for GET/HEAD; 404 otherwise.
fn spa_service(config: &Config) -> MethodRouter {
    let index = ServeFile::new(config.index_document());
    get_service(ServeDir::new(&config.static_dir).fallback(index)).fallback(static_not_found)
}

async fn static_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Create the application: routes, fallbacks, error handling and the full
/// middleware pipeline.
///
/// Trailing slashes are trimmed before routing, so `{base}/health/` is the
/// health route and `{base}/` is the API 404.
pub fn create_router(state: AppState) -> Result<App, AppError> {
    let config = state.config.clone();

    let router = Router::new().nest(&config.api_base_url, api_router());

    let router = if config.is_production() {
        router.fallback_service(spa_service(&config))
    } else {
        router
            .route("/", get(dev_banner))
            .route(OPENAPI_PATH, get(openapi_json))
    };

    let router = with_error_handling(router.with_state(state), config.is_production());

    let router = apply_pipeline(router, &config)?;

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with(config: Config) -> App {
        create_router(AppState::new(Arc::new(config))).unwrap()
    }

    fn app() -> App {
        app_with(Config::default())
    }

    async fn send(app: App, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn protected_req(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/v1/protected");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (status, body) = send(app(), get_req("/api/v1/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(body.get("environment").is_none());
    }

    #[tokio::test]
    async fn health_reports_environment() {
        let config = Config {
            node_env: Some("development".to_string()),
            ..Config::default()
        };
        let (_, body) = send(app_with(config), get_req("/api/v1/health")).await;

        assert_eq!(body["environment"], "development");
    }

    #[tokio::test]
    async fn users_endpoint_returns_fixed_list() {
        let (status, body) = send(app(), get_req("/api/v1/users")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "id": 1, "name": "John Doe", "email": "john@example.com" },
                { "id": 2, "name": "Jane Smith", "email": "jane@example.com" }
            ])
        );
    }

    #[tokio::test]
    async fn create_user_echoes_input_with_id_and_timestamp() {
        let (status, body) = send(
            app(),
            post_json("/api/v1/users", json!({ "name": "Ada", "email": "ada@x.com" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Ada");
        assert_eq!(body["email"], "ada@x.com");
        assert!(body["id"].is_u64());
        let created_at = body["createdAt"].as_str().unwrap();
        assert!(time::OffsetDateTime::parse(
            created_at,
            &time::format_description::well_known::Rfc3339
        )
        .is_ok());
    }

    #[tokio::test]
    async fn create_user_accepts_form_bodies() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Grace&email=grace%40x.com"))
            .unwrap();

        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Grace");
        assert_eq!(body["email"], "grace@x.com");
    }

    #[tokio::test]
    async fn create_user_rejects_missing_fields() {
        let bodies = [
            json!({ "name": "Ada" }),
            json!({ "email": "ada@x.com" }),
            json!({ "name": "", "email": "ada@x.com" }),
            json!({ "name": "Ada", "email": null }),
            json!({}),
        ];

        for body in bodies {
            let (status, response) = send(app(), post_json("/api/v1/users", body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(response, json!({ "error": "Name and email are required" }));
        }
    }

    #[tokio::test]
    async fn create_user_without_json_content_type_is_a_validation_error() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("name=Ada"))
            .unwrap();

        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Name and email are required" }));
    }

    fn malformed_json() -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_json_is_an_internal_error() {
        let (status, body) = send(app(), malformed_json()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("JSON"));
        assert!(body["stack"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_is_redacted_in_production() {
        let config = Config {
            node_env: Some("production".to_string()),
            ..Config::default()
        };

        let (status, body) = send(app_with(config), malformed_json()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn create_user_rejects_non_object_bodies() {
        for body in [json!(["Ada", "ada@x.com"]), json!("Ada"), json!(42), json!(null)] {
            let (status, response) = send(app(), post_json("/api/v1/users", body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(response, json!({ "error": "Name and email are required" }));
        }
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = Config {
            body_limit_bytes: 64,
            ..Config::default()
        };
        let padding = "x".repeat(256);
        let request = post_json(
            "/api/v1/users",
            json!({ "name": padding, "email": "ada@x.com" }),
        );

        let (status, body) = send(app_with(config), request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn protected_requires_bearer_prefix() {
        for authorization in [None, Some("Basic dXNlcjpwYXNz"), Some("bearer token"), Some("Token abc")] {
            let (status, body) = send(app(), protected_req(authorization)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{authorization:?}");
            assert_eq!(body, json!({ "error": "Unauthorized" }));
        }
    }

    #[tokio::test]
    async fn protected_accepts_any_bearer_token() {
        for authorization in ["Bearer anything", "Bearer not.a.valid.jwt", "Bearer "] {
            let (status, body) = send(app(), protected_req(Some(authorization))).await;
            assert_eq!(status, StatusCode::OK, "{authorization}");
            assert_eq!(body["message"], "This is protected data");
            assert!(body["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn unknown_api_paths_return_json_404() {
        let requests = [
            get_req("/api/v1/nope"),
            get_req("/api/v1/users/1"),
            get_req("/api/v1"),
            get_req("/api/v1/"),
            get_req("/api/v1/nope/"),
            Request::builder()
                .method(Method::DELETE)
                .uri("/api/v1/users")
                .body(Body::empty())
                .unwrap(),
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        ];

        for request in requests {
            let uri = request.uri().clone();
            let (status, body) = send(app(), request).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, json!({ "error": "API endpoint not found" }));
        }
    }

    #[tokio::test]
    async fn trailing_slash_reaches_the_same_route() {
        let (status, body) = send(app(), get_req("/api/v1/health/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");

        let (status, body) = send(app(), get_req("/api/v1/users/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn api_base_is_configurable() {
        let config = Config {
            api_base_url: "/backend".to_string(),
            ..Config::default()
        };

        let (status, _) = send(app_with(config.clone()), get_req("/backend/health")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app_with(config), get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn root_serves_dev_banner_outside_production() {
        let (status, body) = send(app(), get_req("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Development server running",
                "apiBase": "/api/v1",
                "frontend": "http://localhost:5173"
            })
        );
    }

    #[tokio::test]
    async fn openapi_document_is_served_outside_production() {
        let (status, body) = send(app(), get_req(OPENAPI_PATH)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/health"].is_object());
        assert_eq!(body["servers"][0]["url"], "/api/v1");
    }

    #[tokio::test]
    async fn production_serves_static_bundle_with_spa_fallback() {
        let dist = tempfile::tempdir().unwrap();
        std::fs::write(dist.path().join("index.html"), "<div id=\"root\"></div>").unwrap();
        std::fs::create_dir(dist.path().join("assets")).unwrap();
        std::fs::write(dist.path().join("assets").join("app.js"), "console.log(1)").unwrap();

        let config = Config {
            node_env: Some("production".to_string()),
            static_dir: dist.path().to_path_buf(),
            ..Config::default()
        };

        for (uri, expected) in [
            ("/assets/app.js", "console.log(1)"),
            ("/settings/profile", "<div id=\"root\"></div>"),
            ("/", "<div id=\"root\"></div>"),
        ] {
            let response = app_with(config.clone()).oneshot(get_req(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(bytes, expected.as_bytes(), "{uri}");
        }

        for uri in ["/api/v1/missing", "/api/v1/", "/api/v1"] {
            let (status, body) = send(app_with(config.clone()), get_req(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, json!({ "error": "API endpoint not found" }));
        }

        let (status, body) = send(app_with(config), get_req("/api/v1/health/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
    }

    #[tokio::test]
    async fn production_rejects_writes_to_static_paths() {
        let dist = tempfile::tempdir().unwrap();
        std::fs::write(dist.path().join("index.html"), "spa").unwrap();
        let config = Config {
            node_env: Some("production".to_string()),
            static_dir: dist.path().to_path_buf(),
            ..Config::default()
        };

        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let request = Request::builder()
                .method(method.clone())
                .uri("/foo")
                .body(Body::empty())
                .unwrap();
            let response = app_with(config.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
        }
    }

    #[tokio::test]
    async fn production_hides_dev_only_routes() {
        let dist = tempfile::tempdir().unwrap();
        std::fs::write(dist.path().join("index.html"), "spa").unwrap();
        let config = Config {
            node_env: Some("production".to_string()),
            static_dir: dist.path().to_path_buf(),
            ..Config::default()
        };

        let response = app_with(config).oneshot(get_req(OPENAPI_PATH)).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes, "spa".as_bytes());
    }
}
