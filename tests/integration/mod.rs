//! Integration tests for the API server, the typed client and the dev proxy.
//!
//! Each test binds a real server on an ephemeral localhost port and talks to
//! it over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tower::ServiceExt;

use spa_starter::api::{create_router, AppState};
use spa_starter::client::ApiClient;
use spa_starter::config::Config;
use spa_starter::error::ClientError;
use spa_starter::frontend::{dev_router, BuildConfig};
use spa_starter::models::{NewUser, User};

/// Spawn the full application on 127.0.0.1 and return its address.
async fn spawn_server(config: Config) -> SocketAddr {
    let app = create_router(AppState::new(Arc::new(config))).expect("router");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(
            listener,
            axum::ServiceExt::<axum::extract::Request>::into_make_service_with_connect_info::<
                SocketAddr,
            >(app),
        )
        .await
        .expect("server");
    });

    addr
}

fn client_for(addr: SocketAddr) -> ApiClient {
    ApiClient::new(format!("http://{}/api/v1", addr)).expect("client")
}

#[tokio::test]
async fn test_health_check() {
    let addr = spawn_server(Config::default()).await;

    let health = client_for(addr).health_check().await.expect("health");

    assert_eq!(health.status, "OK");
    assert!(health.timestamp.ends_with('Z'), "timestamp: {}", health.timestamp);
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_get_users() {
    let addr = spawn_server(Config::default()).await;

    let users = client_for(addr).get_users().await.expect("users");

    assert_eq!(users, User::examples());
}

#[tokio::test]
async fn test_create_user() {
    let addr = spawn_server(Config::default()).await;
    let client = client_for(addr);

    let new_user = NewUser {
        name: "Carol".to_string(),
        email: "carol@example.com".to_string(),
    };
    let first = client.create_user(&new_user).await.expect("create");
    let second = client.create_user(&new_user).await.expect("create");

    assert_eq!(first.name, "Carol");
    assert_eq!(first.email, "carol@example.com");
    assert!(first.created_at.is_some());
    assert!(second.id > first.id);
}

#[tokio::test]
async fn test_protected_requires_token() {
    let addr = spawn_server(Config::default()).await;
    let client = client_for(addr);

    let err = client
        .request::<serde_json::Value>("/protected", Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));

    let data = client.get_protected_data("secret").await.expect("protected");
    assert_eq!(data.message, "This is protected data");
}

#[tokio::test]
async fn test_unknown_endpoint_is_status_error() {
    let addr = spawn_server(Config::default()).await;

    let err = client_for(addr)
        .request::<serde_json::Value>("/nope", Default::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 404 }));
    assert_eq!(err.to_string(), "HTTP error! status: 404");
}

#[tokio::test]
async fn test_production_serves_spa_bundle() {
    let dist = tempfile::tempdir().expect("tempdir");
    std::fs::write(dist.path().join("index.html"), "<div id=\"root\"></div>").expect("write");

    let config = Config {
        node_env: Some("production".to_string()),
        static_dir: dist.path().to_path_buf(),
        ..Config::default()
    };
    let addr = spawn_server(config).await;

    let response = reqwest::get(format!("http://{}/settings/profile", addr))
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.expect("body"), "<div id=\"root\"></div>");

    let response = reqwest::get(format!("http://{}/api/v1/", addr))
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body, serde_json::json!({ "error": "API endpoint not found" }));

    let health = client_for(addr).health_check().await.expect("health");
    assert_eq!(health.environment.as_deref(), Some("production"));
}

#[tokio::test]
async fn test_dev_proxy_forwards_to_api() {
    let addr = spawn_server(Config::default()).await;

    let dist = tempfile::tempdir().expect("tempdir");
    std::fs::write(dist.path().join("index.html"), "<html></html>").expect("write");

    let mut build = BuildConfig {
        out_dir: dist.path().to_path_buf(),
        ..BuildConfig::default()
    };
    build.dev_server.proxy[0].target = format!("http://{}", addr);
    let app = dev_router(build).expect("dev router");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("content-security-policy"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let users: Vec<User> = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(users.len(), 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Dana","email":"dana@example.com"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/protected")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
