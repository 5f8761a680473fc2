//! Typed client for the JSON API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::error::ClientError;
use crate::models::{HealthStatus, NewUser, ProtectedData, User};

/// API base used by a development build (API server on port 3001).
pub const DEV_API_BASE_URL: &str = "http://localhost:3001/api/v1";

/// API base path used by a production build, relative to the page origin.
pub const PROD_API_BASE_PATH: &str = "/api/v1";

/// Options for a single request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method (default GET).
    pub method: Method,
    /// Extra headers; these win over the defaults.
    pub headers: HeaderMap,
    /// Raw request body.
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Default `Content-Type: application/json` merged with caller headers.
pub fn merge_headers(extra: HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.extend(extra);
    headers
}

/// Stateless client for the JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL every endpoint is appended to.
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Client for a development build.
    pub fn development() -> Result<Self, ClientError> {
        Self::new(DEV_API_BASE_URL)
    }

    /// Client for a production build served from `origin`.
    pub fn production(origin: &str) -> Result<Self, ClientError> {
        Self::new(format!("{}{}", origin.trim_end_matches('/'), PROD_API_BASE_PATH))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and decode the JSON response.
    ///
    /// Any non-2xx status is an error carrying the status code. Failures are
    /// logged and returned; nothing is retried.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let result = self.send(endpoint, options).await;
        if let Err(e) = &result {
            error!("API request failed: {}", e);
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "Sending API request");

        let mut request = self
            .http
            .request(options.method, &url)
            .headers(merge_headers(options.headers));
        if let Some(body) = options.body {
            request = request.body(body);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(ClientError::Decode)
    }

    /// Health check.
    pub async fn health_check(&self) -> Result<HealthStatus, ClientError> {
        self.request("/health", RequestOptions::default()).await
    }

    /// List users.
    pub async fn get_users(&self) -> Result<Vec<User>, ClientError> {
        self.request("/users", RequestOptions::default()).await
    }

    /// Create a user.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, ClientError> {
        let body = serde_json::to_string(user)?;
        self.request(
            "/users",
            RequestOptions {
                method: Method::POST,
                body: Some(body),
                ..RequestOptions::default()
            },
        )
        .await
    }

    /// Fetch the protected example data with a bearer token.
    pub async fn get_protected_data(&self, token: &str) -> Result<ProtectedData, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);

        self.request(
            "/protected",
            RequestOptions {
                headers,
                ..RequestOptions::default()
            },
        )
        .await
    }
}
