//! Single-page application starter: JSON API server, typed API client and
//! frontend bundle/dev-server configuration.
//!
//! # Request pipeline
//!
//! Every request passes the same fixed stages before routing:
//!
//! ```text
//! security-headers -> cors -> compression -> access-log -> body-limit -> router
//! ```
//!
//! Unmatched paths under the API base get a JSON 404. In production every
//! other unmatched path is served from the static bundle, falling back to
//! `index.html`.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Startup and client error types
//! - [`models`]: JSON bodies shared by server and client
//! - [`middleware`]: Ordered middleware pipeline
//! - [`api`]: Routes, handlers and error mapping
//! - [`client`]: Typed API client
//! - [`frontend`]: Bundle layout and dev server
//! - [`server`]: Server lifecycle
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod frontend;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod server;
pub mod utils;

pub use config::Config;
pub use error::{AppError, ClientError, Result};
