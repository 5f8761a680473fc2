//! HTTP API module: routes, handlers, errors and the OpenAPI document.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod routes;

pub use error::ApiError;
pub use handlers::AppState;
pub use routes::{create_router, App};
