//! Client side of the API: a typed wrapper over `reqwest`.

pub mod api;

pub use api::{ApiClient, RequestOptions, DEV_API_BASE_URL};
