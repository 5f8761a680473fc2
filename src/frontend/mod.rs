//! Frontend bundle configuration and the development server.

pub mod build;
pub mod dev_proxy;

pub use build::{BuildConfig, ChunkGroup, DevServerConfig, ProxyRule};
pub use dev_proxy::{dev_router, run_dev_server};
