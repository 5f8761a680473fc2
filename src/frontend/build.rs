//! Frontend bundle layout and dev-server settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// URL of the frontend dev server.
pub const DEV_FRONTEND_URL: &str = "http://localhost:5173";

/// Name of the chunk holding modules that belong to no manual chunk group.
pub const ENTRY_CHUNK: &str = "index";

/// A named group of modules bundled into one output chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkGroup {
    /// Output chunk name.
    pub name: String,
    /// Package names bundled into this chunk.
    pub modules: Vec<String>,
}

/// Forward requests under `prefix` to `target` during development.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRule {
    /// Path prefix to match (plain string prefix).
    pub prefix: String,
    /// Upstream origin, e.g. `http://localhost:3001`.
    pub target: String,
    /// Rewrite the `Host` header to the target's authority.
    pub change_origin: bool,
}

/// Dev server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServerConfig {
    pub port: u16,
    pub proxy: Vec<ProxyRule>,
}

/// How the frontend is bundled and served during development.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Public base path of the bundle.
    pub base: String,
    /// Output directory of the bundle.
    pub out_dir: PathBuf,
    /// Directory for hashed assets, relative to `out_dir`.
    pub assets_dir: String,
    /// Whether source maps are emitted.
    pub sourcemap: bool,
    /// Manual chunk groups.
    pub chunks: Vec<ChunkGroup>,
    /// Dev server settings.
    pub dev_server: DevServerConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            out_dir: PathBuf::from("dist"),
            assets_dir: "assets".to_string(),
            sourcemap: false,
            chunks: vec![
                ChunkGroup {
                    name: "vendor".to_string(),
                    modules: vec!["react".to_string(), "react-dom".to_string()],
                },
                ChunkGroup {
                    name: "router".to_string(),
                    modules: vec!["react-router-dom".to_string()],
                },
            ],
            dev_server: DevServerConfig {
                port: 5173,
                proxy: vec![ProxyRule {
                    prefix: "/api".to_string(),
                    target: "http://localhost:3001".to_string(),
                    change_origin: true,
                }],
            },
        }
    }
}

impl BuildConfig {
    /// Chunk a module is bundled into.
    ///
    /// Deep imports (`react-dom/client`) belong to their package's chunk.
    pub fn chunk_for(&self, module: &str) -> &str {
        let package = package_name(module);
        self.chunks
            .iter()
            .find(|group| group.modules.iter().any(|m| m == package))
            .map(|group| group.name.as_str())
            .unwrap_or(ENTRY_CHUNK)
    }

    /// First proxy rule whose prefix the request path starts with.
    pub fn proxy_for(&self, path: &str) -> Option<&ProxyRule> {
        self.dev_server
            .proxy
            .iter()
            .find(|rule| path.starts_with(&rule.prefix))
    }

    /// Directory holding hashed assets.
    pub fn asset_dir(&self) -> PathBuf {
        self.out_dir.join(&self.assets_dir)
    }

    /// Entry document of the bundle.
    pub fn index_document(&self) -> PathBuf {
        self.out_dir.join("index.html")
    }
}

/// Package part of a module specifier (`@scope/pkg/sub` -> `@scope/pkg`).
fn package_name(module: &str) -> &str {
    let mut boundaries = module.match_indices('/').map(|(i, _)| i);
    let end = if module.starts_with('@') {
        boundaries.nth(1)
    } else {
        boundaries.next()
    };
    match end {
        Some(i) => &module[..i],
        None => module,
    }
}
