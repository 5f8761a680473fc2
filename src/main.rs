//! SPA starter entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spa_starter::client::{ApiClient, DEV_API_BASE_URL};
use spa_starter::config::Config;
use spa_starter::error::AppError;
use spa_starter::frontend::{run_dev_server, BuildConfig};
use spa_starter::{metrics, server};

/// JSON API server and SPA host.
#[derive(Parser, Debug)]
#[command(name = "spa-starter")]
#[command(about = "JSON API server with a single-page application frontend")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the API server (default).
    Serve {
        /// Listen port; overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Run the frontend dev server with the API proxy.
    Dev {
        /// Dev server port.
        #[arg(short, long)]
        port: Option<u16>,

        /// Upstream for proxied API requests.
        #[arg(long)]
        target: Option<String>,
    },

    /// Call every API endpoint through the typed client (diagnostic).
    Probe {
        /// API base URL.
        #[arg(long, default_value = DEV_API_BASE_URL)]
        base_url: String,

        /// Bearer token for the protected endpoint.
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Production logs are JSON lines; the filter comes from RUST_LOG
    let config = Config::load().unwrap_or_default();
    let production = config.is_production();
    let filter = EnvFilter::try_new(config.log_directive(args.verbose))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(production.then(|| fmt::layer().json()))
        .with((!production).then(|| fmt::layer()))
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::Serve { port }) => cmd_serve(port).await,
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Dev { port, target }) => cmd_dev(port, target).await,
        Some(Command::Probe { base_url, token }) => cmd_probe(base_url, token).await,
        None => cmd_serve(None).await,
    }
}

/// Run the API server.
async fn cmd_serve(port: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(AppError::from)?;
    if let Some(port) = port {
        config.port = port;
    }
    config.validate().map_err(AppError::InvalidConfig)?;

    if let Some(metrics_port) = config.metrics_port {
        metrics::install_exporter(metrics_port)?;
    }
    metrics::init_metrics();

    server::run(Arc::new(config)).await?;
    Ok(())
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SPA STARTER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Port: {}", config.port);
    println!("  Environment: {}", config.environment().unwrap_or("(unset)"));
    println!("  Production: {}", config.is_production());
    println!("  CORS Origin: {}", config.cors_origin);
    println!("  API Base: {}", config.api_base_url);
    println!("  Body Limit: {} bytes", config.body_limit_bytes);
    println!("  Log Filter: {}", config.rust_log);
    if config.is_production() {
        let index = config.index_document();
        println!("  Static Dir: {}", config.static_dir.display());
        if !index.is_file() {
            println!("  WARNING: {} not found; SPA fallback will 404", index.display());
        }
    }
    match config.metrics_port {
        Some(port) => println!("  Metrics: port {}", port),
        None => println!("  Metrics: Disabled"),
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run the frontend dev server.
async fn cmd_dev(port: Option<u16>, target: Option<String>) -> anyhow::Result<()> {
    let mut build = BuildConfig::default();
    if let Some(port) = port {
        build.dev_server.port = port;
    }
    if let Some(target) = target {
        for rule in &mut build.dev_server.proxy {
            rule.target = target.clone();
        }
    }

    run_dev_server(build).await?;
    Ok(())
}

/// Call every endpoint through the typed client.
async fn cmd_probe(base_url: String, token: Option<String>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SPA STARTER - API PROBE");
    println!("======================================================================");

    let client = ApiClient::new(base_url)?;
    println!("Base URL: {}", client.base_url());
    println!("----------------------------------------------------------------------");

    print!("GET /health... ");
    let health = client.health_check().await;
    match &health {
        Ok(h) => println!("OK ({} at {})", h.status, h.timestamp),
        Err(e) => println!("FAILED: {}", e),
    }

    print!("GET /users... ");
    match client.get_users().await {
        Ok(users) => {
            println!("OK ({} users)", users.len());
            for user in &users {
                println!("  #{} {} <{}>", user.id, user.name, user.email);
            }
        }
        Err(e) => println!("FAILED: {}", e),
    }

    match token {
        Some(token) => {
            print!("GET /protected... ");
            match client.get_protected_data(&token).await {
                Ok(data) => println!("OK ({})", data.message),
                Err(e) => println!("FAILED: {}", e),
            }
        }
        None => println!("GET /protected... SKIPPED (no --token)"),
    }

    println!("======================================================================");

    health?;
    Ok(())
}
