//! ecowatch-api - Mangrove report analysis microservice
//!
//! Accepts citizen reports (photo, coordinates, category, description),
//! has a generative model verify and score them, and stores the results.

use anyhow::{Context, Result};
use clap::Parser;
use ecowatch_api::ai::GeminiClient;
use ecowatch_api::analysis::ReportAnalyzer;
use ecowatch_api::store::{FsImageStore, SqliteReportStore};
use ecowatch_api::{build_router, AppState};
use ecowatch_common::config::{self, ConfigOverrides, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ecowatch-api
#[derive(Parser, Debug)]
#[command(name = "ecowatch-api")]
#[command(about = "Mangrove report analysis microservice")]
#[command(version)]
struct Args {
    /// TOML configuration file (default: <config dir>/ecowatch/ecowatch.toml)
    #[arg(short, long, env = "ECOWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database and stored images
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolved before the subscriber exists, since it sets the log level;
    // the load outcome is logged below once tracing is installed
    let loaded = config::load_config_file(args.config.as_deref())
        .context("Failed to load configuration file")?;
    let overrides = ConfigOverrides {
        root_folder: args.root_folder,
        bind_address: args.bind_address,
        port: args.port,
        log_level: args.log_level,
    };
    let config = ServiceConfig::resolve(&overrides, loaded.toml)?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("ecowatch_api={0},ecowatch_common={0},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting EcoWatch Analysis API (ecowatch-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    loaded.source.log();

    config
        .ensure_directories()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", config.root_folder.display());

    let db_path = config.database_path();
    let pool = ecowatch_api::db::init_database_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    let gemini = GeminiClient::new(&config.gemini).context("Failed to build Gemini client")?;
    if gemini.has_api_key() {
        info!(model = %config.gemini.model, "Gemini client ready");
    } else {
        warn!(
            "{} not configured; every analysis will return an error until it is set",
            config::ENV_API_KEY
        );
    }
    if config.gemini.request_timeout.is_none() {
        warn!("No Gemini request timeout configured; a stalled call blocks its request");
    }

    let state = AppState::new(
        Arc::new(ReportAnalyzer::new(Arc::new(gemini))),
        Arc::new(SqliteReportStore::new(pool)),
        Arc::new(FsImageStore::new(config.images_dir())),
    )
    .with_upload_limit(config.max_upload_bytes);

    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
