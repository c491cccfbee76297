use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod blob_store;
use blob_store::FsBlobStore;

mod catalog_store;
use catalog_store::SqliteCatalogStore;

mod config;
use config::{AppConfig, CliConfig, FileConfig};

mod engine;
use engine::CatalogEngine;

mod server;
use server::{run_server, RequestsLoggingLevel, ServerConfig};

mod sqlite_persistence;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite catalog database file.
    #[clap(value_parser = parse_path)]
    pub catalog_db: Option<PathBuf>,

    /// Path to a TOML config file. Values in it override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the media directory for stored blobs. Defaults to a "media"
    /// directory next to the catalog db.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// Public base URL used when building blob retrieval URLs.
    #[clap(long)]
    pub public_base_url: Option<String>,

    /// Shared secret for the admin endpoints.
    #[clap(long, env = "ADMIN_KEY")]
    pub admin_key: Option<String>,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Maximum size per uploaded file (e.g. "10 MiB").
    #[clap(long, default_value = "10 MiB")]
    pub max_upload_size: String,

    /// Number of read connections in the catalog db pool.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,

    /// Report dependency failures with a generic message.
    #[clap(long)]
    pub production_errors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        catalog_db: cli_args.catalog_db,
        media_path: cli_args.media_path,
        port: cli_args.port,
        public_base_url: cli_args.public_base_url,
        admin_key: cli_args.admin_key,
        logging_level: cli_args.logging_level,
        max_upload_size: cli_args.max_upload_size,
        read_pool_size: cli_args.read_pool_size,
        production_errors: cli_args.production_errors,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite catalog database at {:?}...", config.catalog_db);
    let catalog_store = Arc::new(SqliteCatalogStore::new(
        &config.catalog_db,
        config.read_pool_size,
    )?);

    let blob_store = Arc::new(FsBlobStore::new(
        &config.media_path,
        &config.public_base_url,
        config.max_upload_size,
    ));
    blob_store
        .init()
        .await
        .context("Failed to initialize media directory")?;

    let engine = Arc::new(CatalogEngine::new(
        catalog_store.clone(),
        blob_store.clone(),
    ));

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level,
        port: config.port,
        admin_key: config.admin_key,
        max_file_size: config.max_upload_size,
        production_errors: config.production_errors,
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(server_config, engine, catalog_store, config.media_path).await
}
