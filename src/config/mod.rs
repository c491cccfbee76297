mod file_config;

pub use file_config::FileConfig;

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use byte_unit::Byte;
use std::path::PathBuf;

/// CLI arguments that can be overridden by the TOML config file.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub catalog_db: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
    pub port: u16,
    pub public_base_url: Option<String>,
    pub admin_key: Option<String>,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_size: String,
    pub read_pool_size: usize,
    pub production_errors: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_db: PathBuf,
    pub media_path: PathBuf,
    pub port: u16,
    pub public_base_url: String,
    pub admin_key: String,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_size: u64,
    pub read_pool_size: usize,
    pub production_errors: bool,
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    match s.to_lowercase().as_str() {
        "none" => Some(RequestsLoggingLevel::None),
        "path" => Some(RequestsLoggingLevel::Path),
        "headers" => Some(RequestsLoggingLevel::Headers),
        _ => None,
    }
}

fn parse_size(s: &str) -> Result<u64> {
    let byte = Byte::parse_str(s, true)
        .map_err(|e| anyhow::anyhow!("Invalid size '{}': {}", s, e))?;
    Ok(byte.as_u64())
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let catalog_db = file
            .catalog_db
            .map(PathBuf::from)
            .or_else(|| cli.catalog_db.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("catalog_db must be specified on the CLI or in the config file")
            })?;

        // Default the media path next to the catalog db
        let media_path = file
            .media_path
            .map(PathBuf::from)
            .or_else(|| cli.media_path.clone())
            .unwrap_or_else(|| {
                catalog_db
                    .parent()
                    .map(|p| p.join("media"))
                    .unwrap_or_else(|| PathBuf::from("media"))
            });

        let port = file.port.unwrap_or(cli.port);

        let public_base_url = file
            .public_base_url
            .or_else(|| cli.public_base_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let admin_key = file
            .admin_key
            .or_else(|| cli.admin_key.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("admin_key must be specified on the CLI or in the config file")
            })?;
        if admin_key.is_empty() {
            bail!("admin_key must not be empty");
        }

        let logging_level = match file.logging_level {
            Some(s) => parse_logging_level(&s)
                .ok_or_else(|| anyhow::anyhow!("Invalid logging_level in config file: {}", s))?,
            None => cli.logging_level.clone(),
        };

        let max_upload_size = parse_size(
            file.max_upload_size
                .as_deref()
                .unwrap_or(&cli.max_upload_size),
        )?;
        if max_upload_size == 0 {
            bail!("max_upload_size must be greater than zero");
        }

        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size);
        if read_pool_size == 0 {
            bail!("read_pool_size must be greater than zero");
        }

        let production_errors = file.production_errors.unwrap_or(cli.production_errors);

        Ok(AppConfig {
            catalog_db,
            media_path,
            port,
            public_base_url,
            admin_key,
            logging_level,
            max_upload_size,
            read_pool_size,
            production_errors,
        })
    }
}
