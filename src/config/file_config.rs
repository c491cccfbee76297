use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub catalog_db: Option<String>,
    pub media_path: Option<String>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub admin_key: Option<String>,
    pub logging_level: Option<String>,
    pub max_upload_size: Option<String>,
    pub read_pool_size: Option<usize>,
    pub production_errors: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
