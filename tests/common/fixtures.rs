//! Test fixtures: isolated temp catalog database and media directory

use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temp directory holding an (initially empty) catalog db path and
/// a media directory. The store creates the schema on first open.
pub fn create_test_catalog_dirs() -> std::io::Result<(TempDir, PathBuf, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("catalog.db");
    let media_path = temp_dir.path().join("media");
    std::fs::create_dir_all(&media_path)?;
    Ok((temp_dir, db_path, media_path))
}
