//! Tuneshelf Catalog Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod blob_store;
pub mod catalog_store;
pub mod config;
pub mod engine;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use blob_store::{BlobPayload, BlobStore, FsBlobStore};
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use engine::{CatalogEngine, CatalogError};
pub use server::{run_server, RequestsLoggingLevel};
