//! Blob storage for binary media assets.
//!
//! The engine only sees the `BlobStore` contract: hand over a payload, get a
//! stable retrieval URL back (or an error). Payload type detection and naming
//! are internal to the adapter. The engine never retries on its own.

mod fs_store;

pub use fs_store::FsBlobStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by blob storage adapters.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty payload")]
    EmptyPayload,

    #[error("payload too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("unsupported payload type: {0}")]
    Unsupported(String),
}

/// A binary payload handed to the adapter: the original filename plus bytes.
#[derive(Clone, Debug)]
pub struct BlobPayload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl BlobPayload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Contract: `upload(payload) -> URL | BlobError`.
///
/// Implementations must be safe to retry at the caller's discretion: handing
/// over the same payload twice yields the same URL with no side effects
/// beyond the first upload.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, payload: &BlobPayload) -> Result<String, BlobError>;
}
