//! Filesystem blob store.
//!
//! Blobs land in a local media directory under a content-addressed name and
//! are served back via the static `/media` route. Content addressing is what
//! makes retried uploads idempotent: same bytes, same name, same URL.

use super::{BlobError, BlobPayload, BlobStore};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Hex chars of the sha256 digest used in blob filenames.
const BLOB_NAME_LEN: usize = 32;

pub struct FsBlobStore {
    media_dir: PathBuf,
    public_base_url: String,
    max_payload_size: u64,
}

impl FsBlobStore {
    pub fn new(
        media_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        max_payload_size: u64,
    ) -> Self {
        Self {
            media_dir: media_dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_payload_size,
        }
    }

    /// Create the media directory if it does not exist yet.
    pub async fn init(&self) -> Result<(), BlobError> {
        fs::create_dir_all(&self.media_dir).await?;
        Ok(())
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    fn blob_name(&self, payload: &BlobPayload) -> Result<String, BlobError> {
        let digest = Sha256::digest(&payload.bytes);
        let mut name = String::with_capacity(BLOB_NAME_LEN + 8);
        for byte in digest.iter().take(BLOB_NAME_LEN / 2) {
            name.push_str(&format!("{:02x}", byte));
        }

        // Sniff the payload type from its magic bytes, falling back to the
        // original filename's extension.
        let extension = infer::get(&payload.bytes)
            .map(|kind| kind.extension().to_string())
            .or_else(|| {
                Path::new(&payload.filename)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase())
            })
            .ok_or_else(|| BlobError::Unsupported(payload.filename.clone()))?;

        Ok(format!("{}.{}", name, extension))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, payload: &BlobPayload) -> Result<String, BlobError> {
        if payload.bytes.is_empty() {
            return Err(BlobError::EmptyPayload);
        }
        let size = payload.bytes.len() as u64;
        if size > self.max_payload_size {
            return Err(BlobError::TooLarge {
                size,
                max: self.max_payload_size,
            });
        }

        let name = self.blob_name(payload)?;
        let target = self.media_dir.join(&name);

        if !fs::try_exists(&target).await? {
            // Write to a temp sibling first so a crashed upload never leaves
            // a half-written blob at the served path.
            let tmp = self.media_dir.join(format!(".{}.part", name));
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&payload.bytes).await?;
            file.flush().await?;
            fs::rename(&tmp, &target).await?;
            debug!("Stored blob {} ({} bytes)", name, size);
        }

        Ok(format!("{}/media/{}", self.public_base_url, name))
    }
}
