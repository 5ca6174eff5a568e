//! # Local image host
//!
//! Filesystem implementation of `ImageHost`.
//! Content-addressable storage with directory sharding: the same bytes
//! always land on the same path, so duplicate uploads are free.

use std::path::PathBuf;

use async_trait::async_trait;
use domains::{AppError, ImageHost, ImageUpload, Result};
use sha2::{Digest, Sha256};
use tokio::fs;

/// Default upload ceiling (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub struct LocalImageHost {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
    max_bytes: usize,
}

impl LocalImageHost {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>, max_bytes: usize) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self { root_path: root, url_prefix, max_bytes }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root_path
    }

    /// "ab/cd/abcdef....png"
    fn relative_path(hash: &str, extension: &str) -> String {
        format!("{}/{}/{}.{}", &hash[0..2], &hash[2..4], hash, extension)
    }
}

#[async_trait]
impl ImageHost for LocalImageHost {
    async fn upload(&self, upload: ImageUpload) -> Result<String> {
        // 1. Reject what we will not store
        if upload.bytes.is_empty() {
            return Err(AppError::validation("Uploaded file is empty."));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AppError::validation(format!(
                "Image exceeds the {} byte limit.",
                self.max_bytes
            )));
        }
        if upload.content_type.type_() != mime::IMAGE {
            return Err(AppError::validation("Only image uploads are accepted."));
        }
        let format = image::guess_format(&upload.bytes)
            .map_err(|_| AppError::validation("Unsupported image format."))?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");

        // 2. Address by content
        let hash = hex::encode(Sha256::digest(&upload.bytes));
        let relative = Self::relative_path(&hash, extension);
        let target = self.root_path.join(&relative);

        // 3. Write once
        if !fs::try_exists(&target).await.unwrap_or(false) {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Upload(format!("create {}: {e}", parent.display())))?;
            }
            fs::write(&target, &upload.bytes)
                .await
                .map_err(|e| AppError::Upload(format!("write {}: {e}", target.display())))?;
            tracing::debug!(path = %target.display(), bytes = upload.bytes.len(), "image stored");
        }

        Ok(format!("{}/{}", self.url_prefix, relative))
    }
}
