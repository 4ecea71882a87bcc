//! Client-side blob URLs for custom thumbnails.
//!
//! A picked image is held in memory under a `blob:tubeflow/<uuid>` URL so it
//! can be previewed and selected like a generated thumbnail. Each URL is
//! owned by a [`BlobLease`]; dropping the lease revokes the URL.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use tubeflow_gateway::ThumbnailUpload;

pub const BLOB_URL_PREFIX: &str = "blob:tubeflow/";

pub fn is_blob_url(url: &str) -> bool {
    url.starts_with(BLOB_URL_PREFIX)
}

#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<RwLock<HashMap<String, ThumbnailUpload>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `upload` under a fresh URL.
    pub fn create(&self, upload: ThumbnailUpload) -> BlobLease {
        let url = format!("{}{}", BLOB_URL_PREFIX, Uuid::new_v4());
        debug!(url = %url, bytes = upload.bytes.len(), "Created thumbnail blob");
        self.blobs.write().insert(url.clone(), upload);
        BlobLease {
            registry: self.clone(),
            url,
        }
    }

    pub fn get(&self, url: &str) -> Option<ThumbnailUpload> {
        self.blobs.read().get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.blobs.read().contains_key(url)
    }

    /// Number of URLs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.blobs.read().len()
    }

    fn revoke(&self, url: &str) {
        if self.blobs.write().remove(url).is_some() {
            debug!(url = %url, "Revoked thumbnail blob");
        }
    }
}

/// Ownership of one blob URL.
#[derive(Debug)]
pub struct BlobLease {
    registry: BlobRegistry,
    url: String,
}

impl BlobLease {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn upload(&self) -> Option<ThumbnailUpload> {
        self.registry.get(&self.url)
    }
}

impl Drop for BlobLease {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}
