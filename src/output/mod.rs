//! Temporary output blobs.
//!
//! Encoded results are parked in a [`BlobStore`] and referenced through an
//! [`OutputHandle`]. The handle owns its blob: dropping the handle revokes it,
//! so a blob is released exactly once no matter whether its job is removed,
//! cleared, or the registry itself goes away.

mod store;

pub use store::MemoryBlobStore;

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use webpify_common::BlobId;

/// Storage for in-memory encoded results.
pub trait BlobStore: Send + Sync {
    /// Park `bytes` and return a key for it.
    fn create(&self, bytes: Bytes) -> BlobId;

    /// Look up a live blob.
    fn get(&self, id: BlobId) -> Option<Bytes>;

    /// Release a blob. Revoking an unknown id is a no-op.
    fn revoke(&self, id: BlobId);
}

/// Owning reference to one encoded output blob.
pub struct OutputHandle {
    id: BlobId,
    size: u64,
    store: Arc<dyn BlobStore>,
}

impl OutputHandle {
    /// Park `bytes` in `store` and take ownership of the resulting blob.
    pub fn create(store: Arc<dyn BlobStore>, bytes: Bytes) -> Self {
        let size = bytes.len() as u64;
        let id = store.create(bytes);
        Self { id, size, store }
    }

    pub fn id(&self) -> BlobId {
        self.id
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Encoded bytes, while the handle is alive.
    pub fn bytes(&self) -> Option<Bytes> {
        self.store.get(self.id)
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        tracing::trace!(blob = %self.id, "Releasing output blob");
        self.store.revoke(self.id);
    }
}

impl fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputHandle")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}
