use super::BlobStore;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use webpify_common::BlobId;

/// Process-local blob store.
///
/// Keeps counters of created and revoked blobs so callers can check that
/// every blob was released exactly once.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobId, Bytes>>,
    created: AtomicUsize,
    revoked: AtomicUsize,
    stale_revokes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blobs currently held.
    pub fn live_count(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Blobs created since construction.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Blobs released since construction.
    pub fn revoked_count(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }

    /// Revoke calls for ids that were not live.
    pub fn stale_revoke_count(&self) -> usize {
        self.stale_revokes.load(Ordering::SeqCst)
    }
}

impl BlobStore for MemoryBlobStore {
    fn create(&self, bytes: Bytes) -> BlobId {
        let id = BlobId::new();
        self.blobs.lock().insert(id, bytes);
        self.created.fetch_add(1, Ordering::SeqCst);
        id
    }

    fn get(&self, id: BlobId) -> Option<Bytes> {
        self.blobs.lock().get(&id).cloned()
    }

    fn revoke(&self, id: BlobId) {
        if self.blobs.lock().remove(&id).is_some() {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        } else {
            tracing::warn!(blob = %id, "Revoke of unknown blob");
            self.stale_revokes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
