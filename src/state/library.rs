use std::sync::{Arc, Mutex, MutexGuard};

use super::buffer::CaptureBuffer;
use super::data::{PhotoDraft, PhotoRecord};
use super::store::{LocalStore, StoreError};

/// The PhotoLibrary owns the local store handle and the capture buffer.
///
/// One is built per process and handed to whoever needs it (the capture
/// controller, the startup loader). Clones share the same store and buffer.
#[derive(Clone, Debug)]
pub struct PhotoLibrary {
    store: LocalStore,
    buffer: Arc<Mutex<CaptureBuffer>>,
}

impl PhotoLibrary {
    pub fn new(store: LocalStore, buffer: CaptureBuffer) -> Self {
        Self {
            store,
            buffer: Arc::new(Mutex::new(buffer)),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Reconcile the buffer with what's on disk.
    /// Called once at startup; returns the hydrated snapshot.
    pub async fn hydrate(&self) -> Result<Vec<PhotoRecord>, StoreError> {
        let photos = self.store.list_all().await?;
        let total = photos.len();

        let mut buffer = self.lock_buffer();
        buffer.hydrate(photos);
        tracing::info!(total, window = buffer.len(), "gallery hydrated from store");

        Ok(buffer.snapshot())
    }

    /// Persist a draft. Only once the insert has completed is the record
    /// pushed into the buffer; returns the record and the new snapshot.
    ///
    /// On failure neither the store nor the buffer changes.
    pub async fn commit(
        &self,
        draft: PhotoDraft,
    ) -> Result<(PhotoRecord, Vec<PhotoRecord>), StoreError> {
        let id = self.store.insert(draft.clone()).await?;
        let record = draft.into_record(id);

        let mut buffer = self.lock_buffer();
        buffer.push(record.clone());

        Ok((record, buffer.snapshot()))
    }

    pub fn snapshot(&self) -> Vec<PhotoRecord> {
        self.lock_buffer().snapshot()
    }

    // The buffer is never left half-updated, so a poisoned lock is still usable
    fn lock_buffer(&self) -> MutexGuard<'_, CaptureBuffer> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
