//! In-memory attachment storage
//!
//! Bytes written in [`WriteMode::Migrating`] stay flagged as transitional
//! until [`MemoryAttachmentStorage::commit_migrated`] promotes them.

use async_trait::async_trait;
use podstore_interface::{
    Attachment, AttachmentSink, AttachmentStorage, ResourceId, Result, StoreError, WriteMode,
};
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    mode: WriteMode,
}

type Blobs = Arc<Mutex<HashMap<ResourceId, StoredBlob>>>;

fn lock(blobs: &Blobs) -> io::Result<MutexGuard<'_, HashMap<ResourceId, StoredBlob>>> {
    blobs
        .lock()
        .map_err(|_| io::Error::other("attachment storage lock poisoned"))
}

/// Attachment bytes of one pod, keyed by attachment id
#[derive(Debug, Clone, Default)]
pub struct MemoryAttachmentStorage {
    blobs: Blobs,
}

impl MemoryAttachmentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bytes stored for `id`
    pub fn put(&self, id: ResourceId, data: Vec<u8>, mode: WriteMode) -> Result<()> {
        lock(&self.blobs)?.insert(id, StoredBlob { data, mode });
        Ok(())
    }

    pub fn remove(&self, id: ResourceId) -> Result<bool> {
        Ok(lock(&self.blobs)?.remove(&id).is_some())
    }

    /// How the bytes for `id` were last written
    pub fn mode_of(&self, id: ResourceId) -> Result<Option<WriteMode>> {
        Ok(lock(&self.blobs)?.get(&id).map(|blob| blob.mode))
    }

    /// Promote migrated data to live data once a migration has completed
    pub fn commit_migrated(&self, ids: &[ResourceId]) -> Result<usize> {
        let mut blobs = lock(&self.blobs)?;
        let mut promoted = 0;
        for id in ids {
            if let Some(blob) = blobs.get_mut(id) {
                if blob.mode == WriteMode::Migrating {
                    blob.mode = WriteMode::Live;
                    promoted += 1;
                }
            }
        }
        debug!("Promoted {} migrated attachments", promoted);
        Ok(promoted)
    }

    pub fn len(&self) -> usize {
        lock(&self.blobs).map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Appends into the blob it was opened for
struct BlobWriter {
    id: ResourceId,
    blobs: Blobs,
}

impl AsyncWrite for BlobWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut blobs = lock(&self.blobs)?;
        match blobs.get_mut(&self.id) {
            Some(blob) => {
                blob.data.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("attachment {} was removed while being written", self.id),
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl AttachmentStorage for MemoryAttachmentStorage {
    async fn open_writer(
        &self,
        attachment: &Attachment,
        mode: WriteMode,
    ) -> Result<AttachmentSink> {
        debug!(id = %attachment.id, name = %attachment.name, ?mode, "Opening attachment writer");
        self.put(attachment.id, Vec::new(), mode)?;
        Ok(Box::new(BlobWriter {
            id: attachment.id,
            blobs: self.blobs.clone(),
        }))
    }

    async fn read(&self, attachment_id: ResourceId) -> Result<Vec<u8>> {
        lock(&self.blobs)?
            .get(&attachment_id)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StoreError::NotFound(format!("attachment data {}", attachment_id)))
    }
}
