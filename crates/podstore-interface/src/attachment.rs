//! Attachment value objects and the local attachment storage seam

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::types::ResourceId;

/// Byte source handed to an attachment mutation
pub type AttachmentStream = Box<dyn tokio::io::AsyncRead + Unpin + Send>;

/// Byte sink an attachment's data is written into
pub type AttachmentSink = Box<dyn tokio::io::AsyncWrite + Unpin + Send>;

/// Metadata of a stored attachment.
///
/// `id` is assigned by the pod the record came from; after a migration the
/// destination pod assigns its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: ResourceId,
    #[serde(default)]
    pub managed_id: Option<String>,
    #[serde(default)]
    pub dropbox_id: Option<String>,
    pub content_type: String,
    pub name: String,
    pub size: u64,
    pub checksum: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Attachment {
    /// Whether this attachment is addressed by a managed id rather than a dropbox path
    pub fn is_managed(&self) -> bool {
        self.managed_id.is_some()
    }
}

/// Association between a managed attachment and a calendar object referencing it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentLink {
    pub attachment_id: ResourceId,
    pub managed_id: String,
    pub calendar_object_id: ResourceId,
}

/// Anything that can name a managed attachment.
///
/// Attachment mutations only promise this much about what they return.
pub trait ManagedReference: fmt::Debug + Send + Sync {
    fn managed_id(&self) -> &str;
}

/// Result of adding or updating a managed attachment: the handle and its location
pub type ManagedAttachmentResult = (Box<dyn ManagedReference>, String);

/// How a local attachment write should be treated by storage policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteMode {
    /// A write made on behalf of an end user
    #[default]
    Live,
    /// Transitional data copied in from another pod
    Migrating,
}

/// Local storage for attachment bytes
#[async_trait]
pub trait AttachmentStorage: Send + Sync + 'static {
    /// Open a writer that replaces the stored bytes of `attachment`
    async fn open_writer(&self, attachment: &Attachment, mode: WriteMode)
        -> Result<AttachmentSink>;

    /// Read back everything stored for an attachment id
    async fn read(&self, attachment_id: ResourceId) -> Result<Vec<u8>>;
}
