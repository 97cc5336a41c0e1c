//! The cross-pod request/response contract proxies depend on

use async_trait::async_trait;
use podstore_interface::{
    AttachmentSink, AttachmentStorage, AttachmentStream, ChildRef, ForeignRef, ObjectRef,
    ResourceId,
};
use std::fmt;
use std::sync::Arc;

use crate::error::ConduitError;
use crate::wire::RawRecord;

pub type ConduitResult<T> = std::result::Result<T, ConduitError>;

/// Request/response channel to the pod owning a foreign entity.
///
/// Every request is addressed by the reference of the entity issuing it; the
/// implementation resolves the owning pod from the embedded [`ForeignRef`].
/// One call is one exchange. Implementations decide about ordering across
/// concurrent callers, retries and timeouts.
#[async_trait]
pub trait Conduit: Send + Sync + 'static {
    // ═══════════════════════════════════════════════════════════════════════
    // 1. Home-level migration support
    // ═══════════════════════════════════════════════════════════════════════

    async fn send_home_get_all_attachments(&self, home: &ForeignRef)
        -> ConduitResult<Vec<RawRecord>>;

    /// Stream the bytes of attachment `remote_id` into `target`
    async fn send_get_attachment_data(
        &self,
        home: &ForeignRef,
        remote_id: ResourceId,
        target: &mut AttachmentSink,
    ) -> ConduitResult<()>;

    async fn send_home_get_attachment_links(
        &self,
        home: &ForeignRef,
    ) -> ConduitResult<Vec<RawRecord>>;

    // ═══════════════════════════════════════════════════════════════════════
    // 2. Item attachment lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Returns the managed id and location assigned by the owning pod
    async fn send_add_attachment(
        &self,
        object: &ObjectRef,
        rids: &[String],
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> ConduitResult<(String, String)>;

    async fn send_update_attachment(
        &self,
        object: &ObjectRef,
        managed_id: &str,
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> ConduitResult<(String, String)>;

    async fn send_remove_attachment(
        &self,
        object: &ObjectRef,
        rids: &[String],
        managed_id: &str,
    ) -> ConduitResult<()>;

    // ═══════════════════════════════════════════════════════════════════════
    // 3. Child lookup
    // ═══════════════════════════════════════════════════════════════════════

    async fn send_home_list_children(&self, home: &ForeignRef) -> ConduitResult<Vec<String>>;

    async fn send_home_child_with_name(
        &self,
        home: &ForeignRef,
        name: &str,
    ) -> ConduitResult<Option<RawRecord>>;

    async fn send_child_list_objects(&self, child: &ChildRef) -> ConduitResult<Vec<String>>;

    async fn send_child_object_with_name(
        &self,
        child: &ChildRef,
        name: &str,
    ) -> ConduitResult<Option<RawRecord>>;
}

/// The parts of an open transaction a foreign proxy needs.
///
/// Scoped to one transaction; the conduit behind it belongs to the store and
/// is shared by every transaction the store opens.
#[derive(Clone)]
pub struct TxnContext {
    txn_id: String,
    conduit: Arc<dyn Conduit>,
    attachments: Arc<dyn AttachmentStorage>,
}

impl TxnContext {
    pub fn new(
        txn_id: impl Into<String>,
        conduit: Arc<dyn Conduit>,
        attachments: Arc<dyn AttachmentStorage>,
    ) -> Self {
        Self {
            txn_id: txn_id.into(),
            conduit,
            attachments,
        }
    }

    pub fn txn_id(&self) -> &str {
        &self.txn_id
    }

    pub fn conduit(&self) -> &dyn Conduit {
        self.conduit.as_ref()
    }

    /// Local storage attachment data is written into
    pub fn attachments(&self) -> &dyn AttachmentStorage {
        self.attachments.as_ref()
    }
}

impl fmt::Debug for TxnContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxnContext")
            .field("txn_id", &self.txn_id)
            .finish_non_exhaustive()
    }
}
