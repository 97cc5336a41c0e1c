//! ExternalCalendarObject and the handle returned by its attachment mutations

use async_trait::async_trait;
use podstore_interface::{
    AttachmentStream, CalendarObject, ChildRef, ManagedAttachmentResult, ManagedReference,
    ObjectRef, ResourceId, Result,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::capability::{reject, ObjectOperation};
use crate::conduit::TxnContext;

/// Calendar object whose authoritative copy lives on another pod.
///
/// Structural changes are refused. Managed attachment changes are executed by
/// the owning pod.
#[derive(Debug, Clone)]
pub struct ExternalCalendarObject {
    reference: ObjectRef,
    uid: String,
    component: String,
    txn: TxnContext,
}

impl ExternalCalendarObject {
    pub fn new(txn: TxnContext, reference: ObjectRef, uid: String, component: String) -> Self {
        Self {
            reference,
            uid,
            component,
            txn,
        }
    }

    pub fn reference(&self) -> &ObjectRef {
        &self.reference
    }

    /// Creation hook used by [`crate::ExternalCalendar::create_object`]
    pub(crate) fn create_internal(
        parent: &ChildRef,
        name: &str,
        _component: &str,
    ) -> Result<Arc<dyn CalendarObject>> {
        let target = format!("{}/{}/{}", parent.home, parent.name, name);
        Err(reject(ObjectOperation::Create, &target))
    }

    fn reject(&self, op: ObjectOperation) -> podstore_interface::StoreError {
        reject(op, &ObjectTarget(&self.reference))
    }
}

struct ObjectTarget<'a>(&'a ObjectRef);

impl fmt::Display for ObjectTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.0.child.home, self.0.child.name, self.0.name
        )
    }
}

#[async_trait]
impl CalendarObject for ExternalCalendarObject {
    fn name(&self) -> &str {
        &self.reference.name
    }

    fn uid(&self) -> &str {
        &self.uid
    }

    fn resource_id(&self) -> ResourceId {
        self.reference.resource_id
    }

    /// Component text as delivered with the lookup that produced this object
    async fn component(&self) -> Result<String> {
        Ok(self.component.clone())
    }

    async fn set_component(&self, _component: &str) -> Result<()> {
        Err(self.reject(ObjectOperation::SetComponent))
    }

    async fn remove(&self) -> Result<()> {
        Err(self.reject(ObjectOperation::Remove))
    }

    async fn add_attachment(
        &self,
        rids: &[String],
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> Result<ManagedAttachmentResult> {
        debug!(
            object = %ObjectTarget(&self.reference),
            content_type,
            filename,
            "Adding attachment on owning pod"
        );
        let (managed_id, location) = self
            .txn
            .conduit()
            .send_add_attachment(&self.reference, rids, content_type, filename, stream)
            .await?;
        Ok((Box::new(ManagedAttachmentExternal::new(managed_id)), location))
    }

    async fn update_attachment(
        &self,
        managed_id: &str,
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> Result<ManagedAttachmentResult> {
        debug!(
            object = %ObjectTarget(&self.reference),
            managed_id,
            "Updating attachment on owning pod"
        );
        let (managed_id, location) = self
            .txn
            .conduit()
            .send_update_attachment(&self.reference, managed_id, content_type, filename, stream)
            .await?;
        Ok((Box::new(ManagedAttachmentExternal::new(managed_id)), location))
    }

    async fn remove_attachment(&self, rids: &[String], managed_id: &str) -> Result<()> {
        debug!(
            object = %ObjectTarget(&self.reference),
            managed_id,
            "Removing attachment on owning pod"
        );
        self.txn
            .conduit()
            .send_remove_attachment(&self.reference, rids, managed_id)
            .await?;
        Ok(())
    }
}

/// The managed id of an attachment created or updated on another pod.
///
/// Carries nothing else about the attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedAttachmentExternal {
    managed_id: String,
}

impl ManagedAttachmentExternal {
    pub fn new(managed_id: impl Into<String>) -> Self {
        Self {
            managed_id: managed_id.into(),
        }
    }
}

impl ManagedReference for ManagedAttachmentExternal {
    fn managed_id(&self) -> &str {
        &self.managed_id
    }
}
