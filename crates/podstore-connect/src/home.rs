//! ExternalCalendarHome: a calendar home owned by another pod

use async_trait::async_trait;
use podstore_interface::{
    Attachment, AttachmentLink, Calendar, CalendarHome, CalendarObject, ChildRef, ComponentType,
    ForeignRef, ResourceId, Result, StoreError, WriteMode,
};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::calendar::ExternalCalendar;
use crate::capability::{reject, HomeOperation};
use crate::conduit::TxnContext;
use crate::wire;

/// Stand-in for a home whose authoritative copy lives on another pod.
///
/// Only the attachment migration operations and child lookups reach the
/// owning pod. Everything that manages the home's children refuses with
/// [`StoreError::NotSupported`], since this pod holds none of them, and
/// [`CalendarHome::created_home`] quietly succeeds so provisioning code does
/// not need to special-case foreign homes.
///
/// A proxy belongs to the transaction it was loaded in and must not outlive it.
#[derive(Debug, Clone)]
pub struct ExternalCalendarHome {
    reference: ForeignRef,
    txn: TxnContext,
}

impl ExternalCalendarHome {
    pub fn new(txn: TxnContext, reference: ForeignRef) -> Self {
        Self { reference, txn }
    }

    pub fn reference(&self) -> &ForeignRef {
        &self.reference
    }

    fn reject(&self, op: HomeOperation) -> StoreError {
        reject(op, &self.reference)
    }

    fn make_calendar(&self, record: wire::CalendarRecord) -> Arc<dyn Calendar> {
        let child = ChildRef {
            home: self.reference.clone(),
            resource_id: record.resource_id,
            name: record.name,
        };
        Arc::new(ExternalCalendar::new(self.txn.clone(), child))
    }
}

#[async_trait]
impl CalendarHome for ExternalCalendarHome {
    fn owner_uid(&self) -> &str {
        self.reference.owner_uid()
    }

    fn resource_id(&self) -> ResourceId {
        self.reference.resource_id()
    }

    fn is_external(&self) -> bool {
        true
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 1. Child lookup
    // ═══════════════════════════════════════════════════════════════════════

    async fn list_calendars(&self) -> Result<Vec<String>> {
        debug!(home = %self.reference, txn = self.txn.txn_id(), "Listing remote calendars");
        Ok(self
            .txn
            .conduit()
            .send_home_list_children(&self.reference)
            .await?)
    }

    async fn calendar_with_name(&self, name: &str) -> Result<Option<Arc<dyn Calendar>>> {
        debug!(home = %self.reference, name, "Looking up remote calendar");
        let raw = self
            .txn
            .conduit()
            .send_home_child_with_name(&self.reference, name)
            .await?;

        match raw {
            Some(raw) => Ok(Some(self.make_calendar(wire::deserialize_calendar(&raw)?))),
            None => Ok(None),
        }
    }

    async fn has_calendar_resource_uid_somewhere_else(
        &self,
        _uid: &str,
        _ok_object: Option<ResourceId>,
    ) -> Result<bool> {
        Err(self.reject(HomeOperation::HasCalendarResourceUidSomewhereElse))
    }

    async fn get_calendar_resources_for_uid(
        &self,
        _uid: &str,
    ) -> Result<Vec<Arc<dyn CalendarObject>>> {
        Err(self.reject(HomeOperation::GetCalendarResourcesForUid))
    }

    async fn calendar_object_with_dropbox_id(
        &self,
        _dropbox_id: &str,
    ) -> Result<Option<Arc<dyn CalendarObject>>> {
        Err(self.reject(HomeOperation::CalendarObjectWithDropboxId))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 2. Attachments (needed during migration)
    // ═══════════════════════════════════════════════════════════════════════

    async fn get_all_attachments(&self) -> Result<Vec<Attachment>> {
        debug!(home = %self.reference, txn = self.txn.txn_id(), "Fetching remote attachments");
        let raw = self
            .txn
            .conduit()
            .send_home_get_all_attachments(&self.reference)
            .await?;
        let attachments = wire::deserialize_attachments(&raw)?;
        debug!("Received {} attachment records", attachments.len());
        Ok(attachments)
    }

    async fn read_attachment_data(
        &self,
        remote_id: ResourceId,
        attachment: &Attachment,
    ) -> Result<()> {
        // The local target must exist before the owning pod starts streaming
        let mut target = self
            .txn
            .attachments()
            .open_writer(attachment, WriteMode::Migrating)
            .await?;

        debug!(
            home = %self.reference,
            %remote_id,
            local_id = %attachment.id,
            "Streaming remote attachment data"
        );

        self.txn
            .conduit()
            .send_get_attachment_data(&self.reference, remote_id, &mut target)
            .await?;
        target.shutdown().await?;
        Ok(())
    }

    async fn get_attachment_links(&self) -> Result<Vec<AttachmentLink>> {
        debug!(home = %self.reference, txn = self.txn.txn_id(), "Fetching remote attachment links");
        let raw = self
            .txn
            .conduit()
            .send_home_get_attachment_links(&self.reference)
            .await?;
        wire::deserialize_attachment_links(&raw)
    }

    async fn get_all_dropbox_ids(&self) -> Result<Vec<String>> {
        Err(self.reject(HomeOperation::GetAllDropboxIds))
    }

    async fn get_all_attachment_names(&self) -> Result<Vec<String>> {
        Err(self.reject(HomeOperation::GetAllAttachmentNames))
    }

    async fn get_all_managed_ids(&self) -> Result<Vec<String>> {
        Err(self.reject(HomeOperation::GetAllManagedIds))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 3. Lifecycle and defaults
    // ═══════════════════════════════════════════════════════════════════════

    async fn created_home(&self) -> Result<()> {
        Ok(())
    }

    async fn split_calendars(&self) -> Result<()> {
        Err(self.reject(HomeOperation::SplitCalendars))
    }

    async fn ensure_default_calendars_exist(&self) -> Result<()> {
        Err(self.reject(HomeOperation::EnsureDefaultCalendarsExist))
    }

    async fn set_default_calendar(
        &self,
        _calendar: &str,
        _component_type: ComponentType,
    ) -> Result<()> {
        Err(self.reject(HomeOperation::SetDefaultCalendar))
    }

    async fn default_calendar(
        &self,
        _component_type: ComponentType,
        _create: bool,
    ) -> Result<Option<Arc<dyn Calendar>>> {
        Err(self.reject(HomeOperation::DefaultCalendar))
    }

    async fn is_default_calendar(&self, _calendar: &str) -> Result<bool> {
        Err(self.reject(HomeOperation::IsDefaultCalendar))
    }

    async fn get_default_alarm(&self, _vevent: bool, _timed: bool) -> Result<Option<String>> {
        Err(self.reject(HomeOperation::GetDefaultAlarm))
    }

    async fn set_default_alarm(
        &self,
        _alarm: Option<&str>,
        _vevent: bool,
        _timed: bool,
    ) -> Result<()> {
        Err(self.reject(HomeOperation::SetDefaultAlarm))
    }

    async fn get_availability(&self) -> Result<Option<String>> {
        Err(self.reject(HomeOperation::GetAvailability))
    }

    async fn set_availability(&self, _availability: Option<&str>) -> Result<()> {
        Err(self.reject(HomeOperation::SetAvailability))
    }
}
