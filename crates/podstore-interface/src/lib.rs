//! Podstore Interface: entity traits shared by local and foreign-owned calendar data
//!
//! A pod stores some calendar homes itself and knows about others that live on
//! other pods. Generic store code holds either kind behind the same traits:
//!
//! - [`CalendarHome`]: a user's top-level container
//! - [`Calendar`]: a child container inside a home
//! - [`CalendarObject`]: a single item inside a calendar
//!
//! Local implementations carry out every operation. Foreign-owned
//! implementations reject the ones needing local authority with
//! [`StoreError::NotSupported`] and forward the rest to the owning pod.
//!
//! # Example
//!
//! ```rust,no_run
//! use podstore_interface::CalendarHome;
//!
//! async fn count_attachments(home: &dyn CalendarHome) -> podstore_interface::Result<usize> {
//!     // Works the same whether the home is local or lives on another pod
//!     Ok(home.get_all_attachments().await?.len())
//! }
//! ```

pub mod attachment;
pub mod error;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;

pub use attachment::{
    Attachment, AttachmentLink, AttachmentSink, AttachmentStorage, AttachmentStream,
    ManagedAttachmentResult, ManagedReference, WriteMode,
};
pub use error::{ConduitFailure, Result, StoreError};
pub use types::{ChildRef, ComponentType, EntityKind, ForeignRef, ObjectRef, PodId, ResourceId};

/// A user's top-level calendar container.
///
/// Implementations must be `Send + Sync` so homes can be shared across tasks
/// within one transaction.
#[async_trait]
pub trait CalendarHome: Send + Sync {
    fn owner_uid(&self) -> &str;

    fn resource_id(&self) -> ResourceId;

    /// Whether the authoritative copy of this home lives on another pod
    fn is_external(&self) -> bool {
        false
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 1. Child lookup
    // ═══════════════════════════════════════════════════════════════════════

    async fn list_calendars(&self) -> Result<Vec<String>>;

    async fn calendar_with_name(&self, name: &str) -> Result<Option<Arc<dyn Calendar>>>;

    /// Whether a calendar object with `uid` exists in any calendar other than
    /// the one holding `ok_object`
    async fn has_calendar_resource_uid_somewhere_else(
        &self,
        uid: &str,
        ok_object: Option<ResourceId>,
    ) -> Result<bool>;

    async fn get_calendar_resources_for_uid(&self, uid: &str)
        -> Result<Vec<Arc<dyn CalendarObject>>>;

    async fn calendar_object_with_dropbox_id(
        &self,
        dropbox_id: &str,
    ) -> Result<Option<Arc<dyn CalendarObject>>>;

    // ═══════════════════════════════════════════════════════════════════════
    // 2. Attachments
    // ═══════════════════════════════════════════════════════════════════════

    /// Every attachment stored for this home
    async fn get_all_attachments(&self) -> Result<Vec<Attachment>>;

    /// Copy the bytes of attachment `remote_id` into local storage for `attachment`
    async fn read_attachment_data(&self, remote_id: ResourceId, attachment: &Attachment)
        -> Result<()>;

    /// Every attachment-to-object association in this home
    async fn get_attachment_links(&self) -> Result<Vec<AttachmentLink>>;

    async fn get_all_dropbox_ids(&self) -> Result<Vec<String>>;

    async fn get_all_attachment_names(&self) -> Result<Vec<String>>;

    async fn get_all_managed_ids(&self) -> Result<Vec<String>>;

    // ═══════════════════════════════════════════════════════════════════════
    // 3. Lifecycle and defaults
    // ═══════════════════════════════════════════════════════════════════════

    /// Hook run once after the home has been provisioned
    async fn created_home(&self) -> Result<()>;

    /// Split calendars holding both events and tasks into one per component type
    async fn split_calendars(&self) -> Result<()>;

    async fn ensure_default_calendars_exist(&self) -> Result<()>;

    async fn set_default_calendar(&self, calendar: &str, component_type: ComponentType)
        -> Result<()>;

    async fn default_calendar(
        &self,
        component_type: ComponentType,
        create: bool,
    ) -> Result<Option<Arc<dyn Calendar>>>;

    async fn is_default_calendar(&self, calendar: &str) -> Result<bool>;

    async fn get_default_alarm(&self, vevent: bool, timed: bool) -> Result<Option<String>>;

    async fn set_default_alarm(&self, alarm: Option<&str>, vevent: bool, timed: bool)
        -> Result<()>;

    async fn get_availability(&self) -> Result<Option<String>>;

    async fn set_availability(&self, availability: Option<&str>) -> Result<()>;
}

/// A calendar inside a home
#[async_trait]
pub trait Calendar: Send + Sync {
    fn name(&self) -> &str;

    fn resource_id(&self) -> ResourceId;

    async fn list_object_names(&self) -> Result<Vec<String>>;

    async fn object_with_name(&self, name: &str) -> Result<Option<Arc<dyn CalendarObject>>>;

    async fn create_object(&self, name: &str, component: &str)
        -> Result<Arc<dyn CalendarObject>>;
}

/// A single calendar item
#[async_trait]
pub trait CalendarObject: Send + Sync {
    fn name(&self) -> &str;

    fn uid(&self) -> &str;

    fn resource_id(&self) -> ResourceId;

    /// The iCalendar text of this item
    async fn component(&self) -> Result<String>;

    async fn set_component(&self, component: &str) -> Result<()>;

    async fn remove(&self) -> Result<()>;

    /// Attach new data to the instances named by `rids` (all instances when empty)
    async fn add_attachment(
        &self,
        rids: &[String],
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> Result<ManagedAttachmentResult>;

    async fn update_attachment(
        &self,
        managed_id: &str,
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> Result<ManagedAttachmentResult>;

    async fn remove_attachment(&self, rids: &[String], managed_id: &str) -> Result<()>;
}
