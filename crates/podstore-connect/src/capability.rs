//! Which operations a foreign-owned entity forwards, ignores or refuses
//!
//! An operation needs either local authority over the entity (refused), only
//! data the owning pod can ship back (forwarded), or nothing beyond the record
//! the proxy was built from (answered locally). The tables below are
//! the single source of that classification; proxies consult them when
//! rejecting so a refused call can never slip into a forwarding path.

use podstore_interface::{EntityKind, StoreError};
use std::fmt;
use tracing::warn;

/// What a foreign proxy does when an operation is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Fails with [`StoreError::NotSupported`] before any side effect
    Forbidden,
    /// Succeeds without doing anything
    NoOp,
    /// Sent to the owning pod through the conduit
    Forwarded,
    /// Answered from the record delivered by the lookup that built the proxy,
    /// without a conduit call
    FromLookup,
}

/// A classified operation of one entity kind
pub trait Operation: Copy + fmt::Debug {
    const ENTITY: EntityKind;

    fn name(self) -> &'static str;

    fn disposition(self) -> Disposition;
}

/// Operations of [`podstore_interface::CalendarHome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomeOperation {
    ListCalendars,
    CalendarWithName,
    HasCalendarResourceUidSomewhereElse,
    GetCalendarResourcesForUid,
    CalendarObjectWithDropboxId,
    GetAllAttachments,
    ReadAttachmentData,
    GetAttachmentLinks,
    GetAllDropboxIds,
    GetAllAttachmentNames,
    GetAllManagedIds,
    CreatedHome,
    SplitCalendars,
    EnsureDefaultCalendarsExist,
    SetDefaultCalendar,
    DefaultCalendar,
    IsDefaultCalendar,
    GetDefaultAlarm,
    SetDefaultAlarm,
    GetAvailability,
    SetAvailability,
}

impl HomeOperation {
    pub const ALL: [HomeOperation; 21] = [
        HomeOperation::ListCalendars,
        HomeOperation::CalendarWithName,
        HomeOperation::HasCalendarResourceUidSomewhereElse,
        HomeOperation::GetCalendarResourcesForUid,
        HomeOperation::CalendarObjectWithDropboxId,
        HomeOperation::GetAllAttachments,
        HomeOperation::ReadAttachmentData,
        HomeOperation::GetAttachmentLinks,
        HomeOperation::GetAllDropboxIds,
        HomeOperation::GetAllAttachmentNames,
        HomeOperation::GetAllManagedIds,
        HomeOperation::CreatedHome,
        HomeOperation::SplitCalendars,
        HomeOperation::EnsureDefaultCalendarsExist,
        HomeOperation::SetDefaultCalendar,
        HomeOperation::DefaultCalendar,
        HomeOperation::IsDefaultCalendar,
        HomeOperation::GetDefaultAlarm,
        HomeOperation::SetDefaultAlarm,
        HomeOperation::GetAvailability,
        HomeOperation::SetAvailability,
    ];
}

impl Operation for HomeOperation {
    const ENTITY: EntityKind = EntityKind::Home;

    fn name(self) -> &'static str {
        match self {
            HomeOperation::ListCalendars => "list_calendars",
            HomeOperation::CalendarWithName => "calendar_with_name",
            HomeOperation::HasCalendarResourceUidSomewhereElse => {
                "has_calendar_resource_uid_somewhere_else"
            }
            HomeOperation::GetCalendarResourcesForUid => "get_calendar_resources_for_uid",
            HomeOperation::CalendarObjectWithDropboxId => "calendar_object_with_dropbox_id",
            HomeOperation::GetAllAttachments => "get_all_attachments",
            HomeOperation::ReadAttachmentData => "read_attachment_data",
            HomeOperation::GetAttachmentLinks => "get_attachment_links",
            HomeOperation::GetAllDropboxIds => "get_all_dropbox_ids",
            HomeOperation::GetAllAttachmentNames => "get_all_attachment_names",
            HomeOperation::GetAllManagedIds => "get_all_managed_ids",
            HomeOperation::CreatedHome => "created_home",
            HomeOperation::SplitCalendars => "split_calendars",
            HomeOperation::EnsureDefaultCalendarsExist => "ensure_default_calendars_exist",
            HomeOperation::SetDefaultCalendar => "set_default_calendar",
            HomeOperation::DefaultCalendar => "default_calendar",
            HomeOperation::IsDefaultCalendar => "is_default_calendar",
            HomeOperation::GetDefaultAlarm => "get_default_alarm",
            HomeOperation::SetDefaultAlarm => "set_default_alarm",
            HomeOperation::GetAvailability => "get_availability",
            HomeOperation::SetAvailability => "set_availability",
        }
    }

    fn disposition(self) -> Disposition {
        match self {
            HomeOperation::ListCalendars
            | HomeOperation::CalendarWithName
            | HomeOperation::GetAllAttachments
            | HomeOperation::ReadAttachmentData
            | HomeOperation::GetAttachmentLinks => Disposition::Forwarded,

            // Generic provisioning code calls this for every home
            HomeOperation::CreatedHome => Disposition::NoOp,

            // No local children to operate on
            HomeOperation::HasCalendarResourceUidSomewhereElse
            | HomeOperation::GetCalendarResourcesForUid
            | HomeOperation::CalendarObjectWithDropboxId
            | HomeOperation::GetAllDropboxIds
            | HomeOperation::GetAllAttachmentNames
            | HomeOperation::GetAllManagedIds
            | HomeOperation::SplitCalendars
            | HomeOperation::EnsureDefaultCalendarsExist
            | HomeOperation::SetDefaultCalendar
            | HomeOperation::DefaultCalendar
            | HomeOperation::IsDefaultCalendar
            | HomeOperation::GetDefaultAlarm
            | HomeOperation::SetDefaultAlarm
            | HomeOperation::GetAvailability
            | HomeOperation::SetAvailability => Disposition::Forbidden,
        }
    }
}

/// Operations of [`podstore_interface::CalendarObject`], including the
/// creation hook calendars route new objects through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectOperation {
    Create,
    Component,
    SetComponent,
    Remove,
    AddAttachment,
    UpdateAttachment,
    RemoveAttachment,
}

impl ObjectOperation {
    pub const ALL: [ObjectOperation; 7] = [
        ObjectOperation::Create,
        ObjectOperation::Component,
        ObjectOperation::SetComponent,
        ObjectOperation::Remove,
        ObjectOperation::AddAttachment,
        ObjectOperation::UpdateAttachment,
        ObjectOperation::RemoveAttachment,
    ];
}

impl Operation for ObjectOperation {
    const ENTITY: EntityKind = EntityKind::CalendarObject;

    fn name(self) -> &'static str {
        match self {
            ObjectOperation::Create => "create",
            ObjectOperation::Component => "component",
            ObjectOperation::SetComponent => "set_component",
            ObjectOperation::Remove => "remove",
            ObjectOperation::AddAttachment => "add_attachment",
            ObjectOperation::UpdateAttachment => "update_attachment",
            ObjectOperation::RemoveAttachment => "remove_attachment",
        }
    }

    fn disposition(self) -> Disposition {
        match self {
            ObjectOperation::Create | ObjectOperation::SetComponent | ObjectOperation::Remove => {
                Disposition::Forbidden
            }
            ObjectOperation::Component => Disposition::FromLookup,
            ObjectOperation::AddAttachment
            | ObjectOperation::UpdateAttachment
            | ObjectOperation::RemoveAttachment => Disposition::Forwarded,
        }
    }
}

/// Every operation of `O` classified as forbidden
pub fn forbidden<O: Operation>(all: &[O]) -> impl Iterator<Item = O> + '_ {
    all.iter()
        .copied()
        .filter(|op| op.disposition() == Disposition::Forbidden)
}

/// Build the failure for a forbidden operation invoked on `target`
pub(crate) fn reject<O: Operation>(op: O, target: &dyn fmt::Display) -> StoreError {
    debug_assert_eq!(
        op.disposition(),
        Disposition::Forbidden,
        "{:?} is not a forbidden operation",
        op
    );
    warn!(
        entity = %O::ENTITY,
        operation = op.name(),
        %target,
        "Rejected operation on foreign-owned entity"
    );
    StoreError::not_supported(O::ENTITY, op.name())
}
