//! Records exchanged with the owning pod and their decoders
//!
//! Decoding is a pure function of the raw record. A malformed record is a
//! [`StoreError::Deserialize`]; sequence decoders fail as a whole on the
//! first bad element.

use podstore_interface::{Attachment, AttachmentLink, ResourceId, Result, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConduitError;

/// A serialized record as carried by the conduit
pub type RawRecord = serde_json::Value;

/// A calendar as described by its owning pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub resource_id: ResourceId,
    pub name: String,
}

/// A calendar object as described by its owning pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarObjectRecord {
    pub resource_id: ResourceId,
    pub name: String,
    pub uid: String,
    pub component: String,
}

fn decode<T: DeserializeOwned>(record: &'static str, raw: &RawRecord) -> Result<T> {
    T::deserialize(raw).map_err(|e| StoreError::Deserialize {
        record,
        reason: e.to_string(),
    })
}

fn decode_all<T: DeserializeOwned>(record: &'static str, raws: &[RawRecord]) -> Result<Vec<T>> {
    raws.iter().map(|raw| decode(record, raw)).collect()
}

pub fn deserialize_attachment(raw: &RawRecord) -> Result<Attachment> {
    decode("attachment", raw)
}

pub fn deserialize_attachments(raws: &[RawRecord]) -> Result<Vec<Attachment>> {
    decode_all("attachment", raws)
}

pub fn deserialize_attachment_link(raw: &RawRecord) -> Result<AttachmentLink> {
    decode("attachment link", raw)
}

pub fn deserialize_attachment_links(raws: &[RawRecord]) -> Result<Vec<AttachmentLink>> {
    decode_all("attachment link", raws)
}

pub fn deserialize_calendar(raw: &RawRecord) -> Result<CalendarRecord> {
    decode("calendar", raw)
}

pub fn deserialize_calendar_object(raw: &RawRecord) -> Result<CalendarObjectRecord> {
    decode("calendar object", raw)
}

/// Encode a value for the conduit (used by the serving side)
pub fn serialize<T: Serialize>(value: &T) -> std::result::Result<RawRecord, ConduitError> {
    Ok(serde_json::to_value(value)?)
}
