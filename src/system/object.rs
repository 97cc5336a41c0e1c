//! LocalCalendarObject and the managed attachments hanging off it

use async_trait::async_trait;
use chrono::Utc;
use podstore_interface::{
    Attachment, AttachmentLink, AttachmentStorage, AttachmentStream, CalendarObject,
    ManagedAttachmentResult, ManagedReference, ResourceId, Result, StoreError, WriteMode,
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};
use uuid::Uuid;

use super::home::{HomeShared, HomeState, ObjectEntry};
use super::ical;

/// A managed attachment created or replaced through a local object
#[derive(Debug, Clone)]
pub struct ManagedAttachment {
    attachment: Attachment,
    managed_id: String,
}

impl ManagedAttachment {
    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }
}

impl ManagedReference for ManagedAttachment {
    fn managed_id(&self) -> &str {
        &self.managed_id
    }
}

async fn drain(mut stream: AttachmentStream) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    stream.read_to_end(&mut data).await?;
    Ok(data)
}

/// Hex blake3 digest stored with each attachment
pub(crate) fn checksum(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}

#[derive(Clone)]
pub struct LocalCalendarObject {
    shared: Arc<HomeShared>,
    id: ResourceId,
    calendar_id: ResourceId,
    name: String,
    uid: String,
}

impl LocalCalendarObject {
    pub(crate) fn from_entry(shared: Arc<HomeShared>, entry: &ObjectEntry) -> Self {
        Self {
            shared,
            id: entry.id,
            calendar_id: entry.calendar_id,
            name: entry.name.clone(),
            uid: entry.uid.clone(),
        }
    }

    pub fn calendar_id(&self) -> ResourceId {
        self.calendar_id
    }

    fn ensure_exists(&self, state: &HomeState) -> Result<()> {
        if state.objects.contains_key(&self.id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("calendar object {}", self.name)))
        }
    }

    fn discard(&self, orphans: &[ResourceId]) -> Result<()> {
        for id in orphans {
            self.shared.storage.remove(*id)?;
        }
        if !orphans.is_empty() {
            debug!(object = %self.name, count = orphans.len(), "Dropped orphaned attachments");
        }
        Ok(())
    }

    async fn store_bytes(&self, attachment: &Attachment, data: &[u8]) -> Result<()> {
        let mut writer = self
            .shared
            .storage
            .open_writer(attachment, WriteMode::Live)
            .await?;
        writer.write_all(data).await?;
        writer.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl CalendarObject for LocalCalendarObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn uid(&self) -> &str {
        &self.uid
    }

    fn resource_id(&self) -> ResourceId {
        self.id
    }

    async fn component(&self) -> Result<String> {
        let state = self.shared.state.read().await;
        state
            .objects
            .get(&self.id)
            .map(|entry| entry.component.clone())
            .ok_or_else(|| StoreError::NotFound(format!("calendar object {}", self.name)))
    }

    async fn set_component(&self, component: &str) -> Result<()> {
        if ical::uid_of(component) != Some(self.uid.as_str()) {
            return Err(StoreError::InvalidArgument(format!(
                "{} must keep UID {}",
                self.name, self.uid
            )));
        }

        let mut state = self.shared.state.write().await;
        let entry = state
            .objects
            .get_mut(&self.id)
            .ok_or_else(|| StoreError::NotFound(format!("calendar object {}", self.name)))?;
        entry.component = component.to_string();
        entry.dropbox_id = ical::dropbox_id_of(component);
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        let orphans = {
            let mut state = self.shared.state.write().await;
            self.ensure_exists(&state)?;
            state.remove_object(self.id)
        };
        self.discard(&orphans)
    }

    async fn add_attachment(
        &self,
        rids: &[String],
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> Result<ManagedAttachmentResult> {
        let data = drain(stream).await?;
        let now = Utc::now();
        let managed_id = Uuid::new_v4().to_string();
        let attachment = Attachment {
            id: self.shared.ids.next(),
            managed_id: Some(managed_id.clone()),
            dropbox_id: None,
            content_type: content_type.to_string(),
            name: filename.to_string(),
            size: data.len() as u64,
            checksum: checksum(&data),
            created: now,
            modified: now,
        };

        {
            let mut state = self.shared.state.write().await;
            self.ensure_exists(&state)?;
            state.attachments.insert(attachment.id, attachment.clone());
            state.links.push(AttachmentLink {
                attachment_id: attachment.id,
                managed_id: managed_id.clone(),
                calendar_object_id: self.id,
            });
        }
        self.store_bytes(&attachment, &data).await?;

        info!(
            object = %self.name,
            managed_id = %managed_id,
            size = attachment.size,
            ?rids,
            "Added managed attachment"
        );
        let location = self.shared.location(&managed_id, filename);
        Ok((
            Box::new(ManagedAttachment {
                attachment,
                managed_id,
            }),
            location,
        ))
    }

    async fn update_attachment(
        &self,
        managed_id: &str,
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> Result<ManagedAttachmentResult> {
        let data = drain(stream).await?;

        let attachment = {
            let mut state = self.shared.state.write().await;
            self.ensure_exists(&state)?;
            let linked = state
                .links
                .iter()
                .find(|link| link.managed_id == managed_id && link.calendar_object_id == self.id)
                .map(|link| link.attachment_id)
                .ok_or_else(|| {
                    StoreError::NotFound(format!(
                        "managed attachment {} on {}",
                        managed_id, self.name
                    ))
                })?;
            let attachment = state.attachments.get_mut(&linked).ok_or_else(|| {
                StoreError::NotFound(format!("managed attachment {}", managed_id))
            })?;
            attachment.content_type = content_type.to_string();
            attachment.name = filename.to_string();
            attachment.size = data.len() as u64;
            attachment.checksum = checksum(&data);
            attachment.modified = Utc::now();
            attachment.clone()
        };
        self.store_bytes(&attachment, &data).await?;

        debug!(object = %self.name, managed_id, "Updated managed attachment");
        let location = self.shared.location(managed_id, filename);
        Ok((
            Box::new(ManagedAttachment {
                attachment,
                managed_id: managed_id.to_string(),
            }),
            location,
        ))
    }

    async fn remove_attachment(&self, rids: &[String], managed_id: &str) -> Result<()> {
        let orphans = {
            let mut state = self.shared.state.write().await;
            self.ensure_exists(&state)?;
            let before = state.links.len();
            state.links.retain(|link| {
                !(link.managed_id == managed_id && link.calendar_object_id == self.id)
            });
            if state.links.len() == before {
                return Err(StoreError::NotFound(format!(
                    "managed attachment {} on {}",
                    managed_id, self.name
                )));
            }
            state.drop_orphans()
        };
        debug!(object = %self.name, managed_id, ?rids, "Removed managed attachment");
        self.discard(&orphans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{LocalCalendarHome, LocalStore};
    use podstore_interface::{Calendar, CalendarHome, PodId};

    const EVENT: &str =
        "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:evt\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

    async fn object() -> (LocalCalendarHome, Arc<dyn CalendarObject>) {
        let store = LocalStore::new(PodId::new("pod-a"), "/attachments");
        let home = store.create_home("user01").await.unwrap();
        let calendar = home.local_calendar("calendar").await.unwrap();
        let object = calendar.create_object("evt.ics", EVENT).await.unwrap();
        (home, object)
    }

    #[tokio::test]
    async fn test_add_then_update_keeps_managed_id() {
        let (home, object) = object().await;
        let (added, _) = object
            .add_attachment(&[], "text/plain", "a.txt", Box::new(&b"first"[..]))
            .await
            .unwrap();

        let (updated, location) = object
            .update_attachment(
                added.managed_id(),
                "text/markdown",
                "a.md",
                Box::new(&b"second version"[..]),
            )
            .await
            .unwrap();

        assert_eq!(updated.managed_id(), added.managed_id());
        assert_eq!(location, format!("/attachments/user01/{}/a.md", added.managed_id()));

        let attachments = home.get_all_attachments().await.unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "a.md");
        assert_eq!(attachments[0].size, 14);
        assert_eq!(attachments[0].checksum, checksum(b"second version"));
        assert_eq!(
            home.storage().read(attachments[0].id).await.unwrap(),
            b"second version"
        );
    }

    #[tokio::test]
    async fn test_remove_attachment() {
        let (home, object) = object().await;
        let (added, _) = object
            .add_attachment(
                &["20240101T100000Z".to_string()],
                "text/plain",
                "a.txt",
                Box::new(&b"x"[..]),
            )
            .await
            .unwrap();

        object
            .remove_attachment(&[], added.managed_id())
            .await
            .unwrap();
        assert!(home.get_all_attachments().await.unwrap().is_empty());
        assert!(home.get_attachment_links().await.unwrap().is_empty());

        let again = object.remove_attachment(&[], added.managed_id()).await;
        assert!(matches!(again, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_component_keeps_uid() {
        let (_home, object) = object().await;
        let changed = EVENT.replace("END:VEVENT", "SUMMARY:Standup\r\nEND:VEVENT");
        object.set_component(&changed).await.unwrap();
        assert!(object.component().await.unwrap().contains("SUMMARY:Standup"));

        let other_uid = EVENT.replace("UID:evt", "UID:other");
        assert!(matches!(
            object.set_component(&other_uid).await,
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_removed_object_is_gone() {
        let (home, object) = object().await;
        object.remove().await.unwrap();

        let calendar = home.calendar_with_name("calendar").await.unwrap().unwrap();
        assert!(calendar.list_object_names().await.unwrap().is_empty());
        assert!(matches!(object.component().await, Err(StoreError::NotFound(_))));
        assert!(matches!(object.remove().await, Err(StoreError::NotFound(_))));
    }
}
