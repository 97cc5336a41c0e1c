//! LocalCalendar: a calendar inside a locally owned home

use async_trait::async_trait;
use podstore_interface::{Calendar, CalendarObject, ResourceId, Result, StoreError};
use std::sync::Arc;
use tracing::debug;

use super::home::{HomeShared, ObjectEntry};
use super::ical;
use super::object::LocalCalendarObject;

#[derive(Clone)]
pub struct LocalCalendar {
    shared: Arc<HomeShared>,
    id: ResourceId,
    name: String,
}

impl LocalCalendar {
    pub(crate) fn new(shared: Arc<HomeShared>, id: ResourceId, name: String) -> Self {
        Self { shared, id, name }
    }

    pub fn owner_uid(&self) -> &str {
        &self.shared.owner_uid
    }

    /// Names of the objects stored here, in name order
    async fn names(&self) -> Vec<String> {
        let state = self.shared.state.read().await;
        let mut names: Vec<_> = state
            .objects
            .values()
            .filter(|entry| entry.calendar_id == self.id)
            .map(|entry| entry.name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Calendar for LocalCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_id(&self) -> ResourceId {
        self.id
    }

    async fn list_object_names(&self) -> Result<Vec<String>> {
        Ok(self.names().await)
    }

    async fn object_with_name(&self, name: &str) -> Result<Option<Arc<dyn CalendarObject>>> {
        let state = self.shared.state.read().await;
        Ok(state
            .objects
            .values()
            .find(|entry| entry.calendar_id == self.id && entry.name == name)
            .map(|entry| {
                Arc::new(LocalCalendarObject::from_entry(self.shared.clone(), entry))
                    as Arc<dyn CalendarObject>
            }))
    }

    async fn create_object(
        &self,
        name: &str,
        component: &str,
    ) -> Result<Arc<dyn CalendarObject>> {
        let uid = ical::uid_of(component).ok_or_else(|| {
            StoreError::InvalidArgument(format!("{} has no UID", name))
        })?;

        let mut state = self.shared.state.write().await;
        if state.calendar_by_id(self.id).is_none() {
            return Err(StoreError::NotFound(format!("calendar {}", self.name)));
        }
        let clash = state
            .objects
            .values()
            .filter(|entry| entry.calendar_id == self.id)
            .find(|entry| entry.name == name || entry.uid == uid);
        if let Some(existing) = clash {
            return Err(StoreError::InvalidArgument(format!(
                "calendar {} already holds {} (uid {})",
                self.name, existing.name, existing.uid
            )));
        }

        let entry = ObjectEntry {
            id: self.shared.ids.next(),
            calendar_id: self.id,
            name: name.to_string(),
            uid: uid.to_string(),
            component: component.to_string(),
            dropbox_id: ical::dropbox_id_of(component),
        };
        state.objects.insert(entry.id, entry.clone());
        debug!(calendar = %self.name, object = name, id = %entry.id, "Created calendar object");

        Ok(Arc::new(LocalCalendarObject::from_entry(
            self.shared.clone(),
            &entry,
        )))
    }
}
