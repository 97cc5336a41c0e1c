//! LocalCalendarHome: a home this pod owns

use async_trait::async_trait;
use podstore_interface::{
    Attachment, AttachmentLink, AttachmentStorage, Calendar, CalendarHome, CalendarObject,
    ComponentType, ResourceId, Result, StoreError, WriteMode,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::calendar::LocalCalendar;
use super::ical;
use super::local::IdAllocator;
use super::object::LocalCalendarObject;
use super::storage::MemoryAttachmentStorage;

#[derive(Debug, Clone)]
pub(crate) struct CalendarEntry {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    /// `None` while the calendar may hold any component kind
    pub(crate) component_type: Option<ComponentType>,
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectEntry {
    pub(crate) id: ResourceId,
    pub(crate) calendar_id: ResourceId,
    pub(crate) name: String,
    pub(crate) uid: String,
    pub(crate) component: String,
    pub(crate) dropbox_id: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct HomeState {
    pub(crate) calendars: BTreeMap<String, CalendarEntry>,
    pub(crate) objects: BTreeMap<ResourceId, ObjectEntry>,
    defaults: HashMap<ComponentType, String>,
    alarms: HashMap<(bool, bool), String>,
    availability: Option<String>,
    pub(crate) attachments: BTreeMap<ResourceId, Attachment>,
    pub(crate) links: Vec<AttachmentLink>,
}

impl HomeState {
    pub(crate) fn calendar_by_id(&self, id: ResourceId) -> Option<&CalendarEntry> {
        self.calendars.values().find(|calendar| calendar.id == id)
    }

    /// Drop an object with its links; returns attachments left without any link
    pub(crate) fn remove_object(&mut self, id: ResourceId) -> Vec<ResourceId> {
        self.objects.remove(&id);
        self.links.retain(|link| link.calendar_object_id != id);
        self.drop_orphans()
    }

    /// Remove managed attachments no object links to any more
    pub(crate) fn drop_orphans(&mut self) -> Vec<ResourceId> {
        let linked: BTreeSet<_> = self.links.iter().map(|link| link.attachment_id).collect();
        let orphans: Vec<_> = self
            .attachments
            .values()
            .filter(|a| a.is_managed() && !linked.contains(&a.id))
            .map(|a| a.id)
            .collect();
        for id in &orphans {
            self.attachments.remove(id);
        }
        orphans
    }

    fn default_calendar_name(&self, component_type: ComponentType) -> Option<&str> {
        self.defaults
            .get(&component_type)
            .filter(|name| self.calendars.contains_key(name.as_str()))
            .map(String::as_str)
    }

    fn unused_calendar_name(&self, base: &str) -> String {
        if !self.calendars.contains_key(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}-{}", base, n))
            .find(|name| !self.calendars.contains_key(name))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Everything the handles of one home share
pub(crate) struct HomeShared {
    pub(crate) owner_uid: String,
    pub(crate) resource_id: ResourceId,
    pub(crate) ids: Arc<IdAllocator>,
    pub(crate) storage: Arc<MemoryAttachmentStorage>,
    attachment_url_base: String,
    pub(crate) state: RwLock<HomeState>,
}

impl HomeShared {
    /// Where a managed attachment is served from
    pub(crate) fn location(&self, managed_id: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.attachment_url_base.trim_end_matches('/'),
            self.owner_uid,
            managed_id,
            filename
        )
    }
}

fn default_name(component_type: ComponentType) -> &'static str {
    match component_type {
        ComponentType::Vevent => "calendar",
        ComponentType::Vtodo => "tasks",
    }
}

/// A home whose authoritative data is held by this pod.
///
/// Cloning yields another handle to the same home.
#[derive(Clone)]
pub struct LocalCalendarHome {
    shared: Arc<HomeShared>,
}

impl LocalCalendarHome {
    pub(crate) fn new(
        owner_uid: String,
        resource_id: ResourceId,
        ids: Arc<IdAllocator>,
        storage: Arc<MemoryAttachmentStorage>,
        attachment_url_base: String,
    ) -> Self {
        Self {
            shared: Arc::new(HomeShared {
                owner_uid,
                resource_id,
                ids,
                storage,
                attachment_url_base,
                state: RwLock::new(HomeState::default()),
            }),
        }
    }

    pub fn storage(&self) -> Arc<MemoryAttachmentStorage> {
        self.shared.storage.clone()
    }

    pub async fn create_calendar(&self, name: &str) -> Result<LocalCalendar> {
        if name.is_empty() {
            return Err(StoreError::InvalidArgument(
                "calendar name must not be empty".to_string(),
            ));
        }
        let mut state = self.shared.state.write().await;
        if state.calendars.contains_key(name) {
            return Err(StoreError::InvalidArgument(format!(
                "calendar {} already exists in home {}",
                name, self.shared.owner_uid
            )));
        }
        let entry = self.insert_calendar(&mut state, name.to_string(), None);
        Ok(LocalCalendar::new(self.shared.clone(), entry.id, entry.name))
    }

    fn insert_calendar(
        &self,
        state: &mut HomeState,
        name: String,
        component_type: Option<ComponentType>,
    ) -> CalendarEntry {
        let entry = CalendarEntry {
            id: self.shared.ids.next(),
            name: name.clone(),
            component_type,
        };
        state.calendars.insert(name, entry.clone());
        entry
    }

    pub async fn local_calendar(&self, name: &str) -> Option<LocalCalendar> {
        let state = self.shared.state.read().await;
        state
            .calendars
            .get(name)
            .map(|entry| LocalCalendar::new(self.shared.clone(), entry.id, entry.name.clone()))
    }

    pub async fn calendar_by_id(&self, id: ResourceId) -> Option<LocalCalendar> {
        let state = self.shared.state.read().await;
        state
            .calendar_by_id(id)
            .map(|entry| LocalCalendar::new(self.shared.clone(), entry.id, entry.name.clone()))
    }

    pub async fn object_by_id(&self, id: ResourceId) -> Option<LocalCalendarObject> {
        let state = self.shared.state.read().await;
        state
            .objects
            .get(&id)
            .map(|entry| LocalCalendarObject::from_entry(self.shared.clone(), entry))
    }

    pub async fn attachment(&self, id: ResourceId) -> Option<Attachment> {
        self.shared.state.read().await.attachments.get(&id).cloned()
    }

    /// Record an attachment copied from another pod under a fresh local id.
    ///
    /// Its bytes arrive separately, through `read_attachment_data`.
    pub async fn import_attachment(&self, remote: &Attachment) -> Result<Attachment> {
        let mut state = self.shared.state.write().await;
        if let Some(managed_id) = &remote.managed_id {
            if state
                .attachments
                .values()
                .any(|a| a.managed_id.as_ref() == Some(managed_id))
            {
                return Err(StoreError::InvalidArgument(format!(
                    "managed attachment {} already present in home {}",
                    managed_id, self.shared.owner_uid
                )));
            }
        }

        let local = Attachment {
            id: self.shared.ids.next(),
            ..remote.clone()
        };
        state.attachments.insert(local.id, local.clone());
        debug!(remote = %remote.id, local = %local.id, "Imported attachment record");
        Ok(local)
    }

    /// Record an attachment link whose attachment id is already local
    pub async fn import_attachment_link(&self, link: AttachmentLink) -> Result<()> {
        let mut state = self.shared.state.write().await;
        if !state.attachments.contains_key(&link.attachment_id) {
            return Err(StoreError::NotFound(format!(
                "attachment {} in home {}",
                link.attachment_id, self.shared.owner_uid
            )));
        }
        if !state.links.contains(&link) {
            state.links.push(link);
        }
        Ok(())
    }

    /// Forget imported attachments along with their links and stored bytes
    pub async fn discard_imported(&self, ids: &[ResourceId]) -> Result<usize> {
        let mut state = self.shared.state.write().await;
        state.links.retain(|link| !ids.contains(&link.attachment_id));
        let mut discarded = 0;
        for id in ids {
            if state.attachments.remove(id).is_some() {
                discarded += 1;
            }
            self.shared.storage.remove(*id)?;
        }
        debug!(home = %self.shared.owner_uid, discarded, "Discarded imported attachments");
        Ok(discarded)
    }

    fn make_calendar(&self, entry: &CalendarEntry) -> Arc<dyn Calendar> {
        Arc::new(LocalCalendar::new(
            self.shared.clone(),
            entry.id,
            entry.name.clone(),
        ))
    }

    fn make_object(&self, entry: &ObjectEntry) -> Arc<dyn CalendarObject> {
        Arc::new(LocalCalendarObject::from_entry(self.shared.clone(), entry))
    }

    fn ensure_defaults(&self, state: &mut HomeState) {
        for component_type in ComponentType::ALL {
            if state.default_calendar_name(component_type).is_some() {
                continue;
            }
            let name = default_name(component_type);
            if !state.calendars.contains_key(name) {
                self.insert_calendar(state, name.to_string(), Some(component_type));
            }
            state.defaults.insert(component_type, name.to_string());
        }
    }
}

#[async_trait]
impl CalendarHome for LocalCalendarHome {
    fn owner_uid(&self) -> &str {
        &self.shared.owner_uid
    }

    fn resource_id(&self) -> ResourceId {
        self.shared.resource_id
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 1. Child lookup
    // ═══════════════════════════════════════════════════════════════════════

    async fn list_calendars(&self) -> Result<Vec<String>> {
        let state = self.shared.state.read().await;
        Ok(state.calendars.keys().cloned().collect())
    }

    async fn calendar_with_name(&self, name: &str) -> Result<Option<Arc<dyn Calendar>>> {
        let state = self.shared.state.read().await;
        Ok(state.calendars.get(name).map(|entry| self.make_calendar(entry)))
    }

    async fn has_calendar_resource_uid_somewhere_else(
        &self,
        uid: &str,
        ok_object: Option<ResourceId>,
    ) -> Result<bool> {
        let state = self.shared.state.read().await;
        let ok_calendar = ok_object
            .and_then(|id| state.objects.get(&id))
            .map(|entry| entry.calendar_id);

        Ok(state.objects.values().any(|entry| {
            entry.uid == uid
                && Some(entry.id) != ok_object
                && Some(entry.calendar_id) != ok_calendar
        }))
    }

    async fn get_calendar_resources_for_uid(
        &self,
        uid: &str,
    ) -> Result<Vec<Arc<dyn CalendarObject>>> {
        let state = self.shared.state.read().await;
        Ok(state
            .objects
            .values()
            .filter(|entry| entry.uid == uid)
            .map(|entry| self.make_object(entry))
            .collect())
    }

    async fn calendar_object_with_dropbox_id(
        &self,
        dropbox_id: &str,
    ) -> Result<Option<Arc<dyn CalendarObject>>> {
        let state = self.shared.state.read().await;
        Ok(state
            .objects
            .values()
            .find(|entry| entry.dropbox_id.as_deref() == Some(dropbox_id))
            .map(|entry| self.make_object(entry)))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 2. Attachments
    // ═══════════════════════════════════════════════════════════════════════

    async fn get_all_attachments(&self) -> Result<Vec<Attachment>> {
        let state = self.shared.state.read().await;
        Ok(state.attachments.values().cloned().collect())
    }

    async fn read_attachment_data(
        &self,
        remote_id: ResourceId,
        attachment: &Attachment,
    ) -> Result<()> {
        let data = self.shared.storage.read(remote_id).await?;
        let mut writer = self
            .shared
            .storage
            .open_writer(attachment, WriteMode::Live)
            .await?;
        writer.write_all(&data).await?;
        writer.shutdown().await?;
        Ok(())
    }

    async fn get_attachment_links(&self) -> Result<Vec<AttachmentLink>> {
        Ok(self.shared.state.read().await.links.clone())
    }

    async fn get_all_dropbox_ids(&self) -> Result<Vec<String>> {
        let state = self.shared.state.read().await;
        let ids: BTreeSet<_> = state
            .objects
            .values()
            .filter_map(|entry| entry.dropbox_id.clone())
            .chain(
                state
                    .attachments
                    .values()
                    .filter_map(|a| a.dropbox_id.clone()),
            )
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// Names of the dropbox (non-managed) attachments
    async fn get_all_attachment_names(&self) -> Result<Vec<String>> {
        let state = self.shared.state.read().await;
        let names: BTreeSet<_> = state
            .attachments
            .values()
            .filter(|a| a.dropbox_id.is_some())
            .map(|a| a.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn get_all_managed_ids(&self) -> Result<Vec<String>> {
        let state = self.shared.state.read().await;
        let ids: BTreeSet<_> = state
            .attachments
            .values()
            .filter_map(|a| a.managed_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 3. Lifecycle and defaults
    // ═══════════════════════════════════════════════════════════════════════

    async fn created_home(&self) -> Result<()> {
        self.ensure_default_calendars_exist().await
    }

    async fn split_calendars(&self) -> Result<()> {
        let mut state = self.shared.state.write().await;

        let mixed: Vec<CalendarEntry> = state
            .calendars
            .values()
            .filter(|calendar| calendar.component_type.is_none())
            .filter(|calendar| {
                let kinds: BTreeSet<_> = state
                    .objects
                    .values()
                    .filter(|o| o.calendar_id == calendar.id)
                    .filter_map(|o| ical::component_type_of(&o.component))
                    .map(|kind| kind.as_str())
                    .collect();
                kinds.len() > 1
            })
            .cloned()
            .collect();

        for calendar in mixed {
            let tasks_name = state.unused_calendar_name(&format!("{}-tasks", calendar.name));
            let tasks = self.insert_calendar(&mut state, tasks_name, Some(ComponentType::Vtodo));

            let mut moved = 0;
            for object in state.objects.values_mut() {
                if object.calendar_id == calendar.id
                    && ical::component_type_of(&object.component) == Some(ComponentType::Vtodo)
                {
                    object.calendar_id = tasks.id;
                    moved += 1;
                }
            }

            if let Some(entry) = state.calendars.get_mut(&calendar.name) {
                entry.component_type = Some(ComponentType::Vevent);
            }
            if state.defaults.get(&ComponentType::Vtodo) == Some(&calendar.name) {
                state.defaults.insert(ComponentType::Vtodo, tasks.name.clone());
            }

            info!(
                home = %self.shared.owner_uid,
                calendar = %calendar.name,
                tasks = %tasks.name,
                moved,
                "Split mixed calendar"
            );
        }
        Ok(())
    }

    async fn ensure_default_calendars_exist(&self) -> Result<()> {
        let mut state = self.shared.state.write().await;
        self.ensure_defaults(&mut state);
        Ok(())
    }

    async fn set_default_calendar(
        &self,
        calendar: &str,
        component_type: ComponentType,
    ) -> Result<()> {
        let mut state = self.shared.state.write().await;
        let entry = state
            .calendars
            .get(calendar)
            .ok_or_else(|| StoreError::NotFound(format!("calendar {}", calendar)))?;
        if entry
            .component_type
            .is_some_and(|supported| supported != component_type)
        {
            return Err(StoreError::InvalidArgument(format!(
                "calendar {} does not hold {} components",
                calendar, component_type
            )));
        }
        state.defaults.insert(component_type, calendar.to_string());
        Ok(())
    }

    async fn default_calendar(
        &self,
        component_type: ComponentType,
        create: bool,
    ) -> Result<Option<Arc<dyn Calendar>>> {
        let mut state = self.shared.state.write().await;
        if state.default_calendar_name(component_type).is_none() {
            if !create {
                return Ok(None);
            }
            self.ensure_defaults(&mut state);
        }
        Ok(state
            .default_calendar_name(component_type)
            .and_then(|name| state.calendars.get(name))
            .map(|entry| self.make_calendar(entry)))
    }

    async fn is_default_calendar(&self, calendar: &str) -> Result<bool> {
        let state = self.shared.state.read().await;
        Ok(ComponentType::ALL
            .iter()
            .any(|kind| state.default_calendar_name(*kind) == Some(calendar)))
    }

    async fn get_default_alarm(&self, vevent: bool, timed: bool) -> Result<Option<String>> {
        let state = self.shared.state.read().await;
        Ok(state.alarms.get(&(vevent, timed)).cloned())
    }

    async fn set_default_alarm(
        &self,
        alarm: Option<&str>,
        vevent: bool,
        timed: bool,
    ) -> Result<()> {
        let mut state = self.shared.state.write().await;
        match alarm {
            Some(alarm) => {
                state.alarms.insert((vevent, timed), alarm.to_string());
            }
            None => {
                state.alarms.remove(&(vevent, timed));
            }
        }
        Ok(())
    }

    async fn get_availability(&self) -> Result<Option<String>> {
        Ok(self.shared.state.read().await.availability.clone())
    }

    async fn set_availability(&self, availability: Option<&str>) -> Result<()> {
        self.shared.state.write().await.availability = availability.map(str::to_string);
        Ok(())
    }
}
