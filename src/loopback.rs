/*!
 * In-process conduit
 *
 * Serves conduit requests straight from the local engines of pods living in
 * the same process. Requests are resolved to the owning pod through the
 * reference's pod hint, falling back to the pod directory, and results are
 * serialized exactly as a network transport would carry them.
 */

use async_trait::async_trait;
use podstore_connect::wire::{self, CalendarObjectRecord, CalendarRecord};
use podstore_connect::{Conduit, ConduitError, ConduitResult, RawRecord};
use podstore_interface::{
    AttachmentSink, AttachmentStorage, AttachmentStream, Calendar, CalendarHome, CalendarObject,
    ChildRef, ForeignRef, ManagedReference, ObjectRef, PodId, ResourceId, StoreError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::directory::PodDirectory;
use crate::system::{LocalCalendar, LocalCalendarHome, LocalCalendarObject, LocalStore};

fn remote(pod: &PodId) -> impl Fn(StoreError) -> ConduitError + '_ {
    move |err| ConduitError::Remote {
        pod: pod.clone(),
        message: err.to_string(),
    }
}

fn refused(pod: &PodId, message: String) -> ConduitError {
    ConduitError::Remote {
        pod: pod.clone(),
        message,
    }
}

/// Conduit between pods sharing one process
pub struct LoopbackConduit {
    pods: RwLock<HashMap<PodId, Arc<LocalStore>>>,
    directory: PodDirectory,
}

impl LoopbackConduit {
    pub fn new(directory: PodDirectory) -> Self {
        Self {
            pods: RwLock::new(HashMap::new()),
            directory,
        }
    }

    /// Make a pod's homes reachable through this conduit
    pub async fn attach_pod(&self, store: Arc<LocalStore>) {
        info!("Attaching pod {} to loopback conduit", store.pod());
        self.pods.write().await.insert(store.pod().clone(), store);
    }

    async fn owning_pod(&self, home: &ForeignRef) -> ConduitResult<PodId> {
        if let Some(pod) = home.owner_pod() {
            return Ok(pod.clone());
        }
        self.directory
            .lookup(home.owner_uid())
            .await
            .map(|location| location.pod)
            .ok_or_else(|| ConduitError::UnknownOwner(home.owner_uid().to_string()))
    }

    async fn store(&self, pod: &PodId) -> ConduitResult<Arc<LocalStore>> {
        self.pods
            .read()
            .await
            .get(pod)
            .cloned()
            .ok_or_else(|| ConduitError::UnknownPod(pod.clone()))
    }

    async fn home(&self, reference: &ForeignRef) -> ConduitResult<(PodId, LocalCalendarHome)> {
        let pod = self.owning_pod(reference).await?;
        let store = self.store(&pod).await?;
        let home = store
            .home_with_id(reference.resource_id())
            .await
            .ok_or_else(|| refused(&pod, format!("no home with id {}", reference.resource_id())))?;
        if home.owner_uid() != reference.owner_uid() {
            return Err(refused(
                &pod,
                format!(
                    "home {} belongs to {}, not {}",
                    reference.resource_id(),
                    home.owner_uid(),
                    reference.owner_uid()
                ),
            ));
        }
        debug!(pod = %pod, home = %reference, "Resolved home");
        Ok((pod, home))
    }

    async fn calendar(&self, child: &ChildRef) -> ConduitResult<(PodId, LocalCalendar)> {
        let (pod, home) = self.home(&child.home).await?;
        let calendar = home
            .calendar_by_id(child.resource_id)
            .await
            .ok_or_else(|| refused(&pod, format!("no calendar {}", child.name)))?;
        Ok((pod, calendar))
    }

    async fn object(&self, object: &ObjectRef) -> ConduitResult<(PodId, LocalCalendarObject)> {
        let (pod, home) = self.home(object.home()).await?;
        let found = home
            .object_by_id(object.resource_id)
            .await
            .filter(|found| found.calendar_id() == object.child.resource_id)
            .ok_or_else(|| {
                refused(
                    &pod,
                    format!("no object {} in calendar {}", object.name, object.child.name),
                )
            })?;
        Ok((pod, found))
    }
}

#[async_trait]
impl Conduit for LoopbackConduit {
    async fn send_home_get_all_attachments(
        &self,
        home: &ForeignRef,
    ) -> ConduitResult<Vec<RawRecord>> {
        let (pod, local) = self.home(home).await?;
        let attachments = local.get_all_attachments().await.map_err(remote(&pod))?;
        attachments.iter().map(wire::serialize).collect()
    }

    async fn send_get_attachment_data(
        &self,
        home: &ForeignRef,
        remote_id: ResourceId,
        target: &mut AttachmentSink,
    ) -> ConduitResult<()> {
        let (pod, local) = self.home(home).await?;
        if local.attachment(remote_id).await.is_none() {
            return Err(refused(
                &pod,
                format!("attachment {} is not in home {}", remote_id, home),
            ));
        }
        let data = local.storage().read(remote_id).await.map_err(remote(&pod))?;
        target.write_all(&data).await?;
        debug!(pod = %pod, %remote_id, bytes = data.len(), "Streamed attachment data");
        Ok(())
    }

    async fn send_home_get_attachment_links(
        &self,
        home: &ForeignRef,
    ) -> ConduitResult<Vec<RawRecord>> {
        let (pod, local) = self.home(home).await?;
        let links = local.get_attachment_links().await.map_err(remote(&pod))?;
        links.iter().map(wire::serialize).collect()
    }

    async fn send_add_attachment(
        &self,
        object: &ObjectRef,
        rids: &[String],
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> ConduitResult<(String, String)> {
        let (pod, local) = self.object(object).await?;
        let (handle, location) = local
            .add_attachment(rids, content_type, filename, stream)
            .await
            .map_err(remote(&pod))?;
        Ok((handle.managed_id().to_string(), location))
    }

    async fn send_update_attachment(
        &self,
        object: &ObjectRef,
        managed_id: &str,
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> ConduitResult<(String, String)> {
        let (pod, local) = self.object(object).await?;
        let (handle, location) = local
            .update_attachment(managed_id, content_type, filename, stream)
            .await
            .map_err(remote(&pod))?;
        Ok((handle.managed_id().to_string(), location))
    }

    async fn send_remove_attachment(
        &self,
        object: &ObjectRef,
        rids: &[String],
        managed_id: &str,
    ) -> ConduitResult<()> {
        let (pod, local) = self.object(object).await?;
        local
            .remove_attachment(rids, managed_id)
            .await
            .map_err(remote(&pod))
    }

    async fn send_home_list_children(&self, home: &ForeignRef) -> ConduitResult<Vec<String>> {
        let (pod, local) = self.home(home).await?;
        local.list_calendars().await.map_err(remote(&pod))
    }

    async fn send_home_child_with_name(
        &self,
        home: &ForeignRef,
        name: &str,
    ) -> ConduitResult<Option<RawRecord>> {
        let (_, local) = self.home(home).await?;
        local
            .local_calendar(name)
            .await
            .map(|calendar| {
                wire::serialize(&CalendarRecord {
                    resource_id: calendar.resource_id(),
                    name: calendar.name().to_string(),
                })
            })
            .transpose()
    }

    async fn send_child_list_objects(&self, child: &ChildRef) -> ConduitResult<Vec<String>> {
        let (pod, calendar) = self.calendar(child).await?;
        calendar.list_object_names().await.map_err(remote(&pod))
    }

    async fn send_child_object_with_name(
        &self,
        child: &ChildRef,
        name: &str,
    ) -> ConduitResult<Option<RawRecord>> {
        let (pod, calendar) = self.calendar(child).await?;
        let Some(object) = calendar.object_with_name(name).await.map_err(remote(&pod))? else {
            return Ok(None);
        };
        let record = CalendarObjectRecord {
            resource_id: object.resource_id(),
            name: object.name().to_string(),
            uid: object.uid().to_string(),
            component: object.component().await.map_err(remote(&pod))?,
        };
        wire::serialize(&record).map(Some)
    }
}
