//! Recording conduit and attachment storage for testing
//!
//! Both record what they were asked to do into a shared [`EventLog`] so tests
//! can assert the order of local and remote steps.

use async_trait::async_trait;
use podstore_interface::{
    Attachment, AttachmentSink, AttachmentStorage, AttachmentStream, ChildRef, ForeignRef,
    ObjectRef, PodId, ResourceId, Result as StoreResult, WriteMode,
};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::conduit::{Conduit, ConduitResult};
use crate::error::ConduitError;
use crate::wire::{CalendarObjectRecord, CalendarRecord, RawRecord};

/// Ordered record of everything the mocks were asked to do
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

pub fn attachment_record(id: i64, name: &str) -> RawRecord {
    json!({
        "id": id,
        "managed_id": format!("m-{id}"),
        "content_type": "application/octet-stream",
        "name": name,
        "size": 0,
        "checksum": "",
        "created": "2024-03-01T12:00:00Z",
        "modified": "2024-03-01T12:00:00Z",
    })
}

pub fn link_record(attachment_id: i64, managed_id: &str, object_id: i64) -> RawRecord {
    json!({
        "attachment_id": attachment_id,
        "managed_id": managed_id,
        "calendar_object_id": object_id,
    })
}

#[derive(Default)]
struct Script {
    attachments: HashMap<String, Vec<RawRecord>>,
    links: HashMap<String, Vec<RawRecord>>,
    data: HashMap<ResourceId, Vec<u8>>,
    calendars: HashMap<String, Vec<CalendarRecord>>,
    objects: HashMap<ResourceId, Vec<CalendarObjectRecord>>,
    mutation_result: Option<(String, String)>,
    failure: Option<String>,
}

/// Conduit that answers from a script and records every request
pub struct RecordingConduit {
    log: EventLog,
    calls: Mutex<Vec<String>>,
    script: Mutex<Script>,
}

impl RecordingConduit {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(Script::default()),
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Conduit requests only, in the order received
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_attachments(&self, owner: &str, records: Vec<RawRecord>) {
        let mut script = self.script.lock().unwrap();
        script.attachments.insert(owner.to_string(), records);
    }

    pub fn set_links(&self, owner: &str, records: Vec<RawRecord>) {
        let mut script = self.script.lock().unwrap();
        script.links.insert(owner.to_string(), records);
    }

    pub fn set_data(&self, remote_id: ResourceId, data: Vec<u8>) {
        self.script.lock().unwrap().data.insert(remote_id, data);
    }

    pub fn add_calendar(&self, owner: &str, id: i64, name: &str) {
        let mut script = self.script.lock().unwrap();
        script
            .calendars
            .entry(owner.to_string())
            .or_default()
            .push(CalendarRecord {
                resource_id: ResourceId(id),
                name: name.to_string(),
            });
    }

    pub fn add_object(&self, calendar_id: i64, id: i64, name: &str, uid: &str) {
        let mut script = self.script.lock().unwrap();
        script
            .objects
            .entry(ResourceId(calendar_id))
            .or_default()
            .push(CalendarObjectRecord {
                resource_id: ResourceId(id),
                name: name.to_string(),
                uid: uid.to_string(),
                component: format!("BEGIN:VCALENDAR\r\nUID:{uid}\r\nEND:VCALENDAR\r\n"),
            });
    }

    pub fn set_mutation_result(&self, managed_id: &str, location: &str) {
        self.script.lock().unwrap().mutation_result =
            Some((managed_id.to_string(), location.to_string()));
    }

    /// Make every subsequent request fail as a remote rejection
    pub fn fail_with(&self, message: &str) {
        self.script.lock().unwrap().failure = Some(message.to_string());
    }

    async fn record(&self, call: String) -> ConduitResult<()> {
        // Give concurrently issued requests a chance to interleave
        tokio::task::yield_now().await;
        self.calls.lock().unwrap().push(call.clone());
        self.log.push(call);
        match &self.script.lock().unwrap().failure {
            Some(message) => Err(ConduitError::Remote {
                pod: PodId::new("mock"),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn mutation_result(&self) -> (String, String) {
        self.script
            .lock()
            .unwrap()
            .mutation_result
            .clone()
            .unwrap_or_else(|| ("0".to_string(), String::new()))
    }
}

async fn drain(mut stream: AttachmentStream) -> ConduitResult<usize> {
    let mut buffer = Vec::new();
    stream.read_to_end(&mut buffer).await?;
    Ok(buffer.len())
}

#[async_trait]
impl Conduit for RecordingConduit {
    async fn send_home_get_all_attachments(
        &self,
        home: &ForeignRef,
    ) -> ConduitResult<Vec<RawRecord>> {
        self.record(format!("home_get_all_attachments {}", home.owner_uid()))
            .await?;
        let script = self.script.lock().unwrap();
        Ok(script
            .attachments
            .get(home.owner_uid())
            .cloned()
            .unwrap_or_default())
    }

    async fn send_get_attachment_data(
        &self,
        home: &ForeignRef,
        remote_id: ResourceId,
        target: &mut AttachmentSink,
    ) -> ConduitResult<()> {
        self.record(format!("get_attachment_data {} {}", home.owner_uid(), remote_id))
            .await?;
        let data = self
            .script
            .lock()
            .unwrap()
            .data
            .get(&remote_id)
            .cloned()
            .unwrap_or_default();
        target.write_all(&data).await?;
        Ok(())
    }

    async fn send_home_get_attachment_links(
        &self,
        home: &ForeignRef,
    ) -> ConduitResult<Vec<RawRecord>> {
        self.record(format!("home_get_attachment_links {}", home.owner_uid()))
            .await?;
        let script = self.script.lock().unwrap();
        Ok(script.links.get(home.owner_uid()).cloned().unwrap_or_default())
    }

    async fn send_add_attachment(
        &self,
        object: &ObjectRef,
        rids: &[String],
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> ConduitResult<(String, String)> {
        let len = drain(stream).await?;
        self.record(format!(
            "add_attachment {} {:?} {} {} {}",
            object.name, rids, content_type, filename, len
        ))
        .await?;
        Ok(self.mutation_result())
    }

    async fn send_update_attachment(
        &self,
        object: &ObjectRef,
        managed_id: &str,
        content_type: &str,
        filename: &str,
        stream: AttachmentStream,
    ) -> ConduitResult<(String, String)> {
        let len = drain(stream).await?;
        self.record(format!(
            "update_attachment {} {} {} {} {}",
            object.name, managed_id, content_type, filename, len
        ))
        .await?;
        Ok(self.mutation_result())
    }

    async fn send_remove_attachment(
        &self,
        object: &ObjectRef,
        rids: &[String],
        managed_id: &str,
    ) -> ConduitResult<()> {
        self.record(format!(
            "remove_attachment {} {:?} {}",
            object.name, rids, managed_id
        ))
        .await
    }

    async fn send_home_list_children(&self, home: &ForeignRef) -> ConduitResult<Vec<String>> {
        self.record(format!("home_list_children {}", home.owner_uid()))
            .await?;
        let script = self.script.lock().unwrap();
        Ok(script
            .calendars
            .get(home.owner_uid())
            .map(|calendars| calendars.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn send_home_child_with_name(
        &self,
        home: &ForeignRef,
        name: &str,
    ) -> ConduitResult<Option<RawRecord>> {
        self.record(format!("home_child_with_name {} {}", home.owner_uid(), name))
            .await?;
        let found = {
            let script = self.script.lock().unwrap();
            script
                .calendars
                .get(home.owner_uid())
                .and_then(|calendars| calendars.iter().find(|c| c.name == name).cloned())
        };
        found.map(|record| crate::wire::serialize(&record)).transpose()
    }

    async fn send_child_list_objects(&self, child: &ChildRef) -> ConduitResult<Vec<String>> {
        self.record(format!("child_list_objects {}", child.name)).await?;
        let script = self.script.lock().unwrap();
        Ok(script
            .objects
            .get(&child.resource_id)
            .map(|objects| objects.iter().map(|o| o.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn send_child_object_with_name(
        &self,
        child: &ChildRef,
        name: &str,
    ) -> ConduitResult<Option<RawRecord>> {
        self.record(format!("child_object_with_name {} {}", child.name, name))
            .await?;
        let found = {
            let script = self.script.lock().unwrap();
            script
                .objects
                .get(&child.resource_id)
                .and_then(|objects| objects.iter().find(|o| o.name == name).cloned())
        };
        found.map(|record| crate::wire::serialize(&record)).transpose()
    }
}

type Buffers = Arc<Mutex<HashMap<ResourceId, Vec<u8>>>>;

/// Attachment storage that keeps bytes in memory and logs each writer it opens
pub struct RecordingStorage {
    log: EventLog,
    opened: Mutex<Vec<(ResourceId, WriteMode)>>,
    buffers: Buffers,
}

impl RecordingStorage {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            opened: Mutex::new(Vec::new()),
            buffers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn opened(&self) -> Vec<(ResourceId, WriteMode)> {
        self.opened.lock().unwrap().clone()
    }

    pub fn contents(&self, id: ResourceId) -> Vec<u8> {
        self.buffers
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

struct BufferWriter {
    key: ResourceId,
    buffers: Buffers,
}

impl AsyncWrite for BufferWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buffers
            .lock()
            .unwrap()
            .entry(self.key)
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl AttachmentStorage for RecordingStorage {
    async fn open_writer(
        &self,
        attachment: &Attachment,
        mode: WriteMode,
    ) -> StoreResult<AttachmentSink> {
        self.log
            .push(format!("open_writer {} {:?}", attachment.id, mode));
        self.opened.lock().unwrap().push((attachment.id, mode));
        self.buffers.lock().unwrap().insert(attachment.id, Vec::new());
        Ok(Box::new(BufferWriter {
            key: attachment.id,
            buffers: self.buffers.clone(),
        }))
    }

    async fn read(&self, attachment_id: ResourceId) -> StoreResult<Vec<u8>> {
        Ok(self.contents(attachment_id))
    }
}
