//! LocalStore: the homes a pod owns itself

use podstore_interface::{CalendarHome, PodId, ResourceId, Result, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::home::LocalCalendarHome;
use super::storage::MemoryAttachmentStorage;
use crate::config::PodConfig;

/// Hands out resource ids unique within one pod
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicI64,
}

impl IdAllocator {
    pub fn new(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    pub fn next(&self) -> ResourceId {
        ResourceId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Authoritative storage for the homes owned by one pod
pub struct LocalStore {
    pod: PodId,
    ids: Arc<IdAllocator>,
    storage: Arc<MemoryAttachmentStorage>,
    attachment_url_base: String,
    homes: RwLock<HashMap<String, LocalCalendarHome>>,
}

impl LocalStore {
    pub fn new(pod: PodId, attachment_url_base: impl Into<String>) -> Self {
        Self {
            pod,
            ids: Arc::new(IdAllocator::default()),
            storage: Arc::new(MemoryAttachmentStorage::new()),
            attachment_url_base: attachment_url_base.into(),
            homes: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &PodConfig) -> Self {
        Self::new(
            PodId::new(config.pod_id.clone()),
            config.attachment_url_base.clone(),
        )
    }

    pub fn pod(&self) -> &PodId {
        &self.pod
    }

    pub fn storage(&self) -> Arc<MemoryAttachmentStorage> {
        self.storage.clone()
    }

    /// Provision a new home and run its creation hook
    pub async fn create_home(&self, owner_uid: &str) -> Result<LocalCalendarHome> {
        let mut homes = self.homes.write().await;
        if homes.contains_key(owner_uid) {
            return Err(StoreError::InvalidArgument(format!(
                "home {} already exists on pod {}",
                owner_uid, self.pod
            )));
        }

        let home = LocalCalendarHome::new(
            owner_uid.to_string(),
            self.ids.next(),
            self.ids.clone(),
            self.storage.clone(),
            self.attachment_url_base.clone(),
        );
        home.created_home().await?;

        info!(pod = %self.pod, owner = owner_uid, id = %home.resource_id(), "Created home");
        homes.insert(owner_uid.to_string(), home.clone());
        Ok(home)
    }

    pub async fn home_with_uid(&self, owner_uid: &str) -> Option<LocalCalendarHome> {
        self.homes.read().await.get(owner_uid).cloned()
    }

    pub async fn home_with_id(&self, id: ResourceId) -> Option<LocalCalendarHome> {
        self.homes
            .read()
            .await
            .values()
            .find(|home| home.resource_id() == id)
            .cloned()
    }

    pub async fn owner_uids(&self) -> Vec<String> {
        let mut uids: Vec<_> = self.homes.read().await.keys().cloned().collect();
        uids.sort();
        uids
    }
}
