/*!
 * Store and transactions: where homes are loaded
 *
 * A transaction asks the pod directory who owns a home. Homes owned by this
 * pod come back as [`LocalCalendarHome`]; homes owned elsewhere come back as
 * [`ExternalCalendarHome`] proxies bound to the transaction. Both are handed
 * out as `Arc<dyn CalendarHome>`.
 */

use podstore_connect::{Conduit, ExternalCalendarHome, TxnContext};
use podstore_interface::{CalendarHome, ForeignRef, PodId, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::PodConfig;
use crate::directory::{HomeLocation, PodDirectory};
use crate::error::Result;
use crate::system::{LocalCalendarHome, LocalStore};

/// One pod's view of the federation
pub struct Store {
    pod: PodId,
    local: Arc<LocalStore>,
    directory: PodDirectory,
    conduit: Arc<dyn Conduit>,
}

impl Store {
    pub fn new(
        config: &PodConfig,
        directory: PodDirectory,
        conduit: Arc<dyn Conduit>,
    ) -> Result<Self> {
        config.validate()?;
        let local = Arc::new(LocalStore::from_config(config));
        Ok(Self {
            pod: local.pod().clone(),
            local,
            directory,
            conduit,
        })
    }

    pub fn pod(&self) -> &PodId {
        &self.pod
    }

    /// The homes this pod owns
    pub fn local(&self) -> Arc<LocalStore> {
        self.local.clone()
    }

    pub fn directory(&self) -> &PodDirectory {
        &self.directory
    }

    pub fn begin(&self) -> Transaction {
        let id = Uuid::new_v4().to_string();
        debug!(pod = %self.pod, txn = %id, "Beginning transaction");
        let context = TxnContext::new(id.clone(), self.conduit.clone(), self.local.storage());
        Transaction {
            id,
            pod: self.pod.clone(),
            local: self.local.clone(),
            directory: self.directory.clone(),
            context,
        }
    }
}

/// Scope homes are loaded in.
///
/// External proxies handed out by a transaction must not outlive it.
pub struct Transaction {
    id: String,
    pod: PodId,
    local: Arc<LocalStore>,
    directory: PodDirectory,
    context: TxnContext,
}

impl Transaction {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Load the home owned by `owner_uid`, local or foreign
    pub async fn calendar_home_with_uid(&self, owner_uid: &str) -> Option<Arc<dyn CalendarHome>> {
        match self.directory.lookup(owner_uid).await {
            Some(location) if location.pod != self.pod => {
                debug!(
                    txn = %self.id,
                    owner = owner_uid,
                    pod = %location.pod,
                    "Loading foreign-owned home"
                );
                let reference = ForeignRef::new(owner_uid, location.resource_id)
                    .with_owner_pod(location.pod);
                Some(Arc::new(ExternalCalendarHome::new(
                    self.context.clone(),
                    reference,
                )))
            }
            Some(_) | None => {
                let home = self.local.home_with_uid(owner_uid).await;
                if home.is_none() {
                    debug!(txn = %self.id, owner = owner_uid, "No such home");
                }
                home.map(|home| Arc::new(home) as Arc<dyn CalendarHome>)
            }
        }
    }

    /// Provision a home on this pod and publish it in the directory
    pub async fn create_home(&self, owner_uid: &str) -> Result<LocalCalendarHome> {
        if let Some(location) = self.directory.lookup(owner_uid).await {
            if location.pod != self.pod {
                warn!(owner = owner_uid, pod = %location.pod, "Refusing to shadow a foreign home");
                return Err(StoreError::InvalidArgument(format!(
                    "home {} is owned by pod {}",
                    owner_uid, location.pod
                ))
                .into());
            }
        }

        let home = self.local.create_home(owner_uid).await?;
        self.directory
            .register(HomeLocation {
                owner_uid: owner_uid.to_string(),
                pod: self.pod.clone(),
                resource_id: home.resource_id(),
            })
            .await;
        Ok(home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackConduit;
    use crate::PodstoreError;

    fn store(pod: &str, directory: &PodDirectory) -> Store {
        let conduit = Arc::new(LoopbackConduit::new(directory.clone()));
        Store::new(&PodConfig::for_pod(pod), directory.clone(), conduit).unwrap()
    }

    #[tokio::test]
    async fn test_local_home_is_not_proxied() {
        let directory = PodDirectory::new();
        let store = store("pod-a", &directory);
        let txn = store.begin();

        txn.create_home("user01").await.unwrap();
        let home = txn.calendar_home_with_uid("user01").await.unwrap();
        assert!(!home.is_external());
        assert!(txn.calendar_home_with_uid("nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_foreign_home_is_proxied() {
        let directory = PodDirectory::new();
        let a = store("pod-a", &directory);
        let b = store("pod-b", &directory);

        let created = a.begin().create_home("user01").await.unwrap();

        let home = b.begin().calendar_home_with_uid("user01").await.unwrap();
        assert!(home.is_external());
        assert_eq!(home.owner_uid(), "user01");
        assert_eq!(home.resource_id(), created.resource_id());
    }

    #[tokio::test]
    async fn test_create_home_refuses_foreign_owner() {
        let directory = PodDirectory::new();
        let a = store("pod-a", &directory);
        let b = store("pod-b", &directory);
        a.begin().create_home("user01").await.unwrap();

        let err = b.begin().create_home("user01").await.err().unwrap();
        assert!(matches!(
            err,
            PodstoreError::Store(StoreError::InvalidArgument(_))
        ));
        assert!(b.local().home_with_uid("user01").await.is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let directory = PodDirectory::new();
        let conduit = Arc::new(LoopbackConduit::new(directory.clone()));
        let result = Store::new(&PodConfig::for_pod(""), directory, conduit);
        assert!(matches!(result, Err(PodstoreError::Config(_))));
    }

    #[test]
    fn test_transactions_get_distinct_ids() {
        let directory = PodDirectory::new();
        let store = store("pod-a", &directory);
        assert_ne!(store.begin().id(), store.begin().id());
    }
}
