/*!
 * Pod directory: which pod owns which home
 *
 * Every pod in a federation consults the same directory to decide whether a
 * home it is asked for is local or has to be proxied.
 */

use podstore_interface::{PodId, ResourceId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Where a home lives and the id its owning pod gave it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeLocation {
    pub owner_uid: String,
    pub pod: PodId,
    pub resource_id: ResourceId,
}

/// Shared owner-to-pod registry.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct PodDirectory {
    /// Owner uid -> location
    homes: Arc<RwLock<HashMap<String, HomeLocation>>>,
}

impl PodDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record where a home lives, replacing any previous location
    pub async fn register(&self, location: HomeLocation) -> Option<HomeLocation> {
        info!(
            "Registering home {} on pod {} (id {})",
            location.owner_uid, location.pod, location.resource_id
        );
        let mut homes = self.homes.write().await;
        homes.insert(location.owner_uid.clone(), location)
    }

    pub async fn lookup(&self, owner_uid: &str) -> Option<HomeLocation> {
        let homes = self.homes.read().await;
        let location = homes.get(owner_uid).cloned();
        if location.is_none() {
            debug!("No pod hosts home {}", owner_uid);
        }
        location
    }

    pub async fn unregister(&self, owner_uid: &str) -> Option<HomeLocation> {
        info!("Unregistering home {}", owner_uid);
        self.homes.write().await.remove(owner_uid)
    }

    /// Owners of every home hosted by `pod`, sorted
    pub async fn homes_on(&self, pod: &PodId) -> Vec<String> {
        let homes = self.homes.read().await;
        let mut owners: Vec<_> = homes
            .values()
            .filter(|location| &location.pod == pod)
            .map(|location| location.owner_uid.clone())
            .collect();
        owners.sort();
        owners
    }
}
