use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::error::{JobPlaneError, Result};
use crate::runtime::service::{RuntimeFactory, RuntimeService};
use crate::store::Cluster;

type Construction = Shared<BoxFuture<'static, Result<Arc<dyn RuntimeService>>>>;

enum Slot {
    Ready(Arc<dyn RuntimeService>),
    /// A construction in flight; every caller for the cluster awaits this one.
    Building(Construction),
}

/// Process-wide cache of one runtime handle per cluster ID.
///
/// Handles are built lazily and at most once per cluster: concurrent first
/// callers share a single in-flight construction. A failed construction is
/// reported to all of its waiters and then forgotten, so a later call builds
/// again; a finished construction whose waiters all went away is settled by
/// the next caller. Handles live as long as the registry.
pub struct RuntimeRegistry {
    factory: Arc<dyn RuntimeFactory>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl RuntimeRegistry {
    pub fn new(factory: Arc<dyn RuntimeFactory>) -> Self {
        Self {
            factory,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached handle for `cluster`, constructing it on first use.
    pub async fn get_or_create(&self, cluster: &Cluster) -> Result<Arc<dyn RuntimeService>> {
        let construction = {
            let mut slots = self.slots.lock().await;
            let in_flight = match slots.get(&cluster.id) {
                Some(Slot::Ready(runtime)) => return Ok(runtime.clone()),
                Some(Slot::Building(construction)) => Some(construction.clone()),
                None => None,
            };
            let construction = match in_flight {
                Some(construction) => match construction.peek() {
                    None => construction.clone(),
                    // Finished, but every waiter gave up before settling the slot.
                    Some(Ok(runtime)) => {
                        let runtime = runtime.clone();
                        slots.insert(cluster.id.clone(), Slot::Ready(runtime.clone()));
                        return Ok(runtime);
                    }
                    Some(Err(e)) => {
                        tracing::debug!(cluster_id = %cluster.id, error = %e, "Discarding unsettled failed construction");
                        self.start(&mut slots, cluster)
                    }
                },
                None => self.start(&mut slots, cluster),
            };
            construction
        };

        let result = construction.clone().await;

        let mut slots = self.slots.lock().await;
        let still_ours = matches!(
            slots.get(&cluster.id),
            Some(Slot::Building(current)) if current.ptr_eq(&construction)
        );
        if still_ours {
            match &result {
                Ok(runtime) => {
                    slots.insert(cluster.id.clone(), Slot::Ready(runtime.clone()));
                }
                Err(e) => {
                    tracing::error!(cluster_id = %cluster.id, error = %e, "Runtime construction failed");
                    slots.remove(&cluster.id);
                }
            }
        }
        result
    }

    fn start(&self, slots: &mut HashMap<String, Slot>, cluster: &Cluster) -> Construction {
        tracing::info!(cluster_id = %cluster.id, cluster_type = %cluster.cluster_type, "Creating runtime");
        let construction = self.construct(cluster.clone());
        slots.insert(cluster.id.clone(), Slot::Building(construction.clone()));
        construction
    }

    fn construct(&self, cluster: Cluster) -> Construction {
        let factory = self.factory.clone();
        async move {
            factory.build(&cluster).await.map_err(|e| match e {
                JobPlaneError::RuntimeInit { .. } => e,
                other => JobPlaneError::runtime_init(&cluster.id, other.to_string()),
            })
        }
        .boxed()
        .shared()
    }

    /// Number of clusters with a ready handle.
    pub async fn len(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, cluster_id: &str) -> bool {
        matches!(
            self.slots.lock().await.get(cluster_id),
            Some(Slot::Ready(_))
        )
    }
}
