use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{JobPlaneError, Result};
use crate::job::Flavour;

/// Binding from submissions to a cluster and a namespace inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Queue {
    pub id: String,
    /// Display name, used to tag job environment.
    pub name: String,
    pub cluster_id: String,
    pub namespace: String,
}

/// Connection and credential info for one execution backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    /// Backend type, e.g. `docker`.
    pub cluster_type: String,
    /// Control plane endpoint, e.g. `unix:///var/run/docker.sock`.
    pub endpoint: String,
    pub credential: String,
}

/// Lookup of queues, clusters and flavours.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_queue_by_id(&self, id: &str) -> Result<Queue>;
    async fn get_cluster_by_id(&self, id: &str) -> Result<Cluster>;
    async fn get_flavour_by_name(&self, name: &str) -> Result<Flavour>;
}

/// Seed file layout: `{ "clusters": [..], "queues": [..], "flavours": [..] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySeed {
    pub clusters: Vec<Cluster>,
    pub queues: Vec<Queue>,
    pub flavours: Vec<Flavour>,
}

#[derive(Debug, Default)]
struct Entries {
    queues: HashMap<String, Queue>,
    clusters: HashMap<String, Cluster>,
    flavours: HashMap<String, Flavour>,
}

/// Directory held in memory, seeded at startup.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<Entries>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.entries
            .get_mut()
            .clusters
            .insert(cluster.id.clone(), cluster);
        self
    }

    pub fn with_queue(mut self, queue: Queue) -> Self {
        self.entries
            .get_mut()
            .queues
            .insert(queue.id.clone(), queue);
        self
    }

    pub fn with_flavour(mut self, flavour: Flavour) -> Self {
        self.entries
            .get_mut()
            .flavours
            .insert(flavour.name.clone(), flavour);
        self
    }

    /// Build a directory from a seed, rejecting queues bound to unknown clusters.
    pub fn from_seed(seed: DirectorySeed) -> Result<Self> {
        let mut entries = Entries::default();
        for cluster in seed.clusters {
            entries.clusters.insert(cluster.id.clone(), cluster);
        }
        for queue in seed.queues {
            if !entries.clusters.contains_key(&queue.cluster_id) {
                return Err(JobPlaneError::ClusterNotFound(format!(
                    "{} (referenced by queue {})",
                    queue.cluster_id, queue.id
                )));
            }
            entries.queues.insert(queue.id.clone(), queue);
        }
        for flavour in seed.flavours {
            entries.flavours.insert(flavour.name.clone(), flavour);
        }
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    pub fn from_json_file(path: &Path) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        let seed: DirectorySeed = serde_json::from_str(&raw)?;
        Ok(Self::from_seed(seed)?)
    }

    pub async fn insert_queue(&self, queue: Queue) {
        self.entries
            .write()
            .await
            .queues
            .insert(queue.id.clone(), queue);
    }

    pub async fn insert_cluster(&self, cluster: Cluster) {
        self.entries
            .write()
            .await
            .clusters
            .insert(cluster.id.clone(), cluster);
    }

    /// `(clusters, queues, flavours)` counts.
    pub async fn summary(&self) -> (usize, usize, usize) {
        let entries = self.entries.read().await;
        (
            entries.clusters.len(),
            entries.queues.len(),
            entries.flavours.len(),
        )
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn get_queue_by_id(&self, id: &str) -> Result<Queue> {
        self.entries
            .read()
            .await
            .queues
            .get(id)
            .cloned()
            .ok_or_else(|| JobPlaneError::QueueNotFound(id.to_string()))
    }

    async fn get_cluster_by_id(&self, id: &str) -> Result<Cluster> {
        self.entries
            .read()
            .await
            .clusters
            .get(id)
            .cloned()
            .ok_or_else(|| JobPlaneError::ClusterNotFound(id.to_string()))
    }

    async fn get_flavour_by_name(&self, name: &str) -> Result<Flavour> {
        self.entries
            .read()
            .await
            .flavours
            .get(name)
            .cloned()
            .ok_or_else(|| JobPlaneError::FlavourNotFound(name.to_string()))
    }
}
