use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::job::JobInfo;
use crate::store::Cluster;

/// Per-cluster job operations against one execution backend.
#[async_trait]
pub trait RuntimeService: Send + Sync {
    fn cluster_id(&self) -> &str;
    async fn create_job(&self, job: &JobInfo) -> Result<()>;
    async fn stop_job(&self, job: &JobInfo) -> Result<()>;
    async fn delete_job(&self, job: &JobInfo) -> Result<()>;
}

/// Builds a runtime handle from a cluster's connection info.
///
/// Failures must be reported as `RuntimeInit`.
#[async_trait]
pub trait RuntimeFactory: Send + Sync {
    async fn build(&self, cluster: &Cluster) -> Result<Arc<dyn RuntimeService>>;
}
