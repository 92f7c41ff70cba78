use async_trait::async_trait;

use crate::error::Result;
use crate::job::{Job, JobStatus};

/// Persistence contract for job records.
///
/// Updates are partial: only the fields a caller supplies are written, and a
/// job whose status is terminal rejects every mutation with `StateConflict`.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new record. IDs are unique; a duplicate is a persistence error.
    async fn create(&self, job: &Job) -> Result<()>;

    /// Fetch a live record, `JobNotFound` if absent or deleted.
    async fn get_by_id(&self, id: &str) -> Result<Job>;

    async fn get_status_by_id(&self, id: &str) -> Result<JobStatus> {
        Ok(self.get_by_id(id).await?.status)
    }

    /// Set status and/or message. `None` status and an empty message leave
    /// the respective field untouched.
    async fn update_status(&self, id: &str, message: &str, status: Option<JobStatus>)
        -> Result<()>;

    /// Set status, runtime info and message; returns the resulting status.
    async fn update(
        &self,
        id: &str,
        status: Option<JobStatus>,
        runtime_info: Option<serde_json::Value>,
        message: &str,
    ) -> Result<JobStatus>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Jobs of a queue in any of `statuses`. Query failures yield an empty list.
    async fn list_by_queue(&self, queue_id: &str, statuses: &[JobStatus]) -> Vec<Job>;

    /// Jobs whose ID has the form `job-<run_id>-*`, optionally narrowed to `job_id`.
    async fn list_by_run_prefix(&self, run_id: &str, job_id: Option<&str>) -> Result<Vec<Job>>;
}
