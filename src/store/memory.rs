use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::config::RepositoryConfig;
use crate::error::{JobPlaneError, Result};
use crate::job::{Job, JobStatus};
use crate::store::repository::JobRepository;
use crate::store::row::{encode_runtime_info, has_runtime_info, JobRow};

#[derive(Debug, Default)]
struct Table {
    rows: HashMap<String, JobRow>,
    next_pk: i64,
}

impl Table {
    fn live(&self, id: &str) -> Option<&JobRow> {
        self.rows.get(id).filter(|row| !row.is_deleted())
    }

    fn live_mut(&mut self, id: &str) -> Result<&mut JobRow> {
        self.rows
            .get_mut(id)
            .filter(|row| !row.is_deleted())
            .ok_or_else(|| JobPlaneError::JobNotFound(id.to_string()))
    }

    fn live_count(&self) -> usize {
        self.rows.values().filter(|row| !row.is_deleted()).count()
    }
}

/// Job repository kept in process memory.
///
/// Every read-check-write runs under a single write lock, so terminal-status
/// checks and the mutation they guard cannot interleave with another writer.
#[derive(Debug)]
pub struct InMemoryJobRepository {
    table: RwLock<Table>,
    max_jobs: usize,
}

impl Default for InMemoryJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::from_config(&RepositoryConfig::default())
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::with_capacity(config.max_jobs)
    }

    pub fn with_capacity(max_jobs: usize) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            max_jobs,
        }
    }

    /// Number of live (not deleted) records.
    pub async fn len(&self) -> usize {
        self.table.read().await.live_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn to_job(row: &JobRow) -> Option<Job> {
        match Job::try_from(row) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::warn!(job_id = %row.id, error = %e, "Skipping unreadable job row");
                None
            }
        }
    }
}

/// Reject any mutation of a job whose status is already terminal.
fn ensure_mutable(row: &JobRow) -> Result<()> {
    let current = row.status()?;
    if current.is_terminal() {
        return Err(JobPlaneError::StateConflict {
            job_id: row.id.clone(),
            status: current,
        });
    }
    Ok(())
}

fn apply_status(row: &mut JobRow, status: JobStatus) {
    row.status = status.as_str().to_string();
    if status == JobStatus::Running && row.activated_at.is_none() {
        row.activated_at = Some(Utc::now());
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<()> {
        let mut table = self.table.write().await;
        if table.rows.contains_key(&job.id) {
            return Err(JobPlaneError::Persistence(format!(
                "job {} already exists",
                job.id
            )));
        }
        if table.live_count() >= self.max_jobs {
            return Err(JobPlaneError::Persistence(format!(
                "job store is at capacity ({} jobs)",
                self.max_jobs
            )));
        }

        table.next_pk += 1;
        let row = JobRow::from_job(table.next_pk, job)?;
        table.rows.insert(job.id.clone(), row);
        tracing::debug!(job_id = %job.id, "Job row created");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Job> {
        let table = self.table.read().await;
        let row = table
            .live(id)
            .ok_or_else(|| JobPlaneError::JobNotFound(id.to_string()))?;
        Job::try_from(row)
    }

    async fn update_status(
        &self,
        id: &str,
        message: &str,
        status: Option<JobStatus>,
    ) -> Result<()> {
        let mut table = self.table.write().await;
        let row = table.live_mut(id)?;
        ensure_mutable(row)?;

        if let Some(status) = status {
            apply_status(row, status);
        }
        if !message.is_empty() {
            row.message = message.to_string();
        }
        row.updated_at = Utc::now();
        tracing::info!(job_id = %id, status = %row.status, "Job status updated");
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        status: Option<JobStatus>,
        runtime_info: Option<serde_json::Value>,
        message: &str,
    ) -> Result<JobStatus> {
        let mut table = self.table.write().await;
        let row = table.live_mut(id)?;
        ensure_mutable(row)?;

        // Encode before touching the row so a failure leaves it unchanged.
        // An empty payload is treated as not supplied; it never clears info.
        let encoded_info = match runtime_info.as_ref().filter(|info| has_runtime_info(info)) {
            Some(info) => Some(encode_runtime_info(id, Some(info))?),
            None => None,
        };

        if let Some(status) = status {
            apply_status(row, status);
        }
        if let Some(info) = encoded_info {
            row.runtime_info = info;
        }
        if !message.is_empty() {
            row.message = message.to_string();
        }
        row.updated_at = Utc::now();
        row.status()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut table = self.table.write().await;
        let row = table.live_mut(id)?;
        row.deleted_at = Some(Utc::now());
        tracing::debug!(job_id = %id, "Job row deleted");
        Ok(())
    }

    async fn list_by_queue(&self, queue_id: &str, statuses: &[JobStatus]) -> Vec<Job> {
        let table = self.table.read().await;
        let mut jobs: Vec<Job> = table
            .rows
            .values()
            .filter(|row| !row.is_deleted() && row.queue_id == queue_id)
            .filter(|row| {
                row.status()
                    .map(|status| statuses.contains(&status))
                    .unwrap_or(false)
            })
            .filter_map(Self::to_job)
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    async fn list_by_run_prefix(&self, run_id: &str, job_id: Option<&str>) -> Result<Vec<Job>> {
        let prefix = format!("job-{}-", run_id);
        let table = self.table.read().await;
        let mut jobs: Vec<Job> = table
            .rows
            .values()
            .filter(|row| !row.is_deleted() && row.id.starts_with(&prefix))
            .filter(|row| job_id.map_or(true, |wanted| row.id == wanted))
            .map(Job::try_from)
            .collect::<Result<_>>()?;
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}
