use chrono::{DateTime, Utc};

use crate::error::{JobPlaneError, Result};
use crate::job::{Job, JobConfig, JobKind, JobStatus};

/// Runtime info column value meaning "nothing reported yet".
pub const EMPTY_RUNTIME_INFO: &str = "{}";

/// Storage representation of a job.
///
/// Structured fields are kept as JSON text so the row stays flat; mapping to
/// and from [`Job`] happens only at the repository boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub pk: i64,
    pub id: String,
    pub user_name: String,
    pub queue_id: String,
    pub kind: String,
    pub config: String,
    pub extension_template: String,
    pub runtime_info: String,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl JobRow {
    pub fn from_job(pk: i64, job: &Job) -> Result<Self> {
        let config = serde_json::to_string(&job.config).map_err(|e| {
            JobPlaneError::Persistence(format!("encode config of job {}: {}", job.id, e))
        })?;
        let runtime_info = encode_runtime_info(&job.id, job.runtime_info.as_ref())?;

        Ok(Self {
            pk,
            id: job.id.clone(),
            user_name: job.user_name.clone(),
            queue_id: job.queue_id.clone(),
            kind: job.kind.as_str().to_string(),
            config,
            extension_template: job.extension_template.clone(),
            runtime_info,
            status: job.status.as_str().to_string(),
            message: job.message.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
            activated_at: job.activated_at,
            deleted_at: None,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn status(&self) -> Result<JobStatus> {
        self.status.parse::<JobStatus>().map_err(|e| {
            JobPlaneError::Persistence(format!("job {} has a corrupt status: {}", self.id, e))
        })
    }
}

/// Whether `value` carries anything worth storing. `null` and `{}` collapse
/// to the empty column value and would read back as absent.
pub fn has_runtime_info(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

pub fn encode_runtime_info(job_id: &str, info: Option<&serde_json::Value>) -> Result<String> {
    match info {
        Some(value) => serde_json::to_string(value).map_err(|e| {
            JobPlaneError::Persistence(format!("encode runtime info of job {}: {}", job_id, e))
        }),
        None => Ok(EMPTY_RUNTIME_INFO.to_string()),
    }
}

impl TryFrom<&JobRow> for Job {
    type Error = JobPlaneError;

    fn try_from(row: &JobRow) -> Result<Self> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            JobPlaneError::Persistence(format!("job {} has a corrupt {}: {}", row.id, field, e))
        };

        let kind = row
            .kind
            .parse::<JobKind>()
            .map_err(|e| corrupt("kind", &e))?;
        let config: JobConfig =
            serde_json::from_str(&row.config).map_err(|e| corrupt("config", &e))?;
        let runtime_info = if row.runtime_info.is_empty() || row.runtime_info == EMPTY_RUNTIME_INFO
        {
            None
        } else {
            Some(serde_json::from_str(&row.runtime_info).map_err(|e| corrupt("runtime info", &e))?)
        };

        Ok(Job {
            id: row.id.clone(),
            user_name: row.user_name.clone(),
            queue_id: row.queue_id.clone(),
            kind,
            config,
            extension_template: row.extension_template.clone(),
            status: row.status()?,
            message: row.message.clone(),
            runtime_info,
            created_at: row.created_at,
            updated_at: row.updated_at,
            activated_at: row.activated_at,
        })
    }
}
