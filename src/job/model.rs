use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::config::{JobConf, JobConfig, JobKind};
use crate::job::status::JobStatus;

/// Prefix of every generated job ID. Pipeline runs name their jobs
/// `job-<runID>-<step>`, which is what run-prefix listing relies on.
pub const JOB_PREFIX: &str = "job";

/// Generate a fresh `<prefix>-<12 hex chars>` identifier.
pub fn generate_id(prefix: &str) -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &raw[..12])
}

/// Domain view of a submitted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub user_name: String,
    pub queue_id: String,
    pub kind: JobKind,
    pub config: JobConfig,
    pub extension_template: String,
    pub status: JobStatus,
    pub message: String,
    /// Backend-reported details, only present once a cluster accepted the job.
    pub runtime_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A freshly admitted job in the `Init` state.
    pub fn new(id: String, config: JobConfig, extension_template: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_name: config.user_name().to_string(),
            queue_id: config.queue_id().to_string(),
            kind: config.kind(),
            config,
            extension_template,
            status: JobStatus::Init,
            message: String::new(),
            runtime_info: None,
            created_at: now,
            updated_at: now,
            activated_at: None,
        }
    }
}

/// Read-only projection of a job handed to a runtime backend.
#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub id: String,
    pub kind: JobKind,
    pub config: JobConfig,
    pub status: JobStatus,
    pub extension_template: String,
}

impl From<&Job> for JobInfo {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            kind: job.kind,
            config: job.config.clone(),
            status: job.status,
            extension_template: job.extension_template.clone(),
        }
    }
}
