use thiserror::Error;

use crate::job::JobStatus;

/// Coarse error categories exposed to callers and mapped onto HTTP codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Permission,
    Persistence,
    Runtime,
    RuntimeInit,
    StateConflict,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::NotFound => write!(f, "NotFoundError"),
            ErrorKind::Permission => write!(f, "PermissionError"),
            ErrorKind::Persistence => write!(f, "PersistenceError"),
            ErrorKind::Runtime => write!(f, "RuntimeError"),
            ErrorKind::RuntimeInit => write!(f, "RuntimeInitError"),
            ErrorKind::StateConflict => write!(f, "StateConflictError"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobPlaneError {
    #[error("Invalid job: {0}")]
    Validation(String),

    #[error("Invalid job priority: {0}")]
    InvalidPriority(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("Flavour not found: {0}")]
    FlavourNotFound(String),

    #[error("Permission denied: {subject} may not {action} {resource}")]
    PermissionDenied {
        subject: String,
        action: String,
        resource: String,
    },

    #[error("Job store error: {0}")]
    Persistence(String),

    #[error("Runtime error on cluster {cluster_id}: {message}")]
    Runtime { cluster_id: String, message: String },

    #[error("Failed to initialize runtime for cluster {cluster_id}: {message}")]
    RuntimeInit { cluster_id: String, message: String },

    #[error("Job {job_id} is already {status}")]
    StateConflict { job_id: String, status: JobStatus },
}

impl JobPlaneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobPlaneError::Validation(_) | JobPlaneError::InvalidPriority(_) => {
                ErrorKind::Validation
            }
            JobPlaneError::JobNotFound(_)
            | JobPlaneError::QueueNotFound(_)
            | JobPlaneError::ClusterNotFound(_)
            | JobPlaneError::FlavourNotFound(_) => ErrorKind::NotFound,
            JobPlaneError::PermissionDenied { .. } => ErrorKind::Permission,
            JobPlaneError::Persistence(_) => ErrorKind::Persistence,
            JobPlaneError::Runtime { .. } => ErrorKind::Runtime,
            JobPlaneError::RuntimeInit { .. } => ErrorKind::RuntimeInit,
            JobPlaneError::StateConflict { .. } => ErrorKind::StateConflict,
        }
    }

    pub fn runtime(cluster_id: impl Into<String>, message: impl Into<String>) -> Self {
        JobPlaneError::Runtime {
            cluster_id: cluster_id.into(),
            message: message.into(),
        }
    }

    pub fn runtime_init(cluster_id: impl Into<String>, message: impl Into<String>) -> Self {
        JobPlaneError::RuntimeInit {
            cluster_id: cluster_id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobPlaneError>;
