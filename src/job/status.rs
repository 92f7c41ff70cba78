use serde::{Deserialize, Serialize};

/// Lifecycle of a job: `Init -> Pending -> Running -> {Succeeded, Failed, Terminated}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Init,
    Pending,
    Running,
    Succeeded,
    Failed,
    Terminated,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Init,
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
        JobStatus::Terminated,
    ];

    /// Terminal statuses are immutable: no further transition is accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Terminated
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Init => "init",
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status {:?}", s))
    }
}
