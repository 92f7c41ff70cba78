use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{JobPlaneError, Result};

/// Env key carrying the job kind marker.
pub const ENV_JOB_TYPE: &str = "JOBPLANE_JOB_TYPE";
/// Env key carrying the display name of the queue the job was submitted to.
pub const ENV_JOB_QUEUE_NAME: &str = "JOBPLANE_JOB_QUEUE_NAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Single,
    Distributed,
    Workflow,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Single => "single",
            JobKind::Distributed => "distributed",
            JobKind::Workflow => "workflow",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single" => Ok(JobKind::Single),
            "distributed" => Ok(JobKind::Distributed),
            "workflow" => Ok(JobKind::Workflow),
            other => Err(format!("unknown job kind {:?}", other)),
        }
    }
}

/// A filesystem reference declared by a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileSystem {
    pub name: String,
    pub mount_path: String,
    pub sub_path: String,
    pub read_only: bool,
}

/// Named resource template (cpu/memory/accelerator shape).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Flavour {
    pub name: String,
    pub cpu: String,
    pub mem: String,
    pub scalar_resources: HashMap<String, String>,
}

/// Fields shared by every job kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonConf {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub env: HashMap<String, String>,
    pub user_name: String,
    pub queue_id: String,
    pub cluster_id: String,
    pub namespace: String,
    pub flavour: String,
    pub priority: String,
    pub fs_id: String,
    pub file_system: FileSystem,
    pub extra_file_systems: Vec<FileSystem>,
}

impl CommonConf {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("queue", &self.queue_id),
            ("cluster", &self.cluster_id),
            ("namespace", &self.namespace),
        ] {
            if value.trim().is_empty() {
                return Err(JobPlaneError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

/// Capability contract shared by every job configuration variant.
///
/// The orchestrator and builder only talk to configurations through this
/// trait; the accessors below are provided on top of [`JobConf::common`].
pub trait JobConf {
    fn kind(&self) -> JobKind;
    fn common(&self) -> &CommonConf;
    fn common_mut(&mut self) -> &mut CommonConf;

    /// Structural validation: required fields present for this kind.
    fn validate(&self) -> Result<()>;

    fn name(&self) -> &str {
        &self.common().name
    }
    fn set_name(&mut self, name: &str) {
        self.common_mut().name = name.to_string();
    }
    fn env(&self) -> &HashMap<String, String> {
        &self.common().env
    }
    fn set_env(&mut self, key: &str, value: &str) {
        self.common_mut()
            .env
            .insert(key.to_string(), value.to_string());
    }
    fn queue_id(&self) -> &str {
        &self.common().queue_id
    }
    fn set_queue_id(&mut self, queue_id: &str) {
        self.common_mut().queue_id = queue_id.to_string();
    }
    fn cluster_id(&self) -> &str {
        &self.common().cluster_id
    }
    fn set_cluster_id(&mut self, cluster_id: &str) {
        self.common_mut().cluster_id = cluster_id.to_string();
    }
    fn namespace(&self) -> &str {
        &self.common().namespace
    }
    fn set_namespace(&mut self, namespace: &str) {
        self.common_mut().namespace = namespace.to_string();
    }
    fn flavour(&self) -> &str {
        &self.common().flavour
    }
    fn set_flavour(&mut self, flavour: &str) {
        self.common_mut().flavour = flavour.to_string();
    }
    fn priority(&self) -> &str {
        &self.common().priority
    }
    fn set_priority(&mut self, priority: &str) {
        self.common_mut().priority = priority.to_string();
    }
    fn user_name(&self) -> &str {
        &self.common().user_name
    }
    fn set_user_name(&mut self, user_name: &str) {
        self.common_mut().user_name = user_name.to_string();
    }
    fn fs_id(&self) -> &str {
        &self.common().fs_id
    }
    fn set_fs(&mut self, fs_id: &str) {
        self.common_mut().fs_id = fs_id.to_string();
    }
    /// Primary filesystem (when named) followed by the extra ones.
    fn file_systems(&self) -> Vec<&FileSystem> {
        let common = self.common();
        std::iter::once(&common.file_system)
            .filter(|fs| !fs.name.is_empty())
            .chain(common.extra_file_systems.iter())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SingleConf {
    #[serde(flatten)]
    pub common: CommonConf,
    pub image: String,
    pub command: String,
    pub args: Vec<String>,
    pub port: u16,
}

impl JobConf for SingleConf {
    fn kind(&self) -> JobKind {
        JobKind::Single
    }
    fn common(&self) -> &CommonConf {
        &self.common
    }
    fn common_mut(&mut self) -> &mut CommonConf {
        &mut self.common
    }
    fn validate(&self) -> Result<()> {
        self.common.validate()?;
        if self.common.flavour.trim().is_empty() {
            return Err(JobPlaneError::Validation("flavour is required".to_string()));
        }
        if self.image.trim().is_empty() {
            return Err(JobPlaneError::Validation("image is required".to_string()));
        }
        Ok(())
    }
}

/// One replicated role of a multi-member job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberConf {
    pub role: String,
    pub replicas: u32,
    pub image: String,
    pub command: String,
    pub args: Vec<String>,
    pub flavour: String,
}

fn validate_members(members: &[MemberConf]) -> Result<()> {
    if members.is_empty() {
        return Err(JobPlaneError::Validation(
            "at least one member is required".to_string(),
        ));
    }
    for member in members {
        if member.replicas == 0 {
            return Err(JobPlaneError::Validation(format!(
                "member {} needs at least one replica",
                member.role
            )));
        }
        if member.image.trim().is_empty() || member.flavour.trim().is_empty() {
            return Err(JobPlaneError::Validation(format!(
                "member {} requires an image and a flavour",
                member.role
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DistributedConf {
    #[serde(flatten)]
    pub common: CommonConf,
    pub framework: String,
    pub members: Vec<MemberConf>,
}

impl JobConf for DistributedConf {
    fn kind(&self) -> JobKind {
        JobKind::Distributed
    }
    fn common(&self) -> &CommonConf {
        &self.common
    }
    fn common_mut(&mut self) -> &mut CommonConf {
        &mut self.common
    }
    fn validate(&self) -> Result<()> {
        self.common.validate()?;
        if self.framework.trim().is_empty() {
            return Err(JobPlaneError::Validation("framework is required".to_string()));
        }
        validate_members(&self.members)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowConf {
    #[serde(flatten)]
    pub common: CommonConf,
    pub framework: String,
    pub members: Vec<MemberConf>,
}

impl JobConf for WorkflowConf {
    fn kind(&self) -> JobKind {
        JobKind::Workflow
    }
    fn common(&self) -> &CommonConf {
        &self.common
    }
    fn common_mut(&mut self) -> &mut CommonConf {
        &mut self.common
    }
    fn validate(&self) -> Result<()> {
        self.common.validate()?;
        validate_members(&self.members)
    }
}

/// Polymorphic job configuration, tagged by job kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobConfig {
    Single(SingleConf),
    Distributed(DistributedConf),
    Workflow(WorkflowConf),
}

impl JobConf for JobConfig {
    fn kind(&self) -> JobKind {
        match self {
            JobConfig::Single(conf) => conf.kind(),
            JobConfig::Distributed(conf) => conf.kind(),
            JobConfig::Workflow(conf) => conf.kind(),
        }
    }
    fn common(&self) -> &CommonConf {
        match self {
            JobConfig::Single(conf) => conf.common(),
            JobConfig::Distributed(conf) => conf.common(),
            JobConfig::Workflow(conf) => conf.common(),
        }
    }
    fn common_mut(&mut self) -> &mut CommonConf {
        match self {
            JobConfig::Single(conf) => conf.common_mut(),
            JobConfig::Distributed(conf) => conf.common_mut(),
            JobConfig::Workflow(conf) => conf.common_mut(),
        }
    }
    fn validate(&self) -> Result<()> {
        match self {
            JobConfig::Single(conf) => conf.validate(),
            JobConfig::Distributed(conf) => conf.validate(),
            JobConfig::Workflow(conf) => conf.validate(),
        }
    }
}
