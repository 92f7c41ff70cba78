use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{JobPlaneError, Result};
use crate::job::config::{FileSystem, Flavour};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingPolicy {
    #[serde(rename = "queue")]
    pub queue_id: String,
    pub priority: String,
}

/// Fields common to every submission request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonJobInfo {
    pub id: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub scheduling_policy: SchedulingPolicy,
    /// Filled from the authenticated subject, never from the request body.
    #[serde(skip)]
    pub user_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSpec {
    pub flavour: Flavour,
    pub file_system: FileSystem,
    pub extra_file_systems: Vec<FileSystem>,
    pub image: String,
    pub env: HashMap<String, String>,
    pub command: String,
    pub args: Vec<String>,
    pub port: u16,
    pub extension_template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSingleJobRequest {
    #[serde(flatten)]
    pub common: CommonJobInfo,
    #[serde(flatten)]
    pub spec: JobSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberSpec {
    #[serde(flatten)]
    pub common: CommonJobInfo,
    #[serde(flatten)]
    pub spec: JobSpec,
    pub role: String,
    pub replicas: u32,
}

/// Distributed and workflow submissions share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateMultiMemberJobRequest {
    #[serde(flatten)]
    pub common: CommonJobInfo,
    pub framework: String,
    pub members: Vec<MemberSpec>,
    pub extension_template: String,
}

pub type CreateDisJobRequest = CreateMultiMemberJobRequest;
pub type CreateWfJobRequest = CreateMultiMemberJobRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    pub id: String,
}

/// Convert a JSON extension template into the YAML document that is stored
/// with the job. An empty template stays empty.
pub fn extension_template_to_yaml(template: &str) -> Result<String> {
    if template.trim().is_empty() {
        return Ok(String::new());
    }
    let value: serde_json::Value = serde_json::from_str(template).map_err(|e| {
        JobPlaneError::Validation(format!("extension template is not valid JSON: {}", e))
    })?;
    serde_yaml::to_string(&value).map_err(|e| {
        JobPlaneError::Validation(format!("extension template cannot be rendered as YAML: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_job_request() {
        let body = r#"{
            "id": "",
            "name": "job1",
            "labels": {"team": "ml"},
            "schedulingPolicy": {"queue": "q1", "priority": "high"},
            "flavour": {"name": "flavor.small"},
            "fileSystem": {"name": "home", "mountPath": "/home/work"},
            "image": "alpine:latest",
            "env": {"A": "1"},
            "args": ["-c", "echo hi"],
            "port": 8080
        }"#;
        let req: CreateSingleJobRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.common.name, "job1");
        assert_eq!(req.common.scheduling_policy.queue_id, "q1");
        assert_eq!(req.common.scheduling_policy.priority, "high");
        assert_eq!(req.spec.flavour.name, "flavor.small");
        assert_eq!(req.spec.file_system.mount_path, "/home/work");
        assert_eq!(req.spec.port, 8080);
        assert!(req.common.user_name.is_empty());
    }

    #[test]
    fn extension_template_becomes_yaml() {
        let yaml = extension_template_to_yaml(r#"{"apiVersion":"v1","kind":"Pod"}"#).unwrap();
        assert!(yaml.contains("apiVersion: v1"));
        assert!(yaml.contains("kind: Pod"));
    }

    #[test]
    fn empty_extension_template_stays_empty() {
        assert_eq!(extension_template_to_yaml("").unwrap(), "");
    }

    #[test]
    fn malformed_extension_template_is_rejected() {
        assert!(matches!(
            extension_template_to_yaml("{not json"),
            Err(JobPlaneError::Validation(_))
        ));
    }
}
