use std::sync::Arc;

use crate::error::{JobPlaneError, Result};
use crate::fs;
use crate::job::config::{JobConf, JobConfig, SingleConf, ENV_JOB_QUEUE_NAME, ENV_JOB_TYPE};
use crate::job::priority;
use crate::job::request::{CommonJobInfo, CreateSingleJobRequest};
use crate::store::Directory;

/// Image used when a single job does not name one.
pub const DEFAULT_IMAGE: &str = "alpine:latest";

/// Turns submission requests into validated job configurations.
///
/// Only directory lookups happen here; nothing is persisted and no runtime
/// is contacted, so any failure leaves no trace.
pub struct JobConfigBuilder {
    directory: Arc<dyn Directory>,
    default_image: String,
}

impl JobConfigBuilder {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            default_image: DEFAULT_IMAGE.to_string(),
        }
    }

    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = image.into();
        self
    }

    pub async fn build_single(&self, request: &CreateSingleJobRequest) -> Result<JobConfig> {
        let spec = &request.spec;
        let mut conf = SingleConf {
            image: if spec.image.is_empty() {
                self.default_image.clone()
            } else {
                spec.image.clone()
            },
            command: spec.command.clone(),
            args: spec.args.clone(),
            port: spec.port,
            ..Default::default()
        };
        conf.set_name(&request.common.name);
        conf.common.labels = request.common.labels.clone();
        conf.common.annotations = request.common.annotations.clone();
        conf.common.env = spec.env.clone();
        conf.common.file_system = spec.file_system.clone();
        conf.common.extra_file_systems = spec.extra_file_systems.clone();

        let mut config = JobConfig::Single(conf);
        self.bind_queue(&mut config, &request.common).await?;

        config.set_priority(priority::normalize(
            &request.common.scheduling_policy.priority,
        )?);

        if spec.flavour.name.is_empty() {
            return Err(JobPlaneError::Validation("flavour is required".to_string()));
        }
        let flavour = self.directory.get_flavour_by_name(&spec.flavour.name).await?;
        config.set_flavour(&flavour.name);

        if !spec.file_system.name.is_empty() {
            config.set_fs(&fs::fs_id(&request.common.user_name, &spec.file_system.name));
        }

        config.set_env(ENV_JOB_TYPE, config.kind().as_str());
        config.set_user_name(&request.common.user_name);

        tracing::debug!(
            name = %config.name(),
            queue_id = %config.queue_id(),
            cluster_id = %config.cluster_id(),
            priority = %config.priority(),
            "Job configuration built"
        );
        Ok(config)
    }

    /// Resolve the scheduling queue and bind the job to its cluster/namespace.
    async fn bind_queue(&self, config: &mut JobConfig, common: &CommonJobInfo) -> Result<()> {
        let queue_id = &common.scheduling_policy.queue_id;
        if queue_id.is_empty() {
            return Err(JobPlaneError::Validation(
                "schedulingPolicy.queue is required".to_string(),
            ));
        }
        let queue = self.directory.get_queue_by_id(queue_id).await.map_err(|e| {
            tracing::warn!(job = %common.name, queue_id = %queue_id, error = %e, "Queue lookup failed");
            e
        })?;

        config.set_queue_id(&queue.id);
        config.set_env(ENV_JOB_QUEUE_NAME, &queue.name);
        config.set_cluster_id(&queue.cluster_id);
        config.set_namespace(&queue.namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FileSystem, Flavour};
    use crate::store::{Cluster, InMemoryDirectory, Queue};

    fn directory() -> Arc<dyn Directory> {
        Arc::new(
            InMemoryDirectory::new()
                .with_cluster(Cluster {
                    id: "c1".into(),
                    cluster_type: "docker".into(),
                    ..Default::default()
                })
                .with_queue(Queue {
                    id: "q1".into(),
                    name: "default-queue".into(),
                    cluster_id: "c1".into(),
                    namespace: "ns1".into(),
                })
                .with_flavour(Flavour {
                    name: "flavor.small".into(),
                    ..Default::default()
                }),
        )
    }

    fn request() -> CreateSingleJobRequest {
        let mut req = CreateSingleJobRequest::default();
        req.common.name = "job1".into();
        req.common.user_name = "alice".into();
        req.common.scheduling_policy.queue_id = "q1".into();
        req.spec.flavour.name = "flavor.small".into();
        req
    }

    #[tokio::test]
    async fn binds_queue_cluster_and_namespace() {
        let config = JobConfigBuilder::new(directory())
            .build_single(&request())
            .await
            .unwrap();
        assert_eq!(config.queue_id(), "q1");
        assert_eq!(config.cluster_id(), "c1");
        assert_eq!(config.namespace(), "ns1");
        assert_eq!(config.priority(), "normal");
        assert_eq!(config.flavour(), "flavor.small");
        assert_eq!(config.user_name(), "alice");
        assert_eq!(
            config.env().get(ENV_JOB_QUEUE_NAME).map(String::as_str),
            Some("default-queue")
        );
        assert_eq!(
            config.env().get(ENV_JOB_TYPE).map(String::as_str),
            Some("single")
        );
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn unknown_queue_fails_before_anything_else() {
        let mut req = request();
        req.common.scheduling_policy.queue_id = "missing".into();
        req.common.scheduling_policy.priority = "urgent".into();
        let err = JobConfigBuilder::new(directory())
            .build_single(&req)
            .await
            .unwrap_err();
        assert_eq!(err, JobPlaneError::QueueNotFound("missing".into()));
    }

    #[tokio::test]
    async fn invalid_priority_propagates_unchanged() {
        let mut req = request();
        req.common.scheduling_policy.priority = "urgent".into();
        let err = JobConfigBuilder::new(directory())
            .build_single(&req)
            .await
            .unwrap_err();
        assert_eq!(err, JobPlaneError::InvalidPriority("urgent".into()));
    }

    #[tokio::test]
    async fn unknown_flavour_is_rejected() {
        let mut req = request();
        req.spec.flavour.name = "flavor.huge".into();
        let err = JobConfigBuilder::new(directory())
            .build_single(&req)
            .await
            .unwrap_err();
        assert_eq!(err, JobPlaneError::FlavourNotFound("flavor.huge".into()));
    }

    #[tokio::test]
    async fn filesystem_id_is_derived_from_user() {
        let mut req = request();
        req.spec.file_system = FileSystem {
            name: "home".into(),
            ..Default::default()
        };
        let config = JobConfigBuilder::new(directory())
            .build_single(&req)
            .await
            .unwrap();
        assert_eq!(config.fs_id(), "fs-alice-home");
    }

    #[tokio::test]
    async fn image_falls_back_to_default() {
        let config = JobConfigBuilder::new(directory())
            .with_default_image("busybox:1")
            .build_single(&request())
            .await
            .unwrap();
        match config {
            JobConfig::Single(conf) => assert_eq!(conf.image, "busybox:1"),
            other => panic!("unexpected config {:?}", other),
        }
    }
}
