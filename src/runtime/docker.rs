use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{JobPlaneError, Result};
use crate::job::{JobConf, JobConfig, JobInfo};
use crate::runtime::service::{RuntimeFactory, RuntimeService};
use crate::store::Cluster;

pub const CLUSTER_TYPE_DOCKER: &str = "docker";

const LABEL_JOB_ID: &str = "jobplane.job-id";
const LABEL_QUEUE: &str = "jobplane.queue";
const LABEL_NAMESPACE: &str = "jobplane.namespace";
const LABEL_PRIORITY: &str = "jobplane.priority";

/// Runs single jobs as detached containers on a docker daemon.
///
/// The cluster endpoint is passed as `--host`; an empty endpoint targets the
/// daemon of the local environment. Each container is named after its job ID.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    cluster_id: String,
    host: Option<String>,
}

impl DockerRuntime {
    /// Connect to the cluster's daemon, failing if it cannot be reached.
    pub async fn connect(cluster: &Cluster) -> Result<Self> {
        if cluster.cluster_type != CLUSTER_TYPE_DOCKER {
            return Err(JobPlaneError::runtime_init(
                &cluster.id,
                format!("cluster type {:?} is not docker", cluster.cluster_type),
            ));
        }
        let runtime = Self {
            cluster_id: cluster.id.clone(),
            host: (!cluster.endpoint.is_empty()).then(|| cluster.endpoint.clone()),
        };

        let version = runtime
            .docker(vec![
                "version".to_string(),
                "--format".to_string(),
                "{{.Server.Version}}".to_string(),
            ])
            .await
            .map_err(|message| JobPlaneError::runtime_init(&cluster.id, message))?;
        tracing::info!(cluster_id = %cluster.id, server_version = %version.trim(), "Connected to docker daemon");
        Ok(runtime)
    }

    /// Arguments for `docker run` of a single job.
    pub fn run_args(job: &JobInfo) -> Result<Vec<String>> {
        let conf = match &job.config {
            JobConfig::Single(conf) => conf,
            other => {
                return Err(JobPlaneError::Validation(format!(
                    "docker runtime cannot run {} jobs",
                    other.kind()
                )))
            }
        };

        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            job.id.clone(),
        ];

        for (key, value) in [
            (LABEL_JOB_ID, job.id.as_str()),
            (LABEL_QUEUE, conf.queue_id()),
            (LABEL_NAMESPACE, conf.namespace()),
            (LABEL_PRIORITY, conf.priority()),
        ] {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }

        let mut env: Vec<_> = conf.env().iter().collect();
        env.sort();
        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        if conf.port > 0 {
            args.push("-p".to_string());
            args.push(conf.port.to_string());
        }

        args.push(conf.image.clone());
        if !conf.command.is_empty() {
            args.push("sh".to_string());
            args.push("-c".to_string());
            args.push(conf.command.clone());
        }
        args.extend(conf.args.iter().cloned());
        Ok(args)
    }

    /// Run a docker CLI command, returning stdout or an error message.
    async fn docker(&self, mut args: Vec<String>) -> std::result::Result<String, String> {
        if let Some(host) = &self.host {
            args.insert(0, host.clone());
            args.insert(0, "--host".to_string());
        }

        let output = Command::new("docker")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| format!("failed to run docker: {}", e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(if stderr.is_empty() {
                format!("docker exited with {:?}", output.status.code())
            } else {
                stderr
            })
        }
    }

    fn failed(&self, job: &JobInfo, action: &str, message: String) -> JobPlaneError {
        tracing::error!(cluster_id = %self.cluster_id, job_id = %job.id, action, error = %message, "Docker call failed");
        JobPlaneError::runtime(&self.cluster_id, format!("{} job {}: {}", action, job.id, message))
    }
}

fn is_missing_container(message: &str) -> bool {
    message.contains("No such container")
}

#[async_trait]
impl RuntimeService for DockerRuntime {
    fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    async fn create_job(&self, job: &JobInfo) -> Result<()> {
        let args = Self::run_args(job)
            .map_err(|e| JobPlaneError::runtime(&self.cluster_id, e.to_string()))?;
        let container = self
            .docker(args)
            .await
            .map_err(|message| self.failed(job, "create", message))?;
        tracing::info!(cluster_id = %self.cluster_id, job_id = %job.id, container = %container.trim(), "Job container started");
        Ok(())
    }

    async fn stop_job(&self, job: &JobInfo) -> Result<()> {
        self.docker(vec!["stop".to_string(), job.id.clone()])
            .await
            .map_err(|message| self.failed(job, "stop", message))?;
        tracing::info!(cluster_id = %self.cluster_id, job_id = %job.id, "Job container stopped");
        Ok(())
    }

    async fn delete_job(&self, job: &JobInfo) -> Result<()> {
        match self
            .docker(vec!["rm".to_string(), "-f".to_string(), job.id.clone()])
            .await
        {
            Ok(_) => {}
            // Already gone: deleting is idempotent.
            Err(message) if is_missing_container(&message) => {
                tracing::debug!(job_id = %job.id, "Job container already removed");
            }
            Err(message) => return Err(self.failed(job, "delete", message)),
        }
        tracing::info!(cluster_id = %self.cluster_id, job_id = %job.id, "Job container removed");
        Ok(())
    }
}

/// Picks a runtime backend by `Cluster::cluster_type`.
#[derive(Debug, Default, Clone)]
pub struct DefaultRuntimeFactory;

#[async_trait]
impl RuntimeFactory for DefaultRuntimeFactory {
    async fn build(&self, cluster: &Cluster) -> Result<Arc<dyn RuntimeService>> {
        match cluster.cluster_type.as_str() {
            CLUSTER_TYPE_DOCKER => {
                let runtime = DockerRuntime::connect(cluster).await?;
                Ok(Arc::new(runtime))
            }
            other => Err(JobPlaneError::runtime_init(
                &cluster.id,
                format!("unsupported cluster type {:?}", other),
            )),
        }
    }
}
