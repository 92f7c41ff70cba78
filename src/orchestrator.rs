use std::future::Future;
use std::sync::Arc;

use crate::auth::{Action, AllowAll, Authorizer};
use crate::config::OrchestratorConfig;
use crate::context::RequestContext;
use crate::error::{JobPlaneError, Result};
use crate::job::request::{
    extension_template_to_yaml, CreateDisJobRequest, CreateJobResponse, CreateSingleJobRequest,
    CreateWfJobRequest,
};
use crate::job::{
    generate_id, priority, Job, JobConf, JobConfig, JobConfigBuilder, JobInfo, JobKind, JobStatus,
    JOB_PREFIX,
};
use crate::runtime::{RuntimeRegistry, RuntimeService};
use crate::store::{Directory, JobRepository};

/// Façade over the job store, the queue/cluster directory and the per-cluster
/// runtimes.
///
/// The store is only advanced after a runtime confirmed the matching change,
/// so a failed or aborted cluster call never leaves a half-applied record.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    repository: Arc<dyn JobRepository>,
    directory: Arc<dyn Directory>,
    runtimes: Arc<RuntimeRegistry>,
    authorizer: Arc<dyn Authorizer>,
    builder: JobConfigBuilder,
}

impl JobOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        repository: Arc<dyn JobRepository>,
        directory: Arc<dyn Directory>,
        runtimes: Arc<RuntimeRegistry>,
    ) -> Self {
        Self {
            config,
            repository,
            builder: JobConfigBuilder::new(directory.clone()),
            directory,
            runtimes,
            authorizer: Arc::new(AllowAll),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_builder(mut self, builder: JobConfigBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn runtimes(&self) -> &Arc<RuntimeRegistry> {
        &self.runtimes
    }

    fn authorize(&self, ctx: &RequestContext, action: Action, resource: &str) -> Result<()> {
        self.authorizer.authorize(&ctx.subject, action, resource)
    }

    /// Await a store or directory call within the request's bounds.
    async fn store<T>(&self, ctx: &RequestContext, fut: impl Future<Output = Result<T>>) -> Result<T> {
        ctx.guard(self.config.repository_timeout(), fut)
            .await
            .map_err(|aborted| JobPlaneError::Persistence(format!("job store call aborted: {}", aborted)))?
    }

    /// Await a runtime call within the request's bounds. Any failure, including
    /// an abort, is a runtime error: the outcome on the cluster is unknown.
    async fn on_cluster(
        &self,
        ctx: &RequestContext,
        cluster_id: &str,
        fut: impl Future<Output = Result<()>>,
    ) -> Result<()> {
        match ctx.guard(self.config.runtime_timeout(), fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e @ JobPlaneError::Runtime { .. })) => Err(e),
            Ok(Err(other)) => Err(JobPlaneError::runtime(cluster_id, other.to_string())),
            Err(aborted) => Err(JobPlaneError::runtime(
                cluster_id,
                format!("runtime call aborted: {}", aborted),
            )),
        }
    }

    /// Resolve the runtime of the cluster that owns `job`'s queue.
    async fn runtime_for(&self, ctx: &RequestContext, job: &Job) -> Result<Arc<dyn RuntimeService>> {
        let queue = self
            .store(ctx, self.directory.get_queue_by_id(&job.queue_id))
            .await?;
        let cluster = self
            .store(ctx, self.directory.get_cluster_by_id(&queue.cluster_id))
            .await?;

        ctx.guard(self.config.runtime_timeout(), self.runtimes.get_or_create(&cluster))
            .await
            .map_err(|aborted| {
                JobPlaneError::runtime_init(&cluster.id, format!("construction aborted: {}", aborted))
            })?
    }

    /// Build, validate and persist a single-container job.
    pub async fn create_single_job(
        &self,
        ctx: &RequestContext,
        mut request: CreateSingleJobRequest,
    ) -> Result<CreateJobResponse> {
        self.authorize(ctx, Action::Create, "job")?;
        request.common.user_name = ctx.subject.clone();

        let extension_template = extension_template_to_yaml(&request.spec.extension_template)
            .map_err(|e| {
                tracing::error!(job = %request.common.name, error = %e, "Failed to convert extension template");
                e
            })?;
        let config = self
            .store(ctx, self.builder.build_single(&request))
            .await
            .map_err(|e| {
                tracing::error!(job = %request.common.name, error = %e, "Failed to build job configuration");
                e
            })?;

        let id = self
            .create_job(ctx, config, &request.common.id, extension_template)
            .await?;
        Ok(CreateJobResponse { id })
    }

    pub async fn create_distributed_job(
        &self,
        ctx: &RequestContext,
        request: &CreateDisJobRequest,
    ) -> Result<CreateJobResponse> {
        self.authorize(ctx, Action::Create, "job")?;
        Err(unsupported_kind(JobKind::Distributed, &request.common.name))
    }

    pub async fn create_workflow_job(
        &self,
        ctx: &RequestContext,
        request: &CreateWfJobRequest,
    ) -> Result<CreateJobResponse> {
        self.authorize(ctx, Action::Create, "job")?;
        Err(unsupported_kind(JobKind::Workflow, &request.common.name))
    }

    /// Admit a job: validate, normalize priority, assign an ID and persist it
    /// in the `Init` state. Nothing is sent to a cluster here.
    pub async fn create_job(
        &self,
        ctx: &RequestContext,
        mut config: JobConfig,
        requested_id: &str,
        extension_template: String,
    ) -> Result<String> {
        config.validate().map_err(|e| {
            tracing::error!(job = %config.name(), error = %e, "Job validation failed");
            e
        })?;
        let normalized = priority::normalize(config.priority()).map_err(|e| {
            tracing::error!(job = %config.name(), error = %e, "Job priority check failed");
            e
        })?;
        config.set_priority(normalized);

        let id = if requested_id.is_empty() {
            generate_id(JOB_PREFIX)
        } else {
            requested_id.to_string()
        };

        let job = Job::new(id, config, extension_template);
        self.store(ctx, self.repository.create(&job))
            .await
            .map_err(|e| {
                tracing::error!(job_id = %job.id, error = %e, "Failed to persist job");
                match e {
                    JobPlaneError::Persistence(_) => e,
                    other => JobPlaneError::Persistence(other.to_string()),
                }
            })?;

        tracing::info!(job_id = %job.id, queue_id = %job.queue_id, kind = %job.kind, "Job created");
        Ok(job.id)
    }

    /// Ask the owning cluster to stop a job. The record itself is advanced
    /// later by status reports, once the cluster observed the stop.
    pub async fn stop_job(&self, ctx: &RequestContext, job_id: &str) -> Result<()> {
        self.authorize(ctx, Action::Stop, job_id)?;
        let job = self.store(ctx, self.repository.get_by_id(job_id)).await?;

        if job.status.is_terminal() {
            tracing::warn!(job_id, status = %job.status, "Job already finished, cannot stop");
            return Err(JobPlaneError::StateConflict {
                job_id: job.id,
                status: job.status,
            });
        }

        let runtime = self.runtime_for(ctx, &job).await?;
        let info = JobInfo::from(&job);
        self.on_cluster(ctx, runtime.cluster_id(), runtime.stop_job(&info))
            .await
            .map_err(|e| {
                tracing::error!(job_id, error = %e, "Failed to stop job on cluster");
                e
            })?;

        tracing::info!(job_id, cluster_id = %runtime.cluster_id(), "Job stop requested");
        Ok(())
    }

    /// Remove a job from its cluster, then delete its record.
    ///
    /// Jobs in any status may be deleted. A cluster failure leaves the record
    /// untouched; a store failure after the cluster confirmed is reported as
    /// a persistence error so the two sides are never confused.
    pub async fn delete_job(&self, ctx: &RequestContext, job_id: &str) -> Result<()> {
        self.authorize(ctx, Action::Delete, job_id)?;
        let job = self.store(ctx, self.repository.get_by_id(job_id)).await?;

        let runtime = self.runtime_for(ctx, &job).await?;
        let info = JobInfo::from(&job);
        self.on_cluster(ctx, runtime.cluster_id(), runtime.delete_job(&info))
            .await
            .map_err(|e| {
                tracing::error!(job_id, error = %e, "Failed to delete job from cluster");
                e
            })?;

        self.store(ctx, self.repository.delete(job_id))
            .await
            .map_err(|e| match e {
                JobPlaneError::JobNotFound(_) => e,
                other => {
                    tracing::error!(job_id, error = %other, "Job removed from cluster but its record could not be deleted");
                    let cause = match other {
                        JobPlaneError::Persistence(msg) => msg,
                        other => other.to_string(),
                    };
                    JobPlaneError::Persistence(format!(
                        "job {} was removed from cluster {} but deleting its record failed: {}",
                        job_id,
                        runtime.cluster_id(),
                        cause
                    ))
                }
            })?;

        tracing::info!(job_id, cluster_id = %runtime.cluster_id(), "Job deleted");
        Ok(())
    }

    pub async fn get_job(&self, ctx: &RequestContext, job_id: &str) -> Result<Job> {
        self.authorize(ctx, Action::Read, job_id)?;
        self.store(ctx, self.repository.get_by_id(job_id)).await
    }

    pub async fn list_queue_jobs(
        &self,
        ctx: &RequestContext,
        queue_id: &str,
        statuses: &[JobStatus],
    ) -> Result<Vec<Job>> {
        self.authorize(ctx, Action::Read, queue_id)?;
        let jobs = async {
            Ok::<_, JobPlaneError>(self.repository.list_by_queue(queue_id, statuses).await)
        };
        self.store(ctx, jobs).await
    }

    pub async fn list_run_jobs(
        &self,
        ctx: &RequestContext,
        run_id: &str,
        job_id: Option<&str>,
    ) -> Result<Vec<Job>> {
        self.authorize(ctx, Action::Read, run_id)?;
        self.store(ctx, self.repository.list_by_run_prefix(run_id, job_id))
            .await
    }

    /// Record a status observed on a cluster. Terminal jobs reject the report
    /// with `StateConflict` so a stale watcher is visible to its caller.
    pub async fn report_status(
        &self,
        ctx: &RequestContext,
        job_id: &str,
        status: Option<JobStatus>,
        runtime_info: Option<serde_json::Value>,
        message: &str,
    ) -> Result<JobStatus> {
        self.authorize(ctx, Action::Update, job_id)?;
        let status = self
            .store(ctx, self.repository.update(job_id, status, runtime_info, message))
            .await?;
        tracing::debug!(job_id, status = %status, "Job status reported");
        Ok(status)
    }
}

fn unsupported_kind(kind: JobKind, name: &str) -> JobPlaneError {
    tracing::warn!(job = %name, %kind, "Rejected job of unsupported kind");
    JobPlaneError::Validation(format!("{} jobs are not supported yet", kind))
}
