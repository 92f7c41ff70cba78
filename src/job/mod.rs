pub mod builder;
pub mod config;
pub mod model;
pub mod priority;
pub mod request;
pub mod status;

pub use builder::JobConfigBuilder;
pub use config::{
    CommonConf, DistributedConf, FileSystem, Flavour, JobConf, JobConfig, JobKind, MemberConf,
    SingleConf, WorkflowConf,
};
pub use model::{generate_id, Job, JobInfo, JOB_PREFIX};
pub use status::JobStatus;
