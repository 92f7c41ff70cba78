use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Timeouts applied to every blocking call the orchestrator makes.
///
/// These bound a request even when its caller set no deadline of its own.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound for one call into a cluster runtime (create/stop/delete).
    pub runtime_timeout_ms: u64,
    /// Upper bound for one job repository or directory call.
    pub repository_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            runtime_timeout_ms: 30_000,
            repository_timeout_ms: 5_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn runtime_timeout(&self) -> Duration {
        Duration::from_millis(self.runtime_timeout_ms)
    }

    pub fn repository_timeout(&self) -> Duration {
        Duration::from_millis(self.repository_timeout_ms)
    }
}

/// Settings for the built-in job store.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Maximum number of live job records.
    pub max_jobs: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self { max_jobs: 100_000 }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// JSON file with clusters, queues and flavours. Empty directory when unset.
    pub directory_path: Option<PathBuf>,
    pub orchestrator: OrchestratorConfig,
    pub repository: RepositoryConfig,
    /// Subjects allowed to call the API. Empty means everyone.
    pub allowed_users: BTreeSet<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8999)),
            directory_path: None,
            orchestrator: OrchestratorConfig::default(),
            repository: RepositoryConfig::default(),
            allowed_users: BTreeSet::new(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_directory(mut self, path: PathBuf) -> Self {
        self.directory_path = Some(path);
        self
    }

    pub fn with_allowed_user(mut self, user: impl Into<String>) -> Self {
        self.allowed_users.insert(user.into());
        self
    }
}
