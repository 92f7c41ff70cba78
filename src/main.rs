use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use jobplane::api::{self, ApiState};
use jobplane::auth::UserAllowList;
use jobplane::config::{OrchestratorConfig, RepositoryConfig, ServerConfig};
use jobplane::orchestrator::JobOrchestrator;
use jobplane::runtime::{DefaultRuntimeFactory, RuntimeRegistry};
use jobplane::shutdown::install_shutdown_handler;
use jobplane::store::{InMemoryDirectory, InMemoryJobRepository};

#[derive(Parser, Debug)]
#[command(name = "jobplane")]
#[command(version)]
#[command(about = "Job orchestration control plane for container clusters")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),

    /// Load a directory seed file and print what it contains
    ValidateDirectory {
        /// Path to the JSON seed file
        path: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value = "8999")]
    port: u16,

    /// JSON file with clusters, queues and flavours
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Upper bound for one cluster runtime call, in milliseconds
    #[arg(long, default_value = "30000")]
    runtime_timeout_ms: u64,

    /// Upper bound for one job store or directory call, in milliseconds
    #[arg(long, default_value = "5000")]
    repository_timeout_ms: u64,

    /// Maximum number of job records kept in memory
    #[arg(long, default_value = "100000")]
    max_jobs: usize,

    /// Subject allowed to call the API (repeatable). Everyone when omitted.
    #[arg(long = "allow-user")]
    allow_user: Vec<String>,
}

impl ServeArgs {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], self.port)));
        config.directory_path = self.directory;
        config.orchestrator = OrchestratorConfig {
            runtime_timeout_ms: self.runtime_timeout_ms,
            repository_timeout_ms: self.repository_timeout_ms,
        };
        config.repository = RepositoryConfig {
            max_jobs: self.max_jobs,
        };
        config.allowed_users = self.allow_user.into_iter().collect();
        config
    }
}

fn load_directory(path: Option<&PathBuf>) -> Result<InMemoryDirectory, Box<dyn std::error::Error>> {
    match path {
        Some(path) => InMemoryDirectory::from_json_file(path)
            .map_err(|e| format!("failed to load directory {}: {}", path.display(), e).into()),
        None => {
            tracing::warn!("No directory file given, starting with an empty directory");
            Ok(InMemoryDirectory::new())
        }
    }
}

async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let directory = load_directory(config.directory_path.as_ref())?;
    let (clusters, queues, flavours) = directory.summary().await;

    tracing::info!(
        listen_addr = %config.listen_addr,
        clusters,
        queues,
        flavours,
        max_jobs = config.repository.max_jobs,
        runtime_timeout_ms = config.orchestrator.runtime_timeout_ms,
        repository_timeout_ms = config.orchestrator.repository_timeout_ms,
        allowed_users = ?config.allowed_users,
        "Starting jobplane"
    );

    let repository = Arc::new(InMemoryJobRepository::from_config(&config.repository));
    let runtimes = Arc::new(RuntimeRegistry::new(Arc::new(DefaultRuntimeFactory)));
    let orchestrator = JobOrchestrator::new(
        config.orchestrator.clone(),
        repository,
        Arc::new(directory),
        runtimes,
    )
    .with_authorizer(Arc::new(UserAllowList::new(config.allowed_users.clone())));

    let shutdown = install_shutdown_handler();
    let state = ApiState {
        orchestrator: Arc::new(orchestrator),
    };
    api::run_api(config.listen_addr, state, shutdown).await?;

    tracing::info!("jobplane stopped");
    Ok(())
}

async fn validate_directory(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let directory = load_directory(Some(&path))?;
    let (clusters, queues, flavours) = directory.summary().await;
    println!("Directory {} is valid", path.display());
    println!("  clusters: {}", clusters);
    println!("  queues:   {}", queues);
    println!("  flavours: {}", flavours);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => {
            run_server(serve_args.into_config()).await?;
        }
        Commands::ValidateDirectory { path } => {
            validate_directory(path).await?;
        }
    }

    Ok(())
}
