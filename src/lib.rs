pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod job;
pub mod orchestrator;
pub mod runtime;
pub mod shutdown;
pub mod store;

pub use error::{JobPlaneError, Result};
pub use orchestrator::JobOrchestrator;
