pub mod docker;
pub mod registry;
pub mod service;

pub use docker::{DefaultRuntimeFactory, DockerRuntime};
pub use registry::RuntimeRegistry;
pub use service::{RuntimeFactory, RuntimeService};
