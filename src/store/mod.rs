pub mod directory;
pub mod memory;
pub mod repository;
pub mod row;

pub use directory::{Cluster, Directory, DirectorySeed, InMemoryDirectory, Queue};
pub use memory::InMemoryJobRepository;
pub use repository::JobRepository;
pub use row::JobRow;
