pub mod mount;

pub use mount::{FsCacheConfig, MountInfo};

/// Deterministic filesystem ID for a user's named filesystem.
pub fn fs_id(user_name: &str, fs_name: &str) -> String {
    format!("fs-{}-{}", user_name, fs_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_id_joins_user_and_name() {
        assert_eq!(fs_id("root", "testfs"), "fs-root-testfs");
    }
}
