//! Consumer-side decoder for the mount-info payload an external service hands
//! to a job. Nothing in job assembly produces this payload.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{JobPlaneError, Result};

pub const DEFAULT_CACHE_DIR: &str = "/var/cache/jobplane-fs";
pub const DEFAULT_META_DRIVER: &str = "default";
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// Cache settings of a mounted filesystem, as carried in the encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsCacheConfig {
    #[serde(rename = "fsID", default)]
    pub fs_id: String,
    #[serde(default)]
    pub cache_dir: String,
    #[serde(default)]
    pub meta_driver: String,
    #[serde(default)]
    pub block_size: u64,
}

impl FsCacheConfig {
    pub fn default_for(fs_id: &str) -> Self {
        Self {
            fs_id: fs_id.to_string(),
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
            meta_driver: DEFAULT_META_DRIVER.to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Mount descriptor attached to jobs that use a filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountInfo {
    pub fs_id: String,
    /// Pod or server that consumes the mount.
    pub consumer: String,
    /// Encoded filesystem record, passed through untouched.
    pub fs_base64_str: String,
    pub fs_cache_config: FsCacheConfig,
    pub read_only: bool,
}

fn decode_json(field: &str, encoded: &str) -> Result<serde_json::Value> {
    let raw = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| JobPlaneError::Validation(format!("{} is not valid base64: {}", field, e)))?;
    serde_json::from_slice(&raw)
        .map_err(|e| JobPlaneError::Validation(format!("{} is not valid JSON: {}", field, e)))
}

impl MountInfo {
    /// Build a mount descriptor from the encoded filesystem record and cache
    /// configuration. An empty cache payload selects the default cache.
    pub fn process(
        fs_id: &str,
        consumer: &str,
        fs_base64: &str,
        fs_cache_base64: &str,
        read_only: bool,
    ) -> Result<Self> {
        if !decode_json("filesystem", fs_base64)?.is_object() {
            return Err(JobPlaneError::Validation(
                "filesystem record must be a JSON object".to_string(),
            ));
        }

        let fs_cache_config = if fs_cache_base64.is_empty() {
            FsCacheConfig::default_for(fs_id)
        } else {
            let value = decode_json("filesystem cache config", fs_cache_base64)?;
            let mut cache: FsCacheConfig = serde_json::from_value(value).map_err(|e| {
                JobPlaneError::Validation(format!("filesystem cache config is malformed: {}", e))
            })?;
            if cache.fs_id.is_empty() {
                cache.fs_id = fs_id.to_string();
            }
            cache
        };

        tracing::debug!(fs_id, consumer, read_only, cache_dir = %fs_cache_config.cache_dir, "Mount info processed");
        Ok(Self {
            fs_id: fs_id.to_string(),
            consumer: consumer.to_string(),
            fs_base64_str: fs_base64.to_string(),
            fs_cache_config,
            read_only,
        })
    }
}
