//! Configuration module
//!
//! Environment-driven configuration for the storage client and the CLI.
//! Values are read once at startup; backends receive them through the
//! storage factory rather than reading ambient state themselves.

use std::env;

use crate::constants::{
    DEFAULT_MULTIPART_THRESHOLD_BYTES, DEFAULT_PART_SIZE_BYTES, MIN_PART_SIZE_BYTES,
};
use crate::storage_types::StorageBackend;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub storage_backend: StorageBackend,
    /// Bucket every list/upload operation targets by default.
    pub bucket: String,
    pub s3_region: Option<String>,
    pub aws_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub upload_part_size_bytes: usize,
    pub multipart_threshold_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .parse::<StorageBackend>()?;

        let bucket = env::var("CLIPVAULT_BUCKET")
            .map_err(|_| anyhow::anyhow!("CLIPVAULT_BUCKET must be set"))?;

        let part_size_mb = env::var("UPLOAD_PART_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok());

        let threshold_mb = env::var("MULTIPART_THRESHOLD_MB")
            .ok()
            .and_then(|s| s.parse::<u64>().ok());

        let config = Config {
            storage_backend,
            bucket,
            s3_region: env::var("S3_REGION").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            upload_part_size_bytes: part_size_mb
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(DEFAULT_PART_SIZE_BYTES),
            multipart_threshold_bytes: threshold_mb
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(DEFAULT_MULTIPART_THRESHOLD_BYTES),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("CLIPVAULT_BUCKET must not be empty"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
                if self.upload_part_size_bytes < MIN_PART_SIZE_BYTES {
                    return Err(anyhow::anyhow!(
                        "UPLOAD_PART_SIZE_MB must be at least 5 MiB for the S3 backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.upload_part_size_bytes == 0 {
                    return Err(anyhow::anyhow!("UPLOAD_PART_SIZE_MB must be non-zero"));
                }
            }
        }

        Ok(())
    }

    pub fn region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(backend: StorageBackend) -> Config {
        Config {
            storage_backend: backend,
            bucket: "clips".to_string(),
            s3_region: Some("ap-northeast-1".to_string()),
            aws_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/clipvault".to_string()),
            upload_part_size_bytes: DEFAULT_PART_SIZE_BYTES,
            multipart_threshold_bytes: DEFAULT_MULTIPART_THRESHOLD_BYTES,
        }
    }

    #[test]
    fn s3_config_requires_region() {
        let mut config = base_config(StorageBackend::S3);
        assert!(config.validate().is_ok());

        config.s3_region = None;
        assert!(config.validate().is_err());

        config.aws_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn s3_config_enforces_min_part_size() {
        let mut config = base_config(StorageBackend::S3);
        config.upload_part_size_bytes = 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_config_requires_path() {
        let mut config = base_config(StorageBackend::Local);
        assert!(config.validate().is_ok());

        config.local_storage_path = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_config_allows_small_parts() {
        let mut config = base_config(StorageBackend::Local);
        config.upload_part_size_bytes = 16;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_bucket_rejected() {
        let mut config = base_config(StorageBackend::S3);
        config.bucket = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn region_prefers_s3_region() {
        let mut config = base_config(StorageBackend::S3);
        config.aws_region = Some("us-east-1".to_string());
        assert_eq!(config.region(), Some("ap-northeast-1"));

        config.s3_region = None;
        assert_eq!(config.region(), Some("us-east-1"));
    }
}
