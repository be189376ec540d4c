//! Async file-based config source with SHA-256 versioning.
//!
//! [`FileSource`] implements [`ConfigSource`] for every supported file
//! format. It reads the file asynchronously via Tokio, deserializes it with
//! [`parse_config_str`], validates the result, and computes a SHA-256 hash
//! of the raw content as the config version.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{parse_config_str, sha256_hex};
use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::RelayError;

pub struct FileSource {
    path: PathBuf,
    format: &'static str,
}

impl FileSource {
    /// `format` is a file extension understood by [`parse_config_str`].
    #[must_use]
    pub const fn new(path: PathBuf, format: &'static str) -> Self {
        Self { path, format }
    }

    async fn read_content(&self) -> Result<String, RelayError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                RelayError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.format
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), RelayError> {
        let content = self.read_content().await?;
        let config = parse_config_str(self.format, &content, &self.path.display().to_string())?;

        if let Err(errors) = validate(&config) {
            return Err(RelayError::ConfigValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }
}

#[cfg(all(test, feature = "yaml"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = FileSource::new(PathBuf::from("does/not/exist.yaml"), "yaml");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, RelayError::ConfigFileNotFound { .. }));
    }

    #[tokio::test]
    async fn loads_and_hashes_file() {
        let dir = std::env::temp_dir().join(format!("ddns-relay-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("relay.yaml");
        tokio::fs::write(
            &path,
            "providers:\n  - name: a\n    url: https://a.example/update\n",
        )
        .await
        .unwrap();

        let source = FileSource::new(path, "yaml");
        let (config, version) = source.load().await.unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(version.short().len(), 8);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn invalid_config_fails_validation() {
        let dir = std::env::temp_dir().join(format!("ddns-relay-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("relay.yaml");
        tokio::fs::write(&path, "providers: []\n").await.unwrap();

        let err = FileSource::new(path, "yaml").load().await.unwrap_err();
        assert!(matches!(err, RelayError::ConfigValidation { .. }));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
