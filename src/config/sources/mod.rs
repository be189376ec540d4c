//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! Only files are supported. The format is chosen by extension: YAML by
//! default, JSON and TOML behind the `json` and `toml` features.
//! [`parse_config_str`] holds the format-specific deserialization.

pub mod file_source;

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::config::model::Config;
use crate::config::ConfigSource;
use crate::error::RelayError;

/// File names looked up in the working directory when `--config` is not given.
pub const DEFAULT_FILE_NAMES: &[&str] = &[
    "ddns-relay.yaml",
    "ddns-relay.yml",
    "ddns-relay.json",
    "ddns-relay.toml",
];

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, RelayError> {
    let parse_err = |e: Box<dyn std::error::Error + Send + Sync>| RelayError::ConfigParse {
        path: path_display.to_string(),
        source: e,
    };

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| parse_err(Box::new(e))),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| parse_err(Box::new(e))),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| parse_err(Box::new(e))),

        other => Err(RelayError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Pick a source for `path` from its extension.
pub fn for_path(path: &Path) -> Result<Box<dyn ConfigSource>, RelayError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(Box::new(file_source::FileSource::new(path.to_path_buf(), "yaml"))),

        #[cfg(feature = "json")]
        "json" => Ok(Box::new(file_source::FileSource::new(path.to_path_buf(), "json"))),

        #[cfg(feature = "toml")]
        "toml" => Ok(Box::new(file_source::FileSource::new(path.to_path_buf(), "toml"))),

        other => Err(RelayError::UnsupportedFormat(other.to_string())),
    }
}
