//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for config backends and the
//! [`ConfigVersion`] digest reported by `/health`. Submodules provide the
//! data model, `${VAR}` secret expansion, validation logic, and the file
//! source. Configuration is read once at startup and never reloaded: the
//! provider list is fixed for the lifetime of the process.

pub mod model;
pub mod secrets;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::RelayError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// First eight hex digits, enough to tell deployments apart.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), RelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_version_truncates_hash() {
        let v = ConfigVersion::Hash("0123456789abcdef".into());
        assert_eq!(v.short(), "01234567");

        let tiny = ConfigVersion::Hash("abc".into());
        assert_eq!(tiny.short(), "abc");
    }
}
