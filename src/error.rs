//! Unified error types for ddns-relay.
//!
//! Defines [`RelayError`] (the main crate error enum) and
//! [`ValidationError`] for config validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. Error messages
//! include contextual hints to guide the user toward a fix.
//!
//! Errors on the request path are not here: a rejected inbound request is a
//! [`Rejection`](crate::relay::request::Rejection) and a failed provider call
//! is recorded inside its [`ProviderResult`](crate::relay::result::ProviderResult).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Provider name, `providers[i]` when unnamed, or `(root)` / `inbound`.
    pub scope: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(
        scope: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scope: scope.into(),
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {}: {}", self.scope, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("No config source found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error(
        "Undefined environment variable{} referenced in config: {}",
        if .names.len() == 1 { "" } else { "s" },
        .names.join(", ")
    )]
    UndefinedSecret { names: Vec<String> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_includes_suggestion() {
        let err = ValidationError::new("ionos", "url", "'x' is not a valid URL")
            .with_suggestion("did you mean 'https://x'?");
        assert_eq!(
            err.to_string(),
            "  ionos: url: 'x' is not a valid URL (did you mean 'https://x'?)"
        );
    }

    #[test]
    fn undefined_secret_pluralizes() {
        let one = RelayError::UndefinedSecret {
            names: vec!["A".into()],
        };
        assert_eq!(
            one.to_string(),
            "Undefined environment variable referenced in config: A"
        );

        let two = RelayError::UndefinedSecret {
            names: vec!["A".into(), "B".into()],
        };
        assert!(two.to_string().contains("variables"));
        assert!(two.to_string().ends_with("A, B"));
    }
}
