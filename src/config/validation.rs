//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as an empty provider list, duplicate names, malformed
//! URL templates, unknown placeholders, and bad HTTP methods. Returns a
//! list of [`ValidationError`] values with per-field suggestions.
//!
//! Validation runs before `${VAR}` expansion, so `validate` works on a
//! config file without the production secrets in the environment.

use std::collections::HashSet;

use url::Url;

use super::model::{Config, Field, ProviderConfig};
use crate::error::ValidationError;
use crate::relay::template::Template;

pub const VALID_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Validate an HTTP method string. Returns `Ok(())` or a human-readable error.
pub fn validate_method(method: &str) -> Result<(), String> {
    let upper = method.to_uppercase();
    if VALID_METHODS.contains(&upper.as_str()) {
        Ok(())
    } else {
        Err(format!("'{method}' is not a valid HTTP method"))
    }
}

/// Validate the inbound update path. Returns `Ok(())` or a human-readable error.
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path cannot be empty".into());
    }
    if !path.starts_with('/') {
        return Err("path must start with '/'".into());
    }
    if let Some(c) = path.chars().find(|c| matches!(c, '{' | '}' | '*' | ':' | '?' | '#')) {
        return Err(format!("path cannot contain '{c}'"));
    }
    if path == "/health" {
        return Err("'/health' is reserved for the health endpoint".into());
    }
    Ok(())
}

/// Validate a provider URL template. Returns `Ok(())` or a human-readable error.
pub fn validate_provider_url(url: &str) -> Result<(), String> {
    let template = Template::parse(url).map_err(|e| e.to_string())?;
    // `${VAR}` secrets are expanded after validation; give them a neutral stand-in.
    let sample = stub_secrets(&template.render_sample());

    match Url::parse(&sample) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme == "http" || scheme == "https" {
                Ok(())
            } else {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_inbound(config, &mut errors);

    if config.defaults.timeout == 0 {
        errors.push(ValidationError::new(
            "(root)",
            "defaults.timeout",
            "timeout must be greater than 0",
        ));
    }

    if config.providers.is_empty() {
        errors.push(ValidationError::new(
            "(root)",
            "providers",
            "at least one provider must be defined",
        ));
        return Err(errors);
    }

    let mut seen_names = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        let scope = if provider.name.is_empty() {
            format!("providers[{i}]")
        } else {
            provider.name.clone()
        };

        if provider.name.trim().is_empty() {
            errors.push(ValidationError::new(&scope, "name", "name cannot be empty"));
        } else if !seen_names.insert(provider.name.as_str()) {
            errors.push(ValidationError::new(
                &scope,
                "name",
                "duplicate provider name",
            ));
        }

        validate_provider(&scope, provider, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_inbound(config: &Config, errors: &mut Vec<ValidationError>) {
    let inbound = &config.inbound;

    if let Err(msg) = validate_path(&inbound.path) {
        let mut err = ValidationError::new("inbound", "path", msg);
        if !inbound.path.is_empty() && !inbound.path.starts_with('/') {
            err = err.with_suggestion(format!("did you mean '/{}'?", inbound.path));
        }
        errors.push(err);
    }

    if inbound.methods.is_empty() {
        errors.push(ValidationError::new(
            "inbound",
            "methods",
            "at least one method must be accepted",
        ));
    }
    for method in &inbound.methods {
        if let Err(msg) = validate_method(method) {
            errors.push(ValidationError::new("inbound", "methods", msg));
        }
    }

    let mut seen_params = HashSet::new();
    for field in Field::ALL {
        let name = inbound.params.name_of(field);
        if name.is_empty() {
            errors.push(ValidationError::new(
                "inbound",
                format!("params.{field}"),
                "parameter name cannot be empty",
            ));
        } else if !seen_params.insert(name) {
            errors.push(ValidationError::new(
                "inbound",
                format!("params.{field}"),
                format!("parameter name '{name}' is used for more than one field"),
            ));
        }
    }
}

fn validate_provider(scope: &str, provider: &ProviderConfig, errors: &mut Vec<ValidationError>) {
    if let Err(msg) = validate_provider_url(&provider.url) {
        let mut err = ValidationError::new(scope, "url", msg);
        if !provider.url.contains("://") {
            err = err.with_suggestion(format!("did you mean 'https://{}'?", provider.url));
        }
        errors.push(err);
    }

    if let Err(msg) = validate_method(&provider.method) {
        errors.push(ValidationError::new(scope, "method", msg));
    }

    for (key, value) in &provider.query {
        if key.is_empty() {
            errors.push(ValidationError::new(
                scope,
                "query",
                "query parameter name cannot be empty",
            ));
        }
        if let Err(e) = Template::parse(value) {
            errors.push(ValidationError::new(scope, format!("query.{key}"), e.to_string()));
        }
    }

    for (key, value) in &provider.headers {
        if key.parse::<http::HeaderName>().is_err() {
            errors.push(ValidationError::new(
                scope,
                "headers",
                format!("'{key}' is not a valid header name"),
            ));
        }
        if let Err(e) = Template::parse(value) {
            errors.push(ValidationError::new(
                scope,
                format!("headers.{key}"),
                e.to_string(),
            ));
        }
    }

    if let Some(ref auth) = provider.auth {
        if auth.username.is_empty() {
            errors.push(ValidationError::new(
                scope,
                "auth.username",
                "username cannot be empty when auth is configured",
            ));
        }
    }

    if provider.timeout == Some(0) {
        errors.push(ValidationError::new(
            scope,
            "timeout",
            "timeout must be greater than 0",
        ));
    }

    if provider.ipv6_suffix.is_some()
        && !references_field(provider, Field::Ipv6)
    {
        errors.push(
            ValidationError::new(
                scope,
                "ipv6_suffix",
                "ipv6_suffix is set but no template uses {ipv6}",
            )
            .with_suggestion("add e.g. 'ipv6: \"{ipv6}\"' to query"),
        );
    }
}

fn references_field(provider: &ProviderConfig, field: Field) -> bool {
    std::iter::once(&provider.url)
        .chain(provider.query.values())
        .chain(provider.headers.values())
        .filter_map(|t| Template::parse(t).ok())
        .any(|t| t.fields().contains(&field))
}

/// Replace `${VAR}` references with a placeholder that is valid in any URL part.
fn stub_secrets(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find('}') {
            Some(end) => {
                out.push_str("secret");
                rest = &rest[start + 2 + end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} {} -> {} providers",
        config.inbound.methods.join("|"),
        config.inbound.path,
        config.providers.len(),
    )];
    if config.inbound.ignore_incomplete_dual_stack {
        lines.push("  incomplete dual-stack updates are ignored".to_string());
    }
    lines.push(String::new());

    for provider in &config.providers {
        let timeout = provider.timeout.map_or_else(
            || format!("{}ms (default)", config.defaults.timeout),
            |t| format!("{t}ms"),
        );
        let mut query: Vec<&str> = provider.query.keys().map(String::as_str).collect();
        query.sort_unstable();

        lines.push(format!("  {}  -> {} {}", provider.name, provider.method, provider.url));
        if !query.is_empty() {
            lines.push(format!("    query:   {}", query.join(", ")));
        }
        if provider.auth.is_some() {
            lines.push("    auth:    basic".to_string());
        }
        if let Some(suffix) = provider.ipv6_suffix {
            lines.push(format!("    suffix:  {suffix}"));
        }
        lines.push(format!("    timeout: {timeout}"));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
