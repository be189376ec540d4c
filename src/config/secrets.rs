//! `${VAR}` expansion for provider secrets.
//!
//! Provider tokens and passwords usually live in the service environment
//! rather than in the config file. When the forwarder is built, every
//! `${NAME}` in a provider's `url`, `query` values, `headers` values and
//! `auth` credentials is replaced by the value of the environment variable
//! `NAME`. Undefined variables are collected and reported together.

use crate::config::model::Config;
use crate::error::RelayError;

pub struct Secrets<F> {
    lookup: F,
    missing: Vec<String>,
}

/// Secrets resolved from the process environment.
#[must_use]
pub fn from_env() -> Secrets<fn(&str) -> Option<String>> {
    Secrets::new(|name| std::env::var(name).ok())
}

impl<F> Secrets<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    /// Replace each `${NAME}` in `input`. Undefined names expand to nothing
    /// and are remembered for [`finish`](Self::finish).
    pub fn expand(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                // No closing brace: keep the remainder verbatim.
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            match (self.lookup)(name) {
                Some(value) => out.push_str(&value),
                None => self.missing.push(name.to_string()),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    pub fn finish(self) -> Result<(), RelayError> {
        let names = self.into_missing();
        if names.is_empty() {
            Ok(())
        } else {
            Err(RelayError::UndefinedSecret { names })
        }
    }

    fn into_missing(mut self) -> Vec<String> {
        self.missing.sort();
        self.missing.dedup();
        self.missing
    }
}

/// Every `${NAME}` in provider settings that `lookup` cannot resolve, sorted.
pub fn unresolved<F>(config: &Config, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut secrets = Secrets::new(lookup);
    for provider in &config.providers {
        secrets.expand(&provider.url);
        for value in provider.query.values().chain(provider.headers.values()) {
            secrets.expand(value);
        }
        if let Some(auth) = &provider.auth {
            secrets.expand(&auth.username);
            secrets.expand(&auth.password);
        }
    }
    secrets.into_missing()
}
