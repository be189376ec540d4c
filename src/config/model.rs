//! Serde data structures for the ddns-relay configuration file.
//!
//! Contains [`Config`] (the root), [`InboundConfig`], [`ParamNames`],
//! [`Defaults`], [`ProviderConfig`], [`BasicAuth`], and the [`Field`]
//! enum naming the values a router can send. All types derive
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

const fn default_timeout() -> u64 {
    10_000
}

const fn default_max_response_body() -> usize {
    1024
}

fn default_path() -> String {
    "/dyndns".to_string()
}

fn default_inbound_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

fn default_provider_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub inbound: InboundConfig,

    #[serde(default)]
    pub defaults: Defaults,

    pub providers: Vec<ProviderConfig>,
}

impl Config {
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }
}

/// A value the router can hand over in an update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Hostname,
    Ipv4,
    Ipv6,
    Ipv6prefix,
    Username,
    Password,
}

impl Field {
    pub const ALL: [Self; 6] = [
        Self::Hostname,
        Self::Ipv4,
        Self::Ipv6,
        Self::Ipv6prefix,
        Self::Username,
        Self::Password,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hostname => "hostname",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Ipv6prefix => "ipv6prefix",
            Self::Username => "username",
            Self::Password => "password",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    #[must_use]
    pub const fn is_address(self) -> bool {
        matches!(self, Self::Ipv4 | Self::Ipv6 | Self::Ipv6prefix)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InboundConfig {
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_inbound_methods")]
    pub methods: Vec<String>,

    #[serde(default)]
    pub params: ParamNames,

    /// Answer `ipv4 + ipv6prefix` updates without `ipv6` with "ignored"
    /// instead of forwarding them.
    #[serde(default)]
    pub ignore_incomplete_dual_stack: bool,
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            methods: default_inbound_methods(),
            params: ParamNames::default(),
            ignore_incomplete_dual_stack: false,
        }
    }
}

/// Query parameter names the router uses for each [`Field`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamNames {
    pub hostname: String,
    pub ipv4: String,
    pub ipv6: String,
    pub ipv6prefix: String,
    pub username: String,
    pub password: String,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            hostname: "hostname".into(),
            ipv4: "ipv4".into(),
            ipv6: "ipv6".into(),
            ipv6prefix: "ipv6prefix".into(),
            username: "username".into(),
            password: "password".into(),
        }
    }
}

impl ParamNames {
    #[must_use]
    pub fn name_of(&self, field: Field) -> &str {
        match field {
            Field::Hostname => &self.hostname,
            Field::Ipv4 => &self.ipv4,
            Field::Ipv6 => &self.ipv6,
            Field::Ipv6prefix => &self.ipv6prefix,
            Field::Username => &self.username,
            Field::Password => &self.password,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Provider timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Provider response bodies are cut to this many bytes in results.
    #[serde(default = "default_max_response_body")]
    pub max_response_body: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_response_body: default_max_response_body(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub name: String,

    /// Endpoint URL. `{field}` placeholders here are mandatory.
    pub url: String,

    #[serde(default = "default_provider_method")]
    pub method: String,

    /// Query parameter templates. Entries whose placeholders are missing
    /// from the request are left out.
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    #[serde(default)]
    pub auth: Option<BasicAuth>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub ipv6_suffix: Option<Ipv6Addr>,

    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub requires: Vec<Field>,
}

impl ProviderConfig {
    /// Shorthand for tests and presets: a GET provider with no extras.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: default_provider_method(),
            query: BTreeMap::new(),
            auth: None,
            headers: BTreeMap::new(),
            ipv6_suffix: None,
            timeout: None,
            requires: Vec::new(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuth {
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"providers": [{"name": "a", "url": "https://a.example/update"}]}"#,
        )
        .unwrap();
        assert_eq!(config.inbound.path, "/dyndns");
        assert_eq!(config.inbound.methods, vec!["GET"]);
        assert_eq!(config.inbound.params.ipv6prefix, "ipv6prefix");
        assert_eq!(config.defaults.timeout, 10_000);
        assert_eq!(config.providers[0].method, "GET");
        assert!(config.providers[0].requires.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<Config, _> = serde_json::from_str(
            r#"{"providers": [{"name": "a", "url": "https://a", "primary": true}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn requires_and_suffix_deserialize() {
        let config: Config = serde_json::from_str(
            r#"{"providers": [{
                "name": "a",
                "url": "https://a",
                "requires": ["ipv4", "ipv6prefix"],
                "ipv6_suffix": "::dead:beef"
            }]}"#,
        )
        .unwrap();
        let p = &config.providers[0];
        assert_eq!(p.requires, vec![Field::Ipv4, Field::Ipv6prefix]);
        assert_eq!(p.ipv6_suffix, Some("::dead:beef".parse().unwrap()));
    }

    #[test]
    fn custom_param_names() {
        let config: Config = serde_json::from_str(
            r#"{"inbound": {"params": {"ipv4": "myip"}}, "providers": []}"#,
        )
        .unwrap();
        assert_eq!(config.inbound.params.name_of(Field::Ipv4), "myip");
        assert_eq!(config.inbound.params.name_of(Field::Ipv6), "ipv6");
    }

    #[test]
    fn basic_auth_debug_hides_password() {
        let auth = BasicAuth {
            username: "user".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{auth:?}");
        assert!(printed.contains("user"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_name("ip"), None);
    }
}
