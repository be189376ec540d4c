//! Concurrent fan-out of one update to every configured provider.
//!
//! [`Forwarder`] compiles the provider list once at startup (templates
//! parsed, `${VAR}` secrets expanded, methods and header names checked).
//! Per inbound update it decides which providers can be served, spawns one
//! task per eligible provider, and joins them in configuration order. A
//! provider's transport error, timeout, or non-2xx answer only marks that
//! provider as failed.

use std::net::Ipv6Addr;
use std::time::{Duration, Instant};

use axum::http::{HeaderName, Method};
use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Full};
use hyper::StatusCode;
use tokio::task::JoinHandle;

use super::headers::build_provider_headers;
use super::request::{Rejection, UpdateRequest};
use super::result::{AggregateResult, ProviderOutcome, ProviderResult};
use super::template::{FieldValues, Template, TemplateError};
use crate::config::model::{BasicAuth, Config, Field, ProviderConfig};
use crate::config::secrets::Secrets;
use crate::error::{RelayError, ValidationError};
use crate::server::HttpClient;

/// A provider ready to be called.
#[derive(Debug)]
struct Provider {
    name: String,
    method: Method,
    url: Template,
    query: Vec<(String, Template)>,
    headers: Vec<(HeaderName, Template)>,
    auth: Option<BasicAuth>,
    ipv6_suffix: Option<Ipv6Addr>,
    timeout: Duration,
    /// Fields that must be present: URL placeholders plus `requires`.
    required: Vec<Field>,
    /// Address fields referenced anywhere; at least one must be present.
    addresses: Vec<Field>,
}

impl Provider {
    fn compile<F>(
        config: &ProviderConfig,
        default_timeout: u64,
        secrets: &mut Secrets<F>,
    ) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = config.name.as_str();
        let template_err =
            |field: String, e: TemplateError| ValidationError::new(name, field, e.to_string());

        let url = Template::parse(&config.url)
            .map_err(|e| template_err("url".into(), e))?
            .with_secrets(secrets);

        let mut query = Vec::with_capacity(config.query.len());
        for (key, value) in &config.query {
            let t = Template::parse(value).map_err(|e| template_err(format!("query.{key}"), e))?;
            query.push((key.clone(), t.with_secrets(secrets)));
        }

        let mut headers = Vec::with_capacity(config.headers.len());
        for (key, value) in &config.headers {
            let header = key.parse::<HeaderName>().map_err(|_| {
                ValidationError::new(name, "headers", format!("'{key}' is not a valid header name"))
            })?;
            let t = Template::parse(value).map_err(|e| template_err(format!("headers.{key}"), e))?;
            headers.push((header, t.with_secrets(secrets)));
        }

        let method = Method::from_bytes(config.method.to_uppercase().as_bytes()).map_err(|_| {
            ValidationError::new(
                name,
                "method",
                format!("'{}' is not a valid HTTP method", config.method),
            )
        })?;

        let auth = config.auth.as_ref().map(|a| BasicAuth {
            username: secrets.expand(&a.username),
            password: secrets.expand(&a.password),
        });

        let mut required = url.fields();
        for f in &config.requires {
            if !required.contains(f) {
                required.push(*f);
            }
        }

        let mut addresses: Vec<Field> = std::iter::once(&url)
            .chain(query.iter().map(|(_, t)| t))
            .chain(headers.iter().map(|(_, t)| t))
            .flat_map(Template::fields)
            .chain(config.requires.iter().copied())
            .filter(|f| f.is_address())
            .collect();
        addresses.sort_unstable();
        addresses.dedup();

        Ok(Self {
            name: config.name.clone(),
            method,
            url,
            query,
            headers,
            auth,
            ipv6_suffix: config.ipv6_suffix,
            timeout: Duration::from_millis(config.timeout.unwrap_or(default_timeout)),
            required,
            addresses,
        })
    }

    /// `Err` carries the reason the provider cannot be served.
    fn check_eligible(&self, values: &FieldValues) -> Result<(), String> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|f| !values.contains_key(f))
            .map(|f| f.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing {}", missing.join(", ")));
        }
        if !self.addresses.is_empty() && !self.addresses.iter().any(|f| values.contains_key(f)) {
            let wanted: Vec<&str> = self.addresses.iter().map(|f| f.as_str()).collect();
            return Err(format!("none of {} available", wanted.join(", ")));
        }
        Ok(())
    }

    fn build_request(
        &self,
        values: &FieldValues,
        correlation_id: &str,
    ) -> Result<hyper::Request<Full<Bytes>>, String> {
        let rendered = self
            .url
            .render_url(values)
            .map_err(|f| format!("missing {f}"))?;
        let mut url = url::Url::parse(&rendered).map_err(|e| format!("invalid URL: {e}"))?;

        let pairs: Vec<(&str, String)> = self
            .query
            .iter()
            .filter_map(|(k, t)| t.render(values).ok().map(|v| (k.as_str(), v)))
            .collect();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let headers =
            build_provider_headers(self.auth.as_ref(), &self.headers, values, correlation_id);

        let mut builder = hyper::Request::builder()
            .method(self.method.clone())
            .uri(url.as_str());
        for (key, value) in &headers {
            builder = builder.header(key, value);
        }
        builder
            .body(Full::new(Bytes::new()))
            .map_err(|e| e.to_string())
    }
}

pub struct Forwarder {
    client: HttpClient,
    providers: Vec<Provider>,
    max_response_body: usize,
}

enum Slot {
    Done(ProviderResult),
    Pending(String, JoinHandle<ProviderResult>),
}

impl Forwarder {
    /// Compile the configured providers. All undefined `${VAR}` references
    /// are reported together.
    pub fn new<F>(
        config: &Config,
        client: HttpClient,
        mut secrets: Secrets<F>,
    ) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut providers = Vec::with_capacity(config.providers.len());
        let mut errors = Vec::new();
        for p in &config.providers {
            match Provider::compile(p, config.defaults.timeout, &mut secrets) {
                Ok(provider) => providers.push(provider),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(RelayError::ConfigValidation { errors });
        }
        secrets.finish()?;

        Ok(Self {
            client,
            providers,
            max_response_body: config.defaults.max_response_body,
        })
    }

    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Forward one update to every eligible provider and aggregate.
    ///
    /// Returns [`Rejection::NoEligibleProvider`] without any outbound call
    /// when no provider can be served from `request`.
    pub async fn handle(
        &self,
        request: &UpdateRequest,
        correlation_id: &str,
    ) -> Result<AggregateResult, Rejection> {
        let plans: Vec<(&Provider, Result<FieldValues, String>)> = self
            .providers
            .iter()
            .map(|p| {
                let values = request.values_for(p.ipv6_suffix);
                let plan = p.check_eligible(&values).map(|()| values);
                (p, plan)
            })
            .collect();

        if plans.iter().all(|(_, plan)| plan.is_err()) {
            let reasons = plans
                .iter()
                .filter_map(|(p, plan)| plan.as_ref().err().map(|r| format!("{}: {r}", p.name)))
                .collect();
            return Err(Rejection::NoEligibleProvider { reasons });
        }

        let mut slots = Vec::with_capacity(plans.len());
        for (provider, plan) in plans {
            let values = match plan {
                Ok(values) => values,
                Err(reason) => {
                    tracing::info!(
                        correlation_id = %correlation_id,
                        provider = %provider.name,
                        reason = %reason,
                        "provider skipped"
                    );
                    slots.push(Slot::Done(ProviderResult::skipped(&provider.name, reason)));
                    continue;
                }
            };

            let req = match provider.build_request(&values, correlation_id) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(
                        correlation_id = %correlation_id,
                        provider = %provider.name,
                        error = %e,
                        "failed to build provider request"
                    );
                    slots.push(Slot::Done(ProviderResult {
                        provider: provider.name.clone(),
                        outcome: ProviderOutcome::Failure,
                        status: None,
                        error: Some(e),
                        body: None,
                        latency_ms: 0,
                    }));
                    continue;
                }
            };

            let handle = tokio::spawn(call_provider(
                self.client.clone(),
                provider.name.clone(),
                req,
                provider.timeout,
                self.max_response_body,
                correlation_id.to_string(),
            ));
            slots.push(Slot::Pending(provider.name.clone(), handle));
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Done(r) => results.push(r),
                Slot::Pending(name, handle) => match handle.await {
                    Ok(r) => results.push(r),
                    Err(join_err) => {
                        tracing::error!(
                            provider = %name,
                            error = %join_err,
                            "provider task panicked"
                        );
                        results.push(ProviderResult {
                            provider: name,
                            outcome: ProviderOutcome::Failure,
                            status: None,
                            error: Some("provider task panicked".into()),
                            body: None,
                            latency_ms: 0,
                        });
                    }
                },
            }
        }

        Ok(AggregateResult::from_results(results))
    }
}

#[allow(clippy::cast_possible_truncation)]
async fn call_provider(
    client: HttpClient,
    name: String,
    req: hyper::Request<Full<Bytes>>,
    timeout: Duration,
    max_body: usize,
    correlation_id: String,
) -> ProviderResult {
    let start = Instant::now();

    let exchange = async {
        let response = client.request(req).await.map_err(|e| error_chain(&e))?;
        let status = response.status();
        let body = read_prefix(response.into_body(), max_body)
            .await
            .map_err(|e| format!("body read error: {}", error_chain(&e)))?;
        Ok::<(StatusCode, Bytes), String>((status, body))
    };

    let result = tokio::time::timeout(timeout, exchange).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let provider_result = match result {
        Ok(Ok((status, body))) => ProviderResult {
            provider: name,
            outcome: if status.is_success() {
                ProviderOutcome::Success
            } else {
                ProviderOutcome::Failure
            },
            status: Some(status.as_u16()),
            error: (!status.is_success()).then(|| format!("provider returned {status}")),
            body: truncate_body(&body, max_body),
            latency_ms,
        },
        Ok(Err(e)) => ProviderResult {
            provider: name,
            outcome: ProviderOutcome::Failure,
            status: None,
            error: Some(e),
            body: None,
            latency_ms,
        },
        Err(_) => ProviderResult {
            provider: name,
            outcome: ProviderOutcome::Failure,
            status: None,
            error: Some(format!("request timed out after {}ms", timeout.as_millis())),
            body: None,
            latency_ms,
        },
    };

    match provider_result.outcome {
        ProviderOutcome::Success => tracing::info!(
            correlation_id = %correlation_id,
            provider = %provider_result.provider,
            status = provider_result.status.unwrap_or(0),
            latency_ms = provider_result.latency_ms,
            "provider updated"
        ),
        _ => tracing::warn!(
            correlation_id = %correlation_id,
            provider = %provider_result.provider,
            status = provider_result.status.unwrap_or(0),
            error = provider_result.error.as_deref().unwrap_or(""),
            latency_ms = provider_result.latency_ms,
            "provider update failed"
        ),
    }

    provider_result
}

/// Join an error and its sources: hyper's top-level messages alone
/// ("client error (Connect)") rarely say what went wrong.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        out.push_str(": ");
        out.push_str(&s.to_string());
        source = s.source();
    }
    out
}

/// Reads at most `max` bytes of a response body, then stops pulling frames.
async fn read_prefix<B>(mut body: B, max: usize) -> Result<Bytes, B::Error>
where
    B: hyper::body::Body<Data = Bytes> + Unpin,
{
    let mut buf = BytesMut::new();
    while buf.len() < max {
        let Some(frame) = body.frame().await else {
            break;
        };
        if let Ok(data) = frame?.into_data() {
            let take = data.len().min(max - buf.len());
            buf.extend_from_slice(&data[..take]);
        }
    }
    Ok(buf.freeze())
}

fn truncate_body(body: &[u8], max: usize) -> Option<String> {
    let cut = &body[..body.len().min(max)];
    let text = String::from_utf8_lossy(cut).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Defaults, InboundConfig};
    use crate::config::model::ParamNames;
    use axum::http::HeaderMap;

    fn no_secrets() -> Secrets<fn(&str) -> Option<String>> {
        Secrets::new(|_| None)
    }

    fn compile(p: &ProviderConfig) -> Provider {
        Provider::compile(p, 5000, &mut no_secrets()).unwrap()
    }

    fn request(query: &str) -> UpdateRequest {
        UpdateRequest::parse(Some(query), &HeaderMap::new(), &ParamNames::default()).unwrap()
    }

    #[test]
    fn url_placeholders_are_required() {
        let p = compile(&ProviderConfig::new("a", "https://a/{hostname}/{ipv4}"));
        assert_eq!(p.required, vec![Field::Hostname, Field::Ipv4]);

        let values = request("ipv4=1.2.3.4").values_for(None);
        assert_eq!(p.check_eligible(&values), Err("missing hostname".into()));
    }

    #[test]
    fn one_address_is_enough() {
        let mut cfg = ProviderConfig::new("inwx", "https://dyndns.inwx.com/nic/update");
        cfg.query.insert("myip".into(), "{ipv4}".into());
        cfg.query.insert("myipv6".into(), "{ipv6}".into());
        let p = compile(&cfg);

        assert!(p.check_eligible(&request("ipv6=2001:db8::1").values_for(None)).is_ok());
        assert_eq!(
            p.check_eligible(&request("ipv6prefix=2001:db8::/56").values_for(None)),
            Err("none of ipv4, ipv6 available".into())
        );
    }

    #[test]
    fn explicit_requires() {
        let mut cfg =
            ProviderConfig::new("namecheap", "https://dynamicdns.park-your-domain.com/update");
        cfg.query.insert("ip".into(), "{ipv4}".into());
        cfg.requires = vec![Field::Ipv4];
        let p = compile(&cfg);

        assert_eq!(
            p.check_eligible(&request("ipv6=2001:db8::1").values_for(None)),
            Err("missing ipv4".into())
        );
    }

    #[test]
    fn builds_query_without_missing_fields() {
        let mut cfg = ProviderConfig::new("ionos", "https://api.hosting.ionos.com/dns/v1/dyndns");
        cfg.query.insert("q".into(), "tok".into());
        cfg.query.insert("ipv4".into(), "{ipv4}".into());
        cfg.query.insert("ipv6".into(), "{ipv6}".into());
        let p = compile(&cfg);

        let req = p
            .build_request(&request("ipv4=203.0.113.9").values_for(None), "cid")
            .unwrap();
        assert_eq!(
            req.uri().to_string(),
            "https://api.hosting.ionos.com/dns/v1/dyndns?ipv4=203.0.113.9&q=tok"
        );
        assert_eq!(req.method(), Method::GET);
    }

    #[test]
    fn no_query_leaves_url_untouched() {
        let p = compile(&ProviderConfig::new("a", "https://a.example/update/{ipv4}"));
        let req = p
            .build_request(&request("ipv4=203.0.113.9").values_for(None), "cid")
            .unwrap();
        assert_eq!(req.uri().to_string(), "https://a.example/update/203.0.113.9");
    }

    #[test]
    fn query_values_are_encoded() {
        let mut cfg = ProviderConfig::new("a", "https://a.example/update");
        cfg.query.insert("prefix".into(), "{ipv6prefix}".into());
        let p = compile(&cfg);
        let req = p
            .build_request(&request("ipv6prefix=2001:db8::/56").values_for(None), "cid")
            .unwrap();
        assert_eq!(
            req.uri().query(),
            Some("prefix=2001%3Adb8%3A%3A%2F56")
        );
    }

    #[test]
    fn secrets_expand_into_templates_and_auth() {
        let mut cfg = ProviderConfig::new("inwx", "https://dyndns.inwx.com/nic/update");
        cfg.query.insert("myip".into(), "{ipv4}".into());
        cfg.auth = Some(BasicAuth {
            username: "${USER}".into(),
            password: "${PASS}".into(),
        });
        let mut secrets = Secrets::new(|name: &str| match name {
            "USER" => Some("me".to_string()),
            "PASS" => Some("pw".to_string()),
            _ => None,
        });
        let p = Provider::compile(&cfg, 5000, &mut secrets).unwrap();
        secrets.finish().unwrap();

        let auth = p.auth.as_ref().unwrap();
        assert_eq!(auth.username, "me");
        assert_eq!(auth.password, "pw");
    }

    #[test]
    fn provider_timeout_overrides_default() {
        let mut cfg = ProviderConfig::new("a", "https://a.example/update");
        assert_eq!(compile(&cfg).timeout, Duration::from_millis(5000));
        cfg.timeout = Some(250);
        assert_eq!(compile(&cfg).timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn undefined_secret_fails_construction() {
        let mut cfg = ProviderConfig::new("a", "https://a.example/update");
        cfg.query.insert("token".into(), "${MISSING_TOKEN}".into());
        let config = Config {
            inbound: InboundConfig::default(),
            defaults: Defaults::default(),
            providers: vec![cfg],
        };
        let result = Forwarder::new(&config, crate::server::build_http_client(), no_secrets());
        assert!(matches!(result, Err(RelayError::UndefinedSecret { .. })));
    }

    #[test]
    fn truncates_body() {
        assert_eq!(truncate_body(b"good 1.2.3.4\n", 4).as_deref(), Some("good"));
        assert_eq!(truncate_body(b"  \n", 100), None);
    }

    #[tokio::test]
    async fn oversized_body_is_read_only_up_to_the_limit() {
        let body = Full::new(Bytes::from(vec![b'a'; 64 * 1024]));
        let prefix = read_prefix(body, 16).await.unwrap();
        assert_eq!(prefix.len(), 16);

        let short = read_prefix(Full::new(Bytes::from_static(b"good")), 16).await.unwrap();
        assert_eq!(&short[..], b"good");

        let none = read_prefix(Full::new(Bytes::from_static(b"good")), 0).await.unwrap();
        assert!(none.is_empty());
    }
}
