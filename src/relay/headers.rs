//! Outbound header construction for provider calls.
//!
//! [`build_provider_headers`] sets `User-Agent`, `X-Correlation-Id`, an
//! optional Basic `Authorization` from the provider's credentials, and
//! then the provider's own header templates (which may override any of
//! the former).

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use base64::Engine;

use super::template::{FieldValues, Template};
use crate::config::model::BasicAuth;

pub const USER_AGENT: &str = concat!("ddns-relay/", env!("CARGO_PKG_VERSION"));

/// `Basic <base64(user:pass)>` for an `Authorization` header.
#[must_use]
pub fn basic_auth_value(auth: &BasicAuth) -> String {
    let raw = format!("{}:{}", auth.username, auth.password);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw)
    )
}

pub fn build_provider_headers(
    auth: Option<&BasicAuth>,
    extra: &[(HeaderName, Template)],
    values: &FieldValues,
    correlation_id: &str,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

    if let Ok(val) = HeaderValue::from_str(correlation_id) {
        headers.insert("x-correlation-id", val);
    }

    if let Some(auth) = auth {
        match HeaderValue::from_str(&basic_auth_value(auth)) {
            Ok(mut val) => {
                val.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, val);
            }
            Err(_) => {
                tracing::warn!("provider credentials are not a valid header value, skipping");
            }
        }
    }

    for (name, template) in extra {
        // A header whose fields are missing from this request is left out,
        // like a query parameter.
        let Ok(rendered) = template.render(values) else {
            continue;
        };
        match HeaderValue::from_str(&rendered) {
            Ok(val) => {
                headers.insert(name.clone(), val);
            }
            Err(_) => {
                tracing::warn!(header = %name, "invalid header value, skipping");
            }
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Field;

    fn values() -> FieldValues {
        let mut v = FieldValues::new();
        v.insert(Field::Hostname, "home.example.org".into());
        v
    }

    #[test]
    fn sets_user_agent_and_correlation_id() {
        let headers = build_provider_headers(None, &[], &values(), "cid-1");
        assert_eq!(headers.get(header::USER_AGENT).unwrap(), USER_AGENT);
        assert_eq!(headers.get("x-correlation-id").unwrap(), "cid-1");
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn encodes_basic_auth() {
        let auth = BasicAuth {
            username: "Aladdin".into(),
            password: "open sesame".into(),
        };
        assert_eq!(basic_auth_value(&auth), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");

        let headers = build_provider_headers(Some(&auth), &[], &values(), "cid");
        let value = headers.get(header::AUTHORIZATION).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn renders_extra_headers() {
        let extra = vec![
            (
                HeaderName::from_static("x-host"),
                Template::parse("{hostname}").unwrap(),
            ),
            (
                HeaderName::from_static("x-ip"),
                Template::parse("{ipv4}").unwrap(),
            ),
        ];
        let headers = build_provider_headers(None, &extra, &values(), "cid");
        assert_eq!(headers.get("x-host").unwrap(), "home.example.org");
        assert!(headers.get("x-ip").is_none());
    }

    #[test]
    fn extra_headers_override_defaults() {
        let extra = vec![(
            header::USER_AGENT,
            Template::parse("custom-agent").unwrap(),
        )];
        let headers = build_provider_headers(None, &extra, &values(), "cid");
        assert_eq!(headers.get(header::USER_AGENT).unwrap(), "custom-agent");
    }
}
