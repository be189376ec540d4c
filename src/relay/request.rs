//! Inbound update parameters and client-error rejections.
//!
//! [`UpdateRequest::parse`] reads the router's query string (through the
//! configured [`ParamNames`]) and an optional Basic `Authorization` header.
//! Empty parameters count as absent because routers fill in blanks for
//! address families they do not have. Anything present but malformed is
//! rejected before a provider is contacted.

use std::net::{Ipv4Addr, Ipv6Addr};

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::Serialize;

use super::address::Ipv6Prefix;
use super::template::FieldValues;
use crate::config::model::{Field, ParamNames};

const MAX_HOSTNAME_LEN: usize = 253;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    pub hostname: Option<String>,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub ipv6prefix: Option<Ipv6Prefix>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A client error: the request is answered without any provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("method {0} is not accepted on this endpoint")]
    MethodNotAllowed(String),

    #[error("invalid {field} '{value}'")]
    InvalidParameter { field: Field, value: String },

    #[error("malformed Authorization header")]
    InvalidAuthorization,

    #[error("one of ipv4, ipv6 or ipv6prefix has to be set and be valid")]
    NoAddress,

    #[error("no configured provider can be updated from this request")]
    NoEligibleProvider { reasons: Vec<String> },
}

impl Rejection {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidParameter { .. } | Self::InvalidAuthorization => StatusCode::BAD_REQUEST,
            Self::NoAddress | Self::NoEligibleProvider { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Serialize)]
struct RejectionBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = RejectionBody {
            error: self.to_string(),
            field: match &self {
                Self::InvalidParameter { field, .. } => Some(*field),
                _ => None,
            },
            details: match self {
                Self::NoEligibleProvider { reasons } => reasons,
                _ => Vec::new(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl UpdateRequest {
    /// Parse the update parameters of one inbound request.
    ///
    /// When a parameter is repeated, the first occurrence wins.
    pub fn parse(
        query: Option<&str>,
        headers: &HeaderMap,
        names: &ParamNames,
    ) -> Result<Self, Rejection> {
        let pairs: Vec<(String, String)> = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let get = |field: Field| {
            let name = names.name_of(field);
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
        };

        let invalid = |field: Field, value: &str| Rejection::InvalidParameter {
            field,
            value: value.to_string(),
        };

        let ipv4 = get(Field::Ipv4)
            .map(|v| v.parse::<Ipv4Addr>().map_err(|_| invalid(Field::Ipv4, v)))
            .transpose()?;
        let ipv6 = get(Field::Ipv6)
            .map(|v| v.parse::<Ipv6Addr>().map_err(|_| invalid(Field::Ipv6, v)))
            .transpose()?;
        let ipv6prefix = get(Field::Ipv6prefix)
            .map(|v| v.parse::<Ipv6Prefix>().map_err(|_| invalid(Field::Ipv6prefix, v)))
            .transpose()?;
        let hostname = get(Field::Hostname)
            .map(|v| validate_hostname(v).map_err(|()| invalid(Field::Hostname, v)))
            .transpose()?;

        let (mut username, mut password) = (
            get(Field::Username).map(String::from),
            get(Field::Password).map(String::from),
        );
        if username.is_none() && password.is_none() {
            if let Some((user, pass)) = basic_credentials(headers)? {
                username = Some(user).filter(|u| !u.is_empty());
                password = Some(pass).filter(|p| !p.is_empty());
            }
        }

        let request = Self {
            hostname,
            ipv4,
            ipv6,
            ipv6prefix,
            username,
            password,
        };

        if request.has_address() {
            Ok(request)
        } else {
            Err(Rejection::NoAddress)
        }
    }

    #[must_use]
    pub const fn has_address(&self) -> bool {
        self.ipv4.is_some() || self.ipv6.is_some() || self.ipv6prefix.is_some()
    }

    /// IPv4 and a delegated prefix, but no IPv6 address yet. Some routers
    /// send this before IPv6 is fully up and follow with a complete update.
    #[must_use]
    pub const fn is_incomplete_dual_stack(&self) -> bool {
        self.ipv4.is_some() && self.ipv6.is_none() && self.ipv6prefix.is_some()
    }

    /// Values as seen by one provider. With an `ipv6_suffix` the provider's
    /// IPv6 address is derived from the prefix instead of taken from `ipv6`.
    #[must_use]
    pub fn values_for(&self, ipv6_suffix: Option<Ipv6Addr>) -> FieldValues {
        let ipv6 = match ipv6_suffix {
            Some(suffix) => self.ipv6prefix.map(|p| p.with_suffix(suffix)),
            None => self.ipv6,
        };

        let mut values = FieldValues::new();
        let mut put = |field: Field, value: Option<String>| {
            if let Some(v) = value {
                values.insert(field, v);
            }
        };
        put(Field::Hostname, self.hostname.clone());
        put(Field::Ipv4, self.ipv4.map(|a| a.to_string()));
        put(Field::Ipv6, ipv6.map(|a| a.to_string()));
        put(Field::Ipv6prefix, self.ipv6prefix.map(|p| p.to_string()));
        put(Field::Username, self.username.clone());
        put(Field::Password, self.password.clone());
        values
    }
}

fn validate_hostname(value: &str) -> Result<String, ()> {
    if value.len() > MAX_HOSTNAME_LEN
        || value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(());
    }
    Ok(value.to_string())
}

fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, Rejection> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| Rejection::InvalidAuthorization)?;
    let Some(encoded) = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))
    else {
        // Other schemes carry nothing we can forward.
        return Ok(None);
    };
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| Rejection::InvalidAuthorization)?;
    let decoded = String::from_utf8(decoded).map_err(|_| Rejection::InvalidAuthorization)?;
    let (user, pass) = decoded
        .split_once(':')
        .ok_or(Rejection::InvalidAuthorization)?;
    Ok(Some((user.to_string(), pass.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn parse(query: &str) -> Result<UpdateRequest, Rejection> {
        UpdateRequest::parse(Some(query), &HeaderMap::new(), &ParamNames::default())
    }

    #[test]
    fn parses_all_fields() {
        let req = parse(
            "hostname=home.example.org&ipv4=203.0.113.7&ipv6=2001:db8::7&ipv6prefix=2001:db8::/56",
        )
        .unwrap();
        assert_eq!(req.hostname.as_deref(), Some("home.example.org"));
        assert_eq!(req.ipv4, Some(Ipv4Addr::new(203, 0, 113, 7)));
        assert_eq!(req.ipv6, Some("2001:db8::7".parse().unwrap()));
        assert_eq!(req.ipv6prefix.unwrap().to_string(), "2001:db8::/56");
    }

    #[test]
    fn empty_values_are_absent() {
        let req = parse("ipv4=203.0.113.7&ipv6=&ipv6prefix=").unwrap();
        assert!(req.ipv6.is_none());
        assert!(req.ipv6prefix.is_none());
    }

    #[test]
    fn invalid_address_is_rejected() {
        assert_eq!(
            parse("ipv4=300.1.1.1"),
            Err(Rejection::InvalidParameter {
                field: Field::Ipv4,
                value: "300.1.1.1".into()
            })
        );
        assert!(matches!(
            parse("ipv4=1.2.3.4&ipv6prefix=nope"),
            Err(Rejection::InvalidParameter { field: Field::Ipv6prefix, .. })
        ));
    }

    #[test]
    fn missing_addresses_are_rejected() {
        assert_eq!(parse("hostname=a.example"), Err(Rejection::NoAddress));
        assert_eq!(
            UpdateRequest::parse(None, &HeaderMap::new(), &ParamNames::default()),
            Err(Rejection::NoAddress)
        );
    }

    #[test]
    fn hostname_with_whitespace_is_rejected() {
        assert!(matches!(
            parse("ipv4=1.2.3.4&hostname=a%20b"),
            Err(Rejection::InvalidParameter { field: Field::Hostname, .. })
        ));
    }

    #[test]
    fn custom_parameter_names() {
        let names = ParamNames {
            ipv4: "myip".into(),
            ..ParamNames::default()
        };
        let req =
            UpdateRequest::parse(Some("myip=198.51.100.1"), &HeaderMap::new(), &names).unwrap();
        assert_eq!(req.ipv4, Some(Ipv4Addr::new(198, 51, 100, 1)));
    }

    #[test]
    fn basic_auth_supplies_credentials() {
        let mut headers = HeaderMap::new();
        // "router:pw"
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic cm91dGVyOnB3"));
        let req =
            UpdateRequest::parse(Some("ipv4=1.2.3.4"), &headers, &ParamNames::default()).unwrap();
        assert_eq!(req.username.as_deref(), Some("router"));
        assert_eq!(req.password.as_deref(), Some("pw"));
    }

    #[test]
    fn malformed_basic_auth_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert_eq!(
            UpdateRequest::parse(Some("ipv4=1.2.3.4"), &headers, &ParamNames::default()),
            Err(Rejection::InvalidAuthorization)
        );
    }

    #[test]
    fn query_credentials_win_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic cm91dGVyOnB3"));
        let req = UpdateRequest::parse(
            Some("ipv4=1.2.3.4&username=q"),
            &headers,
            &ParamNames::default(),
        )
        .unwrap();
        assert_eq!(req.username.as_deref(), Some("q"));
        assert!(req.password.is_none());
    }

    #[test]
    fn suffix_derives_ipv6_from_prefix() {
        let req = parse("ipv4=1.2.3.4&ipv6=2001:db8::1&ipv6prefix=2001:db8:0:100::/56").unwrap();
        let values = req.values_for(Some("::dead:beef".parse().unwrap()));
        assert_eq!(values[&Field::Ipv6], "2001:db8:0:100::dead:beef");

        let plain = req.values_for(None);
        assert_eq!(plain[&Field::Ipv6], "2001:db8::1");
    }

    #[test]
    fn suffix_without_prefix_drops_ipv6() {
        let req = parse("ipv4=1.2.3.4&ipv6=2001:db8::1").unwrap();
        let values = req.values_for(Some("::1".parse().unwrap()));
        assert!(!values.contains_key(&Field::Ipv6));
        assert_eq!(values[&Field::Ipv4], "1.2.3.4");
    }

    #[test]
    fn incomplete_dual_stack_detection() {
        assert!(parse("ipv4=1.2.3.4&ipv6prefix=2001:db8::/56")
            .unwrap()
            .is_incomplete_dual_stack());
        assert!(!parse("ipv4=1.2.3.4&ipv6=2001:db8::1&ipv6prefix=2001:db8::/56")
            .unwrap()
            .is_incomplete_dual_stack());
    }

    #[test]
    fn rejection_statuses() {
        assert_eq!(Rejection::NoAddress.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(Rejection::InvalidAuthorization.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Rejection::MethodNotAllowed("POST".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
