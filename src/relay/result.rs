//! Per-provider results and the aggregate returned to the router.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOutcome {
    Success,
    Failure,
    /// The request lacked a field this provider needs; no call was made.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub provider: String,
    pub outcome: ProviderOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub latency_ms: u64,
}

impl ProviderResult {
    #[must_use]
    pub fn skipped(provider: &str, reason: String) -> Self {
        Self {
            provider: provider.to_string(),
            outcome: ProviderOutcome::Skipped,
            status: None,
            error: Some(reason),
            body: None,
            latency_ms: 0,
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome == ProviderOutcome::Failure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    Success,
    PartialFailure,
    /// Deliberately not forwarded (incomplete dual-stack update).
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub status: AggregateStatus,
    /// Names of providers whose update failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
    /// One entry per configured provider, in configuration order.
    #[serde(default)]
    pub providers: Vec<ProviderResult>,
}

impl AggregateResult {
    #[must_use]
    pub fn from_results(providers: Vec<ProviderResult>) -> Self {
        let failed: Vec<String> = providers
            .iter()
            .filter(|r| r.is_failure())
            .map(|r| r.provider.clone())
            .collect();
        let status = if failed.is_empty() {
            AggregateStatus::Success
        } else {
            AggregateStatus::PartialFailure
        };
        Self {
            status,
            failed,
            providers,
        }
    }

    #[must_use]
    pub const fn ignored() -> Self {
        Self {
            status: AggregateStatus::Ignored,
            failed: Vec::new(),
            providers: Vec::new(),
        }
    }

    /// Status code for the router. When every failure is a 429 the router
    /// is told to back off; any other failure is a bad gateway.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            AggregateStatus::Success | AggregateStatus::Ignored => StatusCode::OK,
            AggregateStatus::PartialFailure => {
                let all_rate_limited = self
                    .providers
                    .iter()
                    .filter(|r| r.is_failure())
                    .all(|r| r.status == Some(429));
                if all_rate_limited {
                    StatusCode::TOO_MANY_REQUESTS
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
        }
    }
}
