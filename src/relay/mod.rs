//! The update endpoint: one router request in, one call per provider out.
//!
//! [`update_handler`] is mounted at `inbound.path`. It checks the method,
//! parses the update ([`request`]), and hands it to the [`fanout`] engine,
//! which renders each provider's URL ([`template`], [`address`]), builds
//! outbound headers ([`headers`]), and aggregates the outcomes ([`result`]).

pub mod address;
pub mod fanout;
pub mod headers;
pub mod request;
pub mod result;
pub mod template;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use self::request::{Rejection, UpdateRequest};
use self::result::{AggregateResult, AggregateStatus};
use crate::server::AppState;

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
) -> Response {
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    state.stats.received.fetch_add(1, Ordering::Relaxed);

    let inbound = &state.config.config.inbound;
    let outcome = match parse_update(inbound, &method, &uri, &req_headers) {
        Ok(update) => {
            tracing::info!(
                correlation_id = %correlation_id,
                hostname = update.hostname.as_deref().unwrap_or(""),
                ipv4 = ?update.ipv4,
                ipv6 = ?update.ipv6,
                ipv6prefix = ?update.ipv6prefix.map(|p| p.to_string()),
                "update received"
            );

            if inbound.ignore_incomplete_dual_stack && update.is_incomplete_dual_stack() {
                tracing::info!(
                    correlation_id = %correlation_id,
                    "ipv6prefix without ipv6, waiting for the complete update"
                );
                Ok(AggregateResult::ignored())
            } else {
                state.forwarder.handle(&update, &correlation_id).await
            }
        }
        Err(rejection) => Err(rejection),
    };

    let aggregate = match outcome {
        Ok(aggregate) => aggregate,
        Err(rejection) => {
            state.stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                correlation_id = %correlation_id,
                method = %method,
                error = %rejection,
                "update rejected"
            );
            let mut response = rejection.into_response();
            insert_correlation_id(&mut response, &correlation_id);
            return response;
        }
    };

    let counter = match aggregate.status {
        AggregateStatus::Success => &state.stats.succeeded,
        AggregateStatus::PartialFailure => &state.stats.partial_failures,
        AggregateStatus::Ignored => &state.stats.ignored,
    };
    counter.fetch_add(1, Ordering::Relaxed);

    let status = aggregate.http_status();
    if aggregate.status == AggregateStatus::PartialFailure {
        tracing::warn!(
            correlation_id = %correlation_id,
            failed = ?aggregate.failed,
            status = status.as_u16(),
            "update partially failed"
        );
    }

    let mut response = (status, Json(aggregate)).into_response();
    insert_correlation_id(&mut response, &correlation_id);
    response
}

fn parse_update(
    inbound: &crate::config::model::InboundConfig,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<UpdateRequest, Rejection> {
    if !inbound
        .methods
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method.as_str()))
    {
        return Err(Rejection::MethodNotAllowed(method.to_string()));
    }
    UpdateRequest::parse(uri.query(), headers, &inbound.params)
}

fn insert_correlation_id(response: &mut Response, correlation_id: &str) {
    if let Ok(value) = axum::http::HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert("x-correlation-id", value);
    }
}
