//! ddns-relay forwards dynamic-DNS updates from a home router to several
//! upstream DynDNS providers.
//!
//! A router only knows how to call a single update URL. ddns-relay exposes
//! that URL, parses the router's parameters, fills them into each configured
//! provider's URL template, calls all providers concurrently, and answers
//! with one aggregate result so the router can apply its own retry logic.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Configuration model, `${VAR}` secret expansion, validation,
//!   and file loading via the [`ConfigSource`](config::ConfigSource) trait.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`relay`] -- Inbound parameter parsing, provider templates, and the
//!   concurrent fan-out [`Forwarder`](relay::fanout::Forwarder).
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod relay;
pub mod server;
