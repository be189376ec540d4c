//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health), and their associated
//! argument structs. Server flags have environment variable equivalents
//! for container deployments.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "ddns-relay",
    version,
    about = "Relay one router DynDNS update to many DNS providers",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        ddns-relay init                      Create a starter config\n  \
        ddns-relay run                       Start with ./ddns-relay.yaml\n  \
        ddns-relay run -c relay.yaml         Start with a specific config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        ddns-relay run                                  Auto-detect config\n  \
        ddns-relay run -c relay.yaml                    Specific config file\n  \
        ddns-relay run -c relay.yaml -p 8080 --pretty   Local dev mode\n  \
        ddns-relay run --host 0.0.0.0                   Listen on all interfaces")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    /// Log every inbound HTTP request
    #[arg(
        long,
        env = "ACCESS_LOG",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
    )]
    pub access_log: bool,

    // -- Tuning --
    /// Provider timeout in milliseconds (overrides `defaults.timeout`)
    #[arg(
        long,
        env = "PROVIDER_TIMEOUT_MS",
        help_heading = "Tuning",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub timeout: Option<u64>,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        ddns-relay init                        Minimal config\n  \
        ddns-relay init --full                 With commented provider presets\n  \
        ddns-relay init -o /etc/relay.yaml     Custom location")]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "ddns-relay.yaml")]
    pub output: PathBuf,

    /// Include commented presets for common providers
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "ddns-relay.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:8000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
