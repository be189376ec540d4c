//! `ddns-relay run`: start the relay server.
//!
//! Loads the configuration file once, compiles the provider list (with
//! `${VAR}` secrets from the environment), and serves the update endpoint
//! until SIGTERM or Ctrl+C.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::RunArgs;
use crate::config::sources::{self, DEFAULT_FILE_NAMES};
use crate::config::{secrets, validation};
use crate::error::RelayError;
use crate::logging;
use crate::relay::fanout::Forwarder;
use crate::server::{self, AppState, LoadedConfig, Stats};

pub async fn execute(args: RunArgs) -> Result<(), RelayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let path = resolve_config_path(args.config.as_deref()).await?;
    let source = sources::for_path(&path)?;
    let (mut config, version) = source.load().await?;

    if let Some(timeout) = args.timeout {
        config.defaults.timeout = timeout;
        validation::validate(&config).map_err(|errors| RelayError::ConfigValidation { errors })?;
    }

    let forwarder = Forwarder::new(&config, server::build_http_client(), secrets::from_env())?;
    let inbound_path = config.inbound.path.clone();
    let providers = config.provider_names().join(", ");

    let state = Arc::new(AppState {
        config: LoadedConfig {
            config: Arc::new(config),
            version,
            source_name: path.display().to_string(),
        },
        forwarder,
        start_time: Instant::now(),
        stats: Stats::new(),
    });

    let router = server::build_router(state, args.access_log);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        path = %inbound_path,
        config = %path.display(),
        format = source.name(),
        providers = %providers,
        "ddns-relay started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("ddns-relay stopped");
    Ok(())
}

async fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, RelayError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    for name in DEFAULT_FILE_NAMES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Ok(path);
        }
    }

    Err(RelayError::NoConfigSource {
        hint: "Provide --config <file> or place ddns-relay.yaml in the working directory.\n  \
               Run 'ddns-relay init' to create a config file."
            .into(),
    })
}
