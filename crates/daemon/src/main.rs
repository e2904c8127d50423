// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flowforged`: the FlowForge daemon binary.

use std::path::PathBuf;

use ff_daemon::{BuildError, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error(transparent)]
    Config(#[from] ff_daemon::config::ConfigError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config_path = std::env::var("FF_CONFIG_PATH").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.server.port));

    let daemon = ff_daemon::build(config)?;
    let app = ff_daemon::app(daemon.state);

    info!(%addr, "flowforged listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    drop(daemon.tasks);
    drop(daemon.watchers);
    Ok(())
}
