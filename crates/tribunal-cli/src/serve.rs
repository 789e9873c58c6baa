//! `tribunal serve` — run the API server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use tribunal_api::state::AppState;

use crate::config::load_config;

/// Arguments for `tribunal serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind address, overriding the config file.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

/// Run the API server until interrupted.
pub async fn run_serve(args: &ServeArgs, config_path: Option<&PathBuf>) -> anyhow::Result<u8> {
    let mut config = load_config(config_path.map(PathBuf::as_path))?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let bind_addr = config.bind_addr;

    let state = AppState::new(config);
    let app = tribunal_api::app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding to {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "tribunal API listening");

    axum::serve(listener, app)
        .await
        .context("serving the tribunal API")?;
    Ok(0)
}
