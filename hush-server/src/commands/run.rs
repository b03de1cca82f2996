//! `hush-server run`, mirroring `warpgate/src/commands/run.rs`'s shape: load
//! config, wire services, start every enabled listener.

use anyhow::{Context, Result};
use hush_core::{config::load_config, Services};
use hush_server::listener;
use tracing::info;

pub async fn command(config_path: &str) -> Result<()> {
    let config = load_config(config_path).context("loading configuration")?;
    info!(version = env!("CARGO_PKG_VERSION"), "hush-server starting");

    let listen = config.listen.clone();
    let tls = config
        .tls
        .clone()
        .map(|tls| (tls.listen, tls.certificate_pem_path, tls.key_pem_path));

    let services = Services::new(config).await.context("wiring services")?;

    listener::run_all(services, listen, tls).await
}
