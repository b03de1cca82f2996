//! Plain and TLS accept loops (SPEC_FULL.md §4.5, §6 "Transport": "Servers
//! SHOULD support both plain and TLS listeners concurrently").

use std::net::SocketAddr;

use anyhow::{Context, Result};
use futures::StreamExt;
use hush_core::Services;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::OwnedSemaphorePermit;
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn};

use crate::connection;
use crate::tls;

pub async fn run_plain(services: Services, addr: String) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding plain listener on {addr}"))?;
    info!(%addr, "plain listener ready");
    serve_plain(services, listener).await;
    Ok(())
}

/// Runs the plain-TCP accept loop over an already-bound listener. Split out
/// of [`run_plain`] so a caller that needs the bound ephemeral port up front
/// (an OS-assigned `:0` port, e.g. in integration tests) can bind first,
/// read `local_addr()`, and only then hand the listener off to the loop.
pub async fn serve_plain(services: Services, listener: TcpListener) {
    accept_loop(services, listener, None).await;
}

pub async fn run_tls(
    services: Services,
    addr: String,
    certificate_pem_path: String,
    key_pem_path: String,
) -> Result<()> {
    let acceptor = tls::build_acceptor(&certificate_pem_path, &key_pem_path)
        .context("configuring TLS listener")?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding TLS listener on {addr}"))?;
    info!(%addr, "TLS listener ready");
    accept_loop(services, listener, Some(acceptor)).await;
    Ok(())
}

async fn accept_loop(services: Services, listener: TcpListener, acceptor: Option<TlsAcceptor>) {
    loop {
        tokio::select! {
            _ = services.shutdown.wait_stopped() => {
                info!("listener stopping, shutdown in progress");
                return;
            }
            accepted = listener.accept() => {
                let (socket, remote_address) = match accepted {
                    Ok(pair) => pair,
                    Err(error) => {
                        warn!(%error, "failed to accept connection");
                        continue;
                    }
                };
                let permit = match services.state.connection_slots().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(%remote_address, "connection limit reached, dropping connection");
                        continue;
                    }
                };
                spawn_connection(services.clone(), socket, remote_address, acceptor.clone(), permit);
            }
        }
    }
}

fn spawn_connection(
    services: Services,
    socket: TcpStream,
    remote_address: SocketAddr,
    acceptor: Option<TlsAcceptor>,
    permit: OwnedSemaphorePermit,
) {
    tokio::spawn(async move {
        let _permit = permit;
        let _ = socket.set_nodelay(true);
        match acceptor {
            None => connection::handle(services, socket, remote_address, false, None).await,
            Some(acceptor) => match acceptor.accept(socket).await {
                Ok(tls_stream) => {
                    let tls_binding = match tls::export_channel_binding(&tls_stream) {
                        Ok(binding) => Some(binding),
                        Err(error) => {
                            warn!(%error, "TLS channel-binding export failed, reusable tokens disabled for this connection");
                            None
                        }
                    };
                    connection::handle(services, tls_stream, remote_address, true, tls_binding).await;
                }
                Err(error) => warn!(%error, %remote_address, "TLS handshake failed"),
            },
        }
    });
}

/// Runs whichever listeners the config enables, returning once every one of
/// them has stopped (shutdown or fatal bind error on all of them).
pub async fn run_all(services: Services, listen: String, tls: Option<(String, String, String)>) -> Result<()> {
    let mut listener_futures = futures::stream::FuturesUnordered::new();
    listener_futures.push(tokio::spawn(run_plain(services.clone(), listen)));
    if let Some((tls_listen, certificate_pem_path, key_pem_path)) = tls {
        listener_futures.push(tokio::spawn(run_tls(
            services,
            tls_listen,
            certificate_pem_path,
            key_pem_path,
        )));
    }
    while let Some(result) = listener_futures.next().await {
        if let Err(error) = result.context("listener task panicked")? {
            warn!(%error, "listener exited with an error");
        }
    }
    Ok(())
}
