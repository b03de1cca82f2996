//! Per-connection reader/runner/writer task trio (SPEC_FULL.md §4.2, §4.5,
//! §5 "Scheduling model").
//!
//! The reader turns bytes into `Packet`s and forwards them to the runner
//! over a bounded channel; the runner dispatches them one at a time (the
//! single-principal serialization guarantee) and pushes replies to the
//! writer's outbox; the writer also relays hook pushes, catch-up RECIVs, and
//! SHTDWN announcements enqueued from elsewhere via `State`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hush_core::Services;
use hush_protocol::{read_packet, Action, Packet, NULL_ID};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, Notify};
use tracing::warn;

use crate::handlers::{self, HandlerCtx};
use crate::reply;

/// Capacity of the reader-to-runner channel; a slow runner applies
/// backpressure to the reader rather than growing memory without bound.
const JOB_CHANNEL_CAPACITY: usize = 32;

pub async fn handle<S>(
    services: Services,
    stream: S,
    remote_address: SocketAddr,
    over_tls: bool,
    tls_binding: Option<Vec<u8>>,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let connection = services.state.next_connection_id();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel::<Packet>();
    let close = services.state.register_connection(connection, outbox_tx.clone()).await;

    let (idle_timeout, motd) = {
        let config = services.config.lock().await;
        (Duration::from_secs(config.idle_timeout_secs), config.motd.clone())
    };

    let hello = match Packet::new(Action::Hello, NULL_ID, 0, vec![motd.into_bytes()]) {
        Ok(packet) => packet,
        Err(error) => {
            warn!(%error, connection, "motd does not fit in a HELLO packet");
            services.state.remove_connection(connection).await;
            return;
        }
    };
    if outbox_tx.send(hello).is_err() {
        services.state.remove_connection(connection).await;
        return;
    }

    let (read_half, write_half) = tokio::io::split(stream);

    let writer = tokio::spawn(run_writer(
        write_half,
        outbox_rx,
        services.shutdown.subscribe_announcements(),
        close.clone(),
    ));

    let (job_tx, job_rx) = mpsc::channel::<Packet>(JOB_CHANNEL_CAPACITY);
    let runner = tokio::spawn(run_runner(
        services.clone(),
        connection,
        remote_address,
        over_tls,
        tls_binding,
        job_rx,
        outbox_tx.clone(),
        close.clone(),
    ));

    run_reader(read_half, job_tx, outbox_tx, idle_timeout, close).await;

    let _ = runner.await;
    let _ = writer.await;
    services.state.remove_connection(connection).await;
}

async fn run_reader<R>(
    mut read_half: R,
    job_tx: mpsc::Sender<Packet>,
    outbox: mpsc::UnboundedSender<Packet>,
    idle_timeout: Duration,
    close: Arc<Notify>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            _ = close.notified() => return,
            read = read_packet(&mut read_half, idle_timeout) => {
                match read {
                    Ok(packet) => {
                        if job_tx.send(packet).await.is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        let code = error.kind.as_error_code();
                        if error.kind.is_fatal() {
                            let _ = outbox.send(reply::err_null(code));
                            return;
                        }
                        let _ = outbox.send(reply::err(error.id.unwrap_or(NULL_ID), code));
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_runner(
    services: Services,
    connection: u64,
    remote_address: SocketAddr,
    over_tls: bool,
    tls_binding: Option<Vec<u8>>,
    mut job_rx: mpsc::Receiver<Packet>,
    outbox: mpsc::UnboundedSender<Packet>,
    close: Arc<Notify>,
) {
    while let Some(packet) = job_rx.recv().await {
        let ctx = HandlerCtx {
            services: services.clone(),
            connection,
            id: packet.id,
            remote_address,
            over_tls,
            tls_binding: tls_binding.clone(),
        };
        let (reply, should_close) = handlers::dispatch(ctx, packet).await;
        if let Some(reply) = reply {
            let _ = outbox.send(reply);
        }
        if should_close {
            close.notify_waiters();
            return;
        }
    }
}

async fn run_writer<W>(
    mut write_half: W,
    mut outbox: mpsc::UnboundedReceiver<Packet>,
    mut announcements: broadcast::Receiver<DateTime<Utc>>,
    close: Arc<Notify>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = close.notified() => break,
            announced = announcements.recv() => {
                if let Ok(at) = announced {
                    let packet = Packet::new(Action::Shtdwn, NULL_ID, 0, vec![reply::encode_timestamp(at)])
                        .expect("an 8-byte timestamp argument never exceeds packet limits");
                    if write_packet(&mut write_half, &packet).await.is_err() {
                        break;
                    }
                }
            }
            packet = outbox.recv() => {
                match packet {
                    Some(packet) => {
                        if write_packet(&mut write_half, &packet).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
    let _ = write_half.shutdown().await;
}

async fn write_packet<W>(write_half: &mut W, packet: &Packet) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = packet
        .encode()
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string()))?;
    write_half.write_all(&bytes).await
}
