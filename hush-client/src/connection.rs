//! The client-side command runtime's transport layer (SPEC_FULL.md §4.7):
//! one request id allocator, one outbound half, and two background tasks —
//! a reader that feeds every parsed packet onto the [`Waitlist`], and a
//! dispatcher that drains unsolicited NullID RECIV/HOOK/SHTDWN pushes onto
//! an event channel.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hush_protocol::{Action, Packet, Waitlist, NULL_ID};
use rustls::pki_types::ServerName;
use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_rustls::{client::TlsStream, TlsConnector};

use crate::error::ClientError;
use crate::tls::build_client_config;

/// Generous enough that a human typing at a REPL never trips it, but short
/// enough that a half-open socket is eventually reclaimed.
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// A [`Notify`] paired with a flag so a late caller (one that shows up after
/// the connection already closed) never waits on a notification that fired
/// before it subscribed — `Notify::notify_waiters` only wakes whoever is
/// already waiting, it doesn't latch for the future (unlike `Waitlist`,
/// which re-checks its queue under the same lock it notifies through).
#[derive(Clone)]
struct CloseSignal {
    notify: Arc<Notify>,
    fired: Arc<AtomicBool>,
}

impl CloseSignal {
    fn new() -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    async fn wait(&self) {
        if self.fired.load(Ordering::Acquire) {
            return;
        }
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.fired.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }
}

pub struct Connection {
    write_half: Mutex<BoxedWrite>,
    waitlist: Waitlist,
    next_id: AtomicU16,
    closed: CloseSignal,
    events: Mutex<mpsc::UnboundedReceiver<Packet>>,
    _reader_task: JoinHandle<()>,
    _dispatcher_task: JoinHandle<()>,
}

impl Connection {
    pub async fn connect_plain(address: &str) -> Result<(Self, String), ClientError> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = split(stream);
        Self::finish_connect(Box::new(read_half), Box::new(write_half)).await
    }

    /// Returns the connection, the server's MOTD, and the leaf certificate's
    /// SHA-256 fingerprint observed during the handshake (for the caller to
    /// pin via [`crate::store::ServerRecord::certificate_fingerprint`]).
    pub async fn connect_tls(
        address: &str,
        expected_fingerprint: Option<Vec<u8>>,
    ) -> Result<(Self, String, Vec<u8>), ClientError> {
        let stream = TcpStream::connect(address).await?;
        let (config, observed) = build_client_config(expected_fingerprint)?;
        let connector = TlsConnector::from(config);
        let server_name = server_name_for(address);
        let tls_stream = connector.connect(server_name, stream).await?;
        let fingerprint = observed
            .lock()
            .unwrap()
            .clone()
            .ok_or(ClientError::FingerprintMismatch)?;
        let (read_half, write_half): (ReadHalf<TlsStream<TcpStream>>, WriteHalf<TlsStream<TcpStream>>) =
            split(tls_stream);
        let (connection, motd) = Self::finish_connect(Box::new(read_half), Box::new(write_half)).await?;
        Ok((connection, motd, fingerprint))
    }

    async fn finish_connect(mut read_half: BoxedRead, write_half: BoxedWrite) -> Result<(Self, String), ClientError> {
        let hello = hush_protocol::read_packet(&mut read_half, READ_IDLE_TIMEOUT)
            .await
            .map_err(|e| ClientError::Codec(e.kind))?;
        if hello.action != Action::Hello {
            return Err(ClientError::UnexpectedReply(hello.action));
        }
        let motd = String::from_utf8_lossy(hello.args.first().map(Vec::as_slice).unwrap_or(b"")).into_owned();

        let waitlist = Waitlist::new();
        let closed = CloseSignal::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let reader_task = tokio::spawn(run_reader(read_half, waitlist.clone(), closed.clone()));
        let dispatcher_task = tokio::spawn(run_dispatcher(waitlist.clone(), closed.clone(), events_tx));

        Ok((
            Self {
                write_half: Mutex::new(write_half),
                waitlist,
                next_id: AtomicU16::new(1),
                closed,
                events: Mutex::new(events_rx),
                _reader_task: reader_task,
                _dispatcher_task: dispatcher_task,
            },
            motd,
        ))
    }

    fn allocate_id(&self) -> u16 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != NULL_ID {
                return id;
            }
        }
    }

    /// Sends `action` with `args` under a fresh id and waits for a reply
    /// whose action is in `expect` or is `ERR`, converting the latter to a
    /// typed [`ClientError::Server`] (SPEC_FULL.md §4.7).
    pub async fn request(
        &self,
        action: Action,
        info: u8,
        args: Vec<Vec<u8>>,
        expect: &[Action],
    ) -> Result<Packet, ClientError> {
        let id = self.allocate_id();
        let packet = Packet::new(action, id, info, args)?;
        self.write(&packet).await?;

        let reply = self
            .waitlist
            .get_until(
                |cmd| cmd.id() == id && (cmd.packet.action == Action::Err || expect.contains(&cmd.packet.action)),
                self.closed.wait(),
            )
            .await
            .ok_or(ClientError::ConnectionClosed)?;

        if reply.packet.action == Action::Err {
            return Err(ClientError::Server(reply.packet.info.into()));
        }
        Ok(reply.packet)
    }

    /// Sends a packet with no expectation of a reply (e.g. KEEP).
    pub async fn send_fire_and_forget(&self, action: Action, info: u8, args: Vec<Vec<u8>>) -> Result<(), ClientError> {
        let packet = Packet::new(action, NULL_ID, info, args)?;
        self.write(&packet).await
    }

    async fn write(&self, packet: &Packet) -> Result<(), ClientError> {
        let bytes = packet.encode()?;
        let mut write_half = self.write_half.lock().await;
        write_half.write_all(&bytes).await?;
        write_half.flush().await?;
        Ok(())
    }

    /// Pops the next unsolicited RECIV/HOOK/SHTDWN push, or `None` once the
    /// connection has closed and no more are queued.
    pub async fn next_event(&self) -> Option<Packet> {
        self.events.lock().await.recv().await
    }

    /// Best-effort drain of whatever unsolicited pushes have already arrived,
    /// without blocking for more (used right after login catch-up).
    pub async fn drain_events(&self, quiet_for: Duration) -> Vec<Packet> {
        let mut drained = Vec::new();
        loop {
            let mut events = self.events.lock().await;
            match tokio::time::timeout(quiet_for, events.recv()).await {
                Ok(Some(packet)) => drained.push(packet),
                _ => return drained,
            }
        }
    }

    pub async fn close(&self) {
        self.closed.fire();
        let _ = self.write_half.lock().await.shutdown().await;
    }
}

async fn run_reader(mut read_half: BoxedRead, waitlist: Waitlist, closed: CloseSignal) {
    loop {
        match hush_protocol::read_packet(&mut read_half, READ_IDLE_TIMEOUT).await {
            Ok(packet) => waitlist.insert(hush_protocol::Command::new(0, packet, false)).await,
            Err(_) => {
                closed.fire();
                return;
            }
        }
    }
}

async fn run_dispatcher(waitlist: Waitlist, closed: CloseSignal, events_tx: mpsc::UnboundedSender<Packet>) {
    loop {
        let matched = waitlist
            .get_until(
                |cmd| {
                    cmd.id() == NULL_ID
                        && matches!(cmd.packet.action, Action::Reciv | Action::Hook | Action::Shtdwn)
                },
                closed.wait(),
            )
            .await;
        match matched {
            Some(command) => {
                if events_tx.send(command.packet).is_err() {
                    return;
                }
            }
            None => return,
        }
    }
}

/// Hostname verification is intentionally not performed (see
/// `tls::PinningVerifier`'s doc comment), so this only needs to produce a
/// syntactically valid SNI name, not a DNS-resolvable one.
fn server_name_for(address: &str) -> ServerName<'static> {
    let host = address.rsplit_once(':').map(|(host, _)| host).unwrap_or(address);
    ServerName::try_from(host.to_owned()).expect("configured server host is a valid SNI name")
}
