use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};

use chrono::{DateTime, Utc};
use hush_db_entities::Permission;
use hush_protocol::{HookId, Packet};
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify, RwLock, Semaphore};
use tokio::task::JoinHandle;

use crate::error::HushError;
use crate::hook_event::HookEvent;
use crate::hooks::{HookHub, HookSender, HookSubscription};

/// A principal's public key, held only in memory for the lifetime of the
/// session (REG/VERIF already persisted the PEM; the server never needs the
/// parsed key outside a login handshake).
pub type PublicKey = rsa::RsaPublicKey;

pub struct SessionState {
    pub connection: u64,
    pub username: String,
    pub permission: Permission,
    pub public_key: PublicKey,
    pub reusable_token: Option<Vec<u8>>,
    pub remote_address: Option<SocketAddr>,
    pub over_tls: bool,
    pub subscribed_hooks: Arc<StdRwLock<HashSet<HookId>>>,
    /// The task forwarding this session's [`HookSubscription`] onto its
    /// connection's outbox, if one has been spawned (§4.5 "Hooks"). Aborted
    /// on logout/disconnect so a stale session never keeps pushing.
    pub hook_forwarder: AsyncMutex<Option<JoinHandle<()>>>,
}

impl SessionState {
    pub fn new(
        connection: u64,
        username: String,
        permission: Permission,
        public_key: PublicKey,
        reusable_token: Option<Vec<u8>>,
        remote_address: Option<SocketAddr>,
        over_tls: bool,
    ) -> Self {
        Self {
            connection,
            username,
            permission,
            public_key,
            reusable_token,
            remote_address,
            over_tls,
            subscribed_hooks: Arc::new(StdRwLock::new(HashSet::new())),
            hook_forwarder: AsyncMutex::new(None),
        }
    }

    /// Stops this session's hook forwarder, if any; idempotent.
    pub async fn abort_hook_forwarder(&self) {
        if let Some(handle) = self.hook_forwarder.lock().await.take() {
            handle.abort();
        }
    }

    pub async fn set_hook_forwarder(&self, handle: JoinHandle<()>) {
        *self.hook_forwarder.lock().await = Some(handle);
    }
}

impl SessionState {
    /// Expands the `all` sugar into the four concrete hook ids (§3).
    pub fn subscribe(&self, hook_id: HookId) {
        let mut hooks = self.subscribed_hooks.write().expect("lock poisoned");
        if hook_id == HookId::All {
            hooks.extend(HookId::CONCRETE);
        } else {
            hooks.insert(hook_id);
        }
    }

    pub fn unsubscribe(&self, hook_id: HookId) {
        let mut hooks = self.subscribed_hooks.write().expect("lock poisoned");
        if hook_id == HookId::All {
            hooks.clear();
        } else {
            hooks.remove(&hook_id);
        }
    }
}

/// What the hub holds to reach a live connection from outside its own
/// reader/runner/writer task trio: a channel to its writer and a way to tell
/// it to close (kick, fatal error elsewhere, shutdown drain).
pub struct ConnectionHandle {
    outbox: mpsc::UnboundedSender<Packet>,
    close: Arc<Notify>,
}

/// Created by LOGIN, resolved (or expired) by VERIF (§3 "Pending verification").
pub struct PendingVerification {
    pub username: String,
    pub expected_plaintext: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl PendingVerification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A TLS-only reusable login token (§3 "Reusable token"), bound to the
/// triple that must all match again on presentation: the username, the
/// connecting address, and a TLS channel-binding value (the exporter value
/// computed once per TLS connection — see `hush-server`'s handshake
/// handling). Single-use-until-`LOGOUT` per the §9 open-question
/// resolution: validating it consumes it from this table.
pub struct ReusableToken {
    pub token: Vec<u8>,
    pub address: SocketAddr,
    pub tls_binding: Vec<u8>,
}

/// The hub's live, in-memory tables: online sessions (by connection and by
/// username), pending verifications (by connection and by username), the
/// hook-subscriber fan-out, and the global connection-count limiter (§4.5,
/// §5). Persisted state (principals, cached messages) lives behind
/// [`crate::directory::Directory`] / [`crate::message_store::MessageStore`],
/// not here.
pub struct State {
    sessions_by_connection: RwLock<HashMap<u64, Arc<SessionState>>>,
    sessions_by_username: RwLock<HashMap<String, u64>>,
    pending_by_connection: RwLock<HashMap<u64, PendingVerification>>,
    pending_by_username: RwLock<HashMap<String, u64>>,
    connections: RwLock<HashMap<u64, ConnectionHandle>>,
    reusable_tokens: RwLock<HashMap<String, ReusableToken>>,
    hook_hub: HookHub<HookEvent>,
    hook_sender: HookSender<HookEvent>,
    connection_slots: Arc<Semaphore>,
    next_connection_id: AtomicU64,
}

impl State {
    pub fn new(max_connections: usize) -> Self {
        let (hook_hub, hook_sender) = HookHub::setup();
        Self {
            sessions_by_connection: RwLock::new(HashMap::new()),
            sessions_by_username: RwLock::new(HashMap::new()),
            pending_by_connection: RwLock::new(HashMap::new()),
            pending_by_username: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            reusable_tokens: RwLock::new(HashMap::new()),
            hook_hub,
            hook_sender,
            connection_slots: Arc::new(Semaphore::new(max_connections)),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Registers a freshly accepted connection's writer channel, before any
    /// session exists for it, so pushes (hooks, relayed MSG, admin broadcast
    /// and kick) can reach it by connection id or, once bound, by username.
    /// Returns the handle the connection's own tasks watch for a forced close.
    pub async fn register_connection(
        &self,
        connection: u64,
        outbox: mpsc::UnboundedSender<Packet>,
    ) -> Arc<Notify> {
        let close = Arc::new(Notify::new());
        self.connections.write().await.insert(
            connection,
            ConnectionHandle {
                outbox,
                close: close.clone(),
            },
        );
        close
    }

    /// Best-effort push to a specific connection's writer. `false` if the
    /// connection is gone or its writer has already stopped reading.
    pub async fn send_to_connection(&self, connection: u64, packet: Packet) -> bool {
        match self.connections.read().await.get(&connection) {
            Some(handle) => handle.outbox.send(packet).is_ok(),
            None => false,
        }
    }

    /// Resolves `username`'s active session to a connection and pushes to it.
    pub async fn send_to_username(&self, username: &str, packet: Packet) -> bool {
        let Some(connection) = self.sessions_by_username.read().await.get(username).copied() else {
            return false;
        };
        self.send_to_connection(connection, packet).await
    }

    /// Pushes `packet` to every connection with an active session (ADMIN
    /// broadcast); anonymous (pre-login) connections are not addressed.
    pub async fn broadcast_to_sessions(&self, packet: Packet) {
        let connections: Vec<u64> = self.sessions_by_username.read().await.values().copied().collect();
        for connection in connections {
            self.send_to_connection(connection, packet.clone()).await;
        }
    }

    /// Wakes the connection's close signal (ADMIN kick); the connection's own
    /// tasks are responsible for actually tearing down the socket.
    pub async fn close_connection(&self, connection: u64) -> bool {
        match self.connections.read().await.get(&connection) {
            Some(handle) => {
                handle.close.notify_waiters();
                true
            }
            None => false,
        }
    }

    pub fn connection_slots(&self) -> Arc<Semaphore> {
        self.connection_slots.clone()
    }

    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn session_by_connection(&self, connection: u64) -> Option<Arc<SessionState>> {
        self.sessions_by_connection
            .read()
            .await
            .get(&connection)
            .cloned()
    }

    pub async fn session_by_username(&self, username: &str) -> Option<Arc<SessionState>> {
        let connection = *self.sessions_by_username.read().await.get(username)?;
        self.session_by_connection(connection).await
    }

    /// Binds a session, rejecting a second simultaneous session for the same
    /// username (§3 "at most one active session per username").
    pub async fn register_session(&self, session: SessionState) -> Result<Arc<SessionState>, HushError> {
        let username = session.username.clone();
        let connection = session.connection;

        if self.sessions_by_username.read().await.contains_key(&username) {
            return Err(HushError::DuplicateSession(username));
        }

        let session = Arc::new(session);
        self.sessions_by_connection
            .write()
            .await
            .insert(connection, session.clone());
        self.sessions_by_username
            .write()
            .await
            .insert(username, connection);
        Ok(session)
    }

    /// Ends the session bound to `connection` without touching the
    /// connection's own registration (LOGOUT/DEREG: the socket stays open
    /// and may REG/LOGIN again). Returns the ended session so the caller can
    /// fire a hook off it.
    pub async fn logout_session(&self, connection: u64) -> Option<Arc<SessionState>> {
        let session = self.sessions_by_connection.write().await.remove(&connection)?;
        self.sessions_by_username
            .write()
            .await
            .remove(&session.username);
        session.abort_hook_forwarder().await;
        Some(session)
    }

    /// Purges every table entry tied to `connection` (§4.5 "Cleanup").
    pub async fn remove_connection(&self, connection: u64) {
        if let Some(session) = self.sessions_by_connection.write().await.remove(&connection) {
            self.sessions_by_username
                .write()
                .await
                .remove(&session.username);
            session.abort_hook_forwarder().await;
        }
        self.pending_by_connection.write().await.remove(&connection);
        let mut by_username = self.pending_by_username.write().await;
        by_username.retain(|_, &mut conn| conn != connection);
        drop(by_username);
        self.connections.write().await.remove(&connection);
    }

    /// Stores a freshly issued reusable token, replacing any prior one for
    /// the same username (§3 "Reusable token").
    pub async fn store_reusable_token(&self, username: String, token: ReusableToken) {
        self.reusable_tokens.write().await.insert(username, token);
    }

    /// Validates and consumes a presented reusable token: it must match the
    /// stored token bytes, source address, and TLS binding exactly. Consumed
    /// (removed) whether it matches or not, since a failed presentation must
    /// invalidate it and fall back to a full handshake (§4.5).
    pub async fn take_reusable_token_if_valid(
        &self,
        username: &str,
        presented: &[u8],
        address: SocketAddr,
        tls_binding: &[u8],
    ) -> bool {
        let mut tokens = self.reusable_tokens.write().await;
        match tokens.remove(username) {
            Some(stored) => {
                stored.token == presented
                    && stored.address == address
                    && stored.tls_binding == tls_binding
            }
            None => false,
        }
    }

    /// Invalidates any reusable token on file for `username` (LOGOUT, per
    /// the §9 single-use-until-logout resolution).
    pub async fn invalidate_reusable_token(&self, username: &str) {
        self.reusable_tokens.write().await.remove(username);
    }

    pub async fn insert_pending(
        &self,
        connection: u64,
        pending: PendingVerification,
    ) -> Result<(), HushError> {
        let username = pending.username.clone();
        self.pending_by_connection
            .write()
            .await
            .insert(connection, pending);
        self.pending_by_username
            .write()
            .await
            .insert(username, connection);
        Ok(())
    }

    /// Removes and returns the pending verification for `connection`, if any.
    pub async fn take_pending(&self, connection: u64) -> Option<PendingVerification> {
        let pending = self.pending_by_connection.write().await.remove(&connection)?;
        self.pending_by_username
            .write()
            .await
            .remove(&pending.username);
        Some(pending)
    }

    /// Drops every pending verification older than its own expiry (§5
    /// "Login pending verification expires after 2 minutes"). Returns the
    /// usernames that were expired, for logging.
    pub async fn expire_pending(&self) -> Vec<String> {
        let now = Utc::now();
        let mut by_connection = self.pending_by_connection.write().await;
        let expired_connections: Vec<u64> = by_connection
            .iter()
            .filter(|(_, pending)| pending.is_expired(now))
            .map(|(connection, _)| *connection)
            .collect();

        let mut expired_usernames = Vec::new();
        for connection in expired_connections {
            if let Some(pending) = by_connection.remove(&connection) {
                expired_usernames.push(pending.username);
            }
        }
        drop(by_connection);

        if !expired_usernames.is_empty() {
            let mut by_username = self.pending_by_username.write().await;
            by_username.retain(|username, _| !expired_usernames.contains(username));
        }
        expired_usernames
    }

    pub async fn all_usernames_with_active_session(&self) -> Vec<String> {
        self.sessions_by_username
            .read()
            .await
            .keys()
            .cloned()
            .collect()
    }

    /// Online usernames paired with their current permission tier, for the
    /// permission-decorated USRS variant (§4.6).
    pub async fn online_sessions_summary(&self) -> Vec<(String, Permission)> {
        let sessions = self.sessions_by_connection.read().await;
        sessions
            .values()
            .map(|session| (session.username.clone(), session.permission))
            .collect()
    }

    pub fn hook_sender(&self) -> HookSender<HookEvent> {
        self.hook_sender.clone()
    }

    /// Subscribes to every hook event whose subject is `username`; a
    /// session's own `subscribed_hooks` set decides which hook ids pass.
    pub async fn subscribe_hooks(
        &self,
        username: String,
        subscribed_hooks: Arc<StdRwLock<HashSet<HookId>>>,
    ) -> HookSubscription<HookEvent> {
        self.hook_hub
            .subscribe(move |event: &HookEvent| {
                event.subject == username && subscribed_hooks.read().expect("lock poisoned").contains(&event.hook_id)
            })
            .await
    }
}
