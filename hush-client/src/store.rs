use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A previously-used server, keyed by the name the user chose for it
/// (SPEC_FULL.md §6 "the client persists servers (address, port, TLS flag,
/// name)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub name: String,
    pub address: String,
    pub tls: bool,
    /// SHA-256 fingerprint of the leaf certificate trusted on first connect,
    /// `None` for plain-TCP servers. See `tls::PinningVerifier`.
    pub certificate_fingerprint: Option<Vec<u8>>,
}

/// A local user identity: the keypair generated by `keygen`, with the
/// private key encrypted at rest under the user's passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub username: String,
    pub public_key_pem: String,
    /// `hush_crypto::encrypt_data` output; only ever decrypted in memory.
    pub encrypted_private_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub server: String,
    pub peer: String,
    /// `true` if `peer` sent this message; `false` if the local user did.
    pub incoming: bool,
    pub sent_at: DateTime<Utc>,
    pub plaintext: String,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage backend task panicked")]
    BackendGone,
}

/// Client-side persistence boundary (SPEC_FULL.md §6, "Non-goals: local
/// SQLite schema details"). The command runtime only ever talks to this
/// trait; the default `rusqlite` implementation lives in `sqlite_store`.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn save_server(&self, server: &ServerRecord) -> Result<(), StoreError>;
    async fn find_server(&self, name: &str) -> Result<Option<ServerRecord>, StoreError>;

    async fn save_identity(&self, identity: &LocalIdentity) -> Result<(), StoreError>;
    async fn find_identity(&self, username: &str) -> Result<Option<LocalIdentity>, StoreError>;

    async fn save_known_user(
        &self,
        server: &str,
        username: &str,
        public_key_pem: &str,
    ) -> Result<(), StoreError>;
    async fn find_known_user(
        &self,
        server: &str,
        username: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn save_reusable_token(
        &self,
        server: &str,
        username: &str,
        token: &[u8],
    ) -> Result<(), StoreError>;
    async fn take_reusable_token(
        &self,
        server: &str,
        username: &str,
    ) -> Result<Option<Vec<u8>>, StoreError>;
    async fn clear_reusable_token(&self, server: &str, username: &str) -> Result<(), StoreError>;

    async fn record_message(&self, message: &StoredMessage) -> Result<(), StoreError>;
    async fn history(
        &self,
        server: &str,
        peer: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}
