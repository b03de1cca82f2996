use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::store::{ClientStore, LocalIdentity, ServerRecord, StoreError, StoredMessage};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS servers (
    name TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    tls INTEGER NOT NULL,
    certificate_fingerprint BLOB
);
CREATE TABLE IF NOT EXISTS identities (
    username TEXT PRIMARY KEY,
    public_key_pem TEXT NOT NULL,
    encrypted_private_key BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS known_users (
    server TEXT NOT NULL,
    username TEXT NOT NULL,
    public_key_pem TEXT NOT NULL,
    PRIMARY KEY (server, username)
);
CREATE TABLE IF NOT EXISTS reusable_tokens (
    server TEXT NOT NULL,
    username TEXT NOT NULL,
    token BLOB NOT NULL,
    PRIMARY KEY (server, username)
);
CREATE TABLE IF NOT EXISTS messages (
    server TEXT NOT NULL,
    peer TEXT NOT NULL,
    incoming INTEGER NOT NULL,
    sent_at INTEGER NOT NULL,
    plaintext TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS messages_server_peer ON messages (server, peer, sent_at);
";

/// `rusqlite`-backed [`ClientStore`], following the same `Arc<Mutex<Connection>>`
/// shape the pack's `receiver` service uses around its own blocking `Db`
/// (`services/receiver/src/db.rs`, `src/control_api.rs`).
pub struct SqliteClientStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteClientStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn unix(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

fn from_unix(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

#[async_trait]
impl ClientStore for SqliteClientStore {
    async fn save_server(&self, server: &ServerRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO servers (name, address, tls, certificate_fingerprint)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                address = excluded.address,
                tls = excluded.tls,
                certificate_fingerprint = excluded.certificate_fingerprint",
            params![
                server.name,
                server.address,
                server.tls as i64,
                server.certificate_fingerprint,
            ],
        )?;
        Ok(())
    }

    async fn find_server(&self, name: &str) -> Result<Option<ServerRecord>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT name, address, tls, certificate_fingerprint FROM servers WHERE name = ?1",
            params![name],
            |row| {
                Ok(ServerRecord {
                    name: row.get(0)?,
                    address: row.get(1)?,
                    tls: row.get::<_, i64>(2)? != 0,
                    certificate_fingerprint: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }

    async fn save_identity(&self, identity: &LocalIdentity) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO identities (username, public_key_pem, encrypted_private_key)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET
                public_key_pem = excluded.public_key_pem,
                encrypted_private_key = excluded.encrypted_private_key",
            params![
                identity.username,
                identity.public_key_pem,
                identity.encrypted_private_key,
            ],
        )?;
        Ok(())
    }

    async fn find_identity(&self, username: &str) -> Result<Option<LocalIdentity>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT username, public_key_pem, encrypted_private_key FROM identities WHERE username = ?1",
            params![username],
            |row| {
                Ok(LocalIdentity {
                    username: row.get(0)?,
                    public_key_pem: row.get(1)?,
                    encrypted_private_key: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }

    async fn save_known_user(
        &self,
        server: &str,
        username: &str,
        public_key_pem: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO known_users (server, username, public_key_pem)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(server, username) DO UPDATE SET public_key_pem = excluded.public_key_pem",
            params![server, username, public_key_pem],
        )?;
        Ok(())
    }

    async fn find_known_user(
        &self,
        server: &str,
        username: &str,
    ) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT public_key_pem FROM known_users WHERE server = ?1 AND username = ?2",
            params![server, username],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }

    async fn save_reusable_token(
        &self,
        server: &str,
        username: &str,
        token: &[u8],
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO reusable_tokens (server, username, token)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(server, username) DO UPDATE SET token = excluded.token",
            params![server, username, token],
        )?;
        Ok(())
    }

    async fn take_reusable_token(
        &self,
        server: &str,
        username: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock().await;
        let token = conn
            .query_row(
                "SELECT token FROM reusable_tokens WHERE server = ?1 AND username = ?2",
                params![server, username],
                |row| row.get(0),
            )
            .optional()?;
        if token.is_some() {
            conn.execute(
                "DELETE FROM reusable_tokens WHERE server = ?1 AND username = ?2",
                params![server, username],
            )?;
        }
        Ok(token)
    }

    async fn clear_reusable_token(&self, server: &str, username: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM reusable_tokens WHERE server = ?1 AND username = ?2",
            params![server, username],
        )?;
        Ok(())
    }

    async fn record_message(&self, message: &StoredMessage) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO messages (server, peer, incoming, sent_at, plaintext)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.server,
                message.peer,
                message.incoming as i64,
                unix(message.sent_at),
                message.plaintext,
            ],
        )?;
        Ok(())
    }

    async fn history(
        &self,
        server: &str,
        peer: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(
            "SELECT incoming, sent_at, plaintext FROM messages
             WHERE server = ?1 AND peer = ?2
             ORDER BY sent_at DESC LIMIT ?3",
        )?;
        let rows = statement.query_map(params![server, peer, limit as i64], |row| {
            Ok(StoredMessage {
                server: server.to_owned(),
                peer: peer.to_owned(),
                incoming: row.get::<_, i64>(0)? != 0,
                sent_at: from_unix(row.get(1)?),
                plaintext: row.get(2)?,
            })
        })?;
        let mut out = rows.collect::<Result<Vec<_>, _>>()?;
        out.reverse();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_reusable_token() {
        let store = SqliteClientStore::open_in_memory().unwrap();
        store
            .save_reusable_token("home", "alice", b"tok-bytes")
            .await
            .unwrap();
        let token = store.take_reusable_token("home", "alice").await.unwrap();
        assert_eq!(token.as_deref(), Some(&b"tok-bytes"[..]));
        assert!(store.take_reusable_token("home", "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_returns_oldest_first() {
        let store = SqliteClientStore::open_in_memory().unwrap();
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            store
                .record_message(&StoredMessage {
                    server: "home".into(),
                    peer: "bob".into(),
                    incoming: true,
                    sent_at: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
                    plaintext: (*text).to_owned(),
                })
                .await
                .unwrap();
        }
        let history = store.history("home", "bob", 10).await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.plaintext.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }
}
