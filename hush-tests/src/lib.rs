//! Shared scaffolding for the end-to-end scenarios under `tests/integration/`
//! (SPEC_FULL.md §8): spin up a real `hush-server` over loopback TCP against
//! an in-memory database, and drive it with the same `hush-client` command
//! runtime a real client uses. Every integration test binary links this as
//! an ordinary library crate, mirroring `rt-test-utils` in the teacher's
//! reference pack (`iwismer-rusty-timer/crates/rt-test-utils`).

use std::sync::Arc;

use anyhow::Result;
use hush_client::{Client, Connection, SqliteClientStore};
use hush_core::{Directory, HushConfig, Services};
use hush_db_entities::Permission;
use tokio::net::TcpListener;

/// Builds and starts a server against a private in-memory SQLite database,
/// bound to an OS-assigned loopback port, and returns its address alongside
/// the [`Services`] handle (so a test can reach into the directory/state
/// tables directly, e.g. to pre-promote a principal to ADMIN).
pub async fn spawn_server() -> Result<(String, Services)> {
    let config = HushConfig {
        database_url: "sqlite::memory:".to_owned(),
        login_timeout_secs: 120,
        ..HushConfig::default()
    };
    let services = Services::new(config).await?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    tokio::spawn(hush_server::serve_plain(services.clone(), listener));

    Ok((addr, services))
}

/// Connects a fresh plain-TCP client against `addr`, with its own
/// in-memory `ClientStore` (so independent test clients never share local
/// identity/message state).
pub async fn connect_client(addr: &str, server_name: &str) -> Result<Client> {
    let (connection, _motd) = Connection::connect_plain(addr).await?;
    let store = Arc::new(SqliteClientStore::open_in_memory()?);
    Ok(Client::new(connection, store, server_name))
}

/// Generates a local identity and REGisters it, without logging in.
pub async fn register_user(client: &Client, username: &str, passphrase: &[u8]) -> Result<()> {
    client.generate_identity(username, passphrase).await?;
    client.register(username).await?;
    Ok(())
}

/// Registers, then raises the principal straight to `permission` in the
/// directory (bypassing the ADMIN/OWNER-gated `promote` sub-op, which this
/// harness uses only to set up fixtures, not to exercise the sub-op itself).
pub async fn register_user_with_permission(
    client: &Client,
    services: &Services,
    username: &str,
    passphrase: &[u8],
    permission: Permission,
) -> Result<()> {
    register_user(client, username, passphrase).await?;
    services.directory.set_permission(username, permission).await?;
    Ok(())
}
