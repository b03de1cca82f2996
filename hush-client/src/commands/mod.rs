//! One module per CLI subcommand, thin adapters over `hush_client::Client`
//! (SPEC_FULL.md §4.7), mirroring `warpgate/src/commands/*.rs`'s
//! `command(cli, ...)` shape.

pub mod admin;
pub mod deregister;
pub mod keygen;
pub mod listen;
pub mod login;
pub mod logout;
pub mod register;
pub mod send;
pub mod users;
pub mod whois;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use hush_client::{Client, Connection, ServerRecord, SqliteClientStore};

use crate::Cli;

/// Opens the local store and connects to `cli`'s configured server
/// (SPEC_FULL.md §4.7). On TLS, the previously pinned fingerprint (if any)
/// is passed in and a freshly observed one is saved back (trust-on-first-use,
/// see `hush_client::tls`).
pub(crate) async fn connect(cli: &Cli) -> Result<Client> {
    let store = Arc::new(
        SqliteClientStore::open(Path::new(&cli.store)).context("opening local client store")?,
    );

    let (connection, motd) = if cli.tls {
        let pinned = store
            .find_server(&cli.server_name)
            .await
            .context("looking up stored server record")?
            .and_then(|record| record.certificate_fingerprint);
        let (connection, motd, fingerprint) = Connection::connect_tls(&cli.address, pinned)
            .await
            .context("connecting over TLS")?;
        store
            .save_server(&ServerRecord {
                name: cli.server_name.clone(),
                address: cli.address.clone(),
                tls: true,
                certificate_fingerprint: Some(fingerprint),
            })
            .await
            .context("pinning server certificate")?;
        (connection, motd)
    } else {
        let (connection, motd) = Connection::connect_plain(&cli.address).await.context("connecting")?;
        store
            .save_server(&ServerRecord {
                name: cli.server_name.clone(),
                address: cli.address.clone(),
                tls: false,
                certificate_fingerprint: None,
            })
            .await
            .context("recording server")?;
        (connection, motd)
    };

    tracing::info!(%motd, server = %cli.server_name, "connected");
    Ok(Client::new(connection, store, cli.server_name.clone()))
}

/// [`connect`] plus [`Client::login`], for every subcommand that needs an
/// authenticated session.
pub(crate) async fn connect_and_login(cli: &Cli, username: &str, passphrase: &str) -> Result<Client> {
    let client = connect(cli).await?;
    client
        .login(username, passphrase.as_bytes())
        .await
        .context("logging in")?;
    Ok(client)
}
