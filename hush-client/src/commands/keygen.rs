//! `hush-client keygen` (SPEC_FULL.md §4.4, §6). Runs with no connection:
//! just generates and stores a keypair.

use std::path::Path;

use anyhow::{Context, Result};
use hush_client::SqliteClientStore;

use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str) -> Result<()> {
    let store = SqliteClientStore::open(Path::new(&cli.store)).context("opening local client store")?;

    hush_client::generate_identity(&store, username, passphrase.as_bytes())
        .await
        .context("generating identity")?;

    println!("generated and stored a new identity for {username}");
    Ok(())
}
