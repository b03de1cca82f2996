//! `hush-client login` (SPEC_FULL.md §4.5 "Login handshake"). Runs the full
//! LOGIN/VERIF round trip, including catch-up, then disconnects; a
//! standalone verb mostly useful for checking a stored identity still
//! authenticates before it's used inside `send`/`listen`/etc.

use anyhow::{Context, Result};

use crate::commands::connect_and_login;
use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await.context("logging in")?;
    client.close().await;

    println!("logged in as {username}");
    Ok(())
}
