//! `hush-client logout` (SPEC_FULL.md §4.6 "LOGOUT").

use anyhow::{Context, Result};

use crate::commands::connect_and_login;
use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await?;
    client.logout().await.context("logging out")?;
    client.close().await;

    println!("logged out {username}");
    Ok(())
}
