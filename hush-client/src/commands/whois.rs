//! `hush-client whois` (SPEC_FULL.md §4.6 "REQ").

use anyhow::{Context, Result};

use crate::commands::connect_and_login;
use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str, target: &str) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await?;
    let pem = client
        .request_public_key(target)
        .await
        .context("requesting public key")?;
    client.close().await;

    println!("{pem}");
    Ok(())
}
