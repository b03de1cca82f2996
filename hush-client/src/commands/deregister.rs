//! `hush-client deregister` (SPEC_FULL.md §4.6 "DEREG").

use anyhow::{Context, Result};

use crate::commands::connect_and_login;
use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await?;
    client.deregister().await.context("deregistering")?;
    client.close().await;

    println!("deregistered {username}");
    Ok(())
}
