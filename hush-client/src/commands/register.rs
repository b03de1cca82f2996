//! `hush-client register` (SPEC_FULL.md §4.6 "REG").

use anyhow::{Context, Result};

use crate::commands::connect;
use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, _passphrase: &str) -> Result<()> {
    let client = connect(cli).await?;
    client.register(username).await.context("registering")?;
    client.close().await;

    println!("registered {username} (run `keygen` first if this failed with NoIdentity)");
    Ok(())
}
