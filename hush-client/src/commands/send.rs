//! `hush-client send` (SPEC_FULL.md §4.6 "MSG").

use anyhow::{Context, Result};

use crate::commands::connect_and_login;
use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str, dest: &str, message: &str) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await?;
    client.send_message(dest, message).await.context("sending message")?;
    client.close().await;

    println!("sent to {dest}");
    Ok(())
}
