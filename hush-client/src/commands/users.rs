//! `hush-client users` (SPEC_FULL.md §4.6 "USRS").

use anyhow::{Context, Result};

use crate::commands::connect_and_login;
use crate::Cli;

pub(crate) async fn command(
    cli: &Cli,
    username: &str,
    passphrase: &str,
    online: bool,
    with_permission: bool,
) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await?;
    let users = client
        .list_users(online, with_permission)
        .await
        .context("listing users")?;
    client.close().await;

    for entry in users {
        println!("{entry}");
    }
    Ok(())
}
