//! `hush-client admin` (SPEC_FULL.md §4.6 "Admin sub-operations").

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::commands::connect_and_login;
use crate::Cli;

#[derive(Subcommand)]
pub(crate) enum AdminAction {
    /// Schedule a shutdown at an absolute UNIX timestamp.
    Shutdown { at: i64 },
    /// Push a synthetic message to every online session.
    Broadcast { message: String },
    /// Deregister (or tombstone) another user's account.
    Deregister { target: String },
    /// Raise another user's permission to ADMIN (requires OWNER).
    Promote { target: String },
    /// Close another user's connection.
    Kick { target: String },
    /// Set a registered config field by path (§9 dynamic-config REDESIGN FLAG).
    Set { path: String, value: String },
}

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str, action: &AdminAction) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await?;

    match action {
        AdminAction::Shutdown { at } => {
            let at: DateTime<Utc> = DateTime::from_timestamp(*at, 0).context("invalid timestamp")?;
            client.admin_shutdown(at).await.context("scheduling shutdown")?;
        }
        AdminAction::Broadcast { message } => {
            client.admin_broadcast(message).await.context("broadcasting")?;
        }
        AdminAction::Deregister { target } => {
            client
                .admin_deregister(target)
                .await
                .context("deregistering target")?;
        }
        AdminAction::Promote { target } => {
            client.admin_promote(target).await.context("promoting target")?;
        }
        AdminAction::Kick { target } => {
            client.admin_kick(target).await.context("kicking target")?;
        }
        AdminAction::Set { path, value } => {
            client.admin_set(path, value).await.context("setting config")?;
        }
    }

    client.close().await;
    println!("ok");
    Ok(())
}
