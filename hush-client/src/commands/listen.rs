//! `hush-client listen`: stays connected and prints unsolicited pushes
//! (SPEC_FULL.md §4.7 "Unsolicited streams").

use std::time::Duration;

use anyhow::Result;
use hush_client::ClientEvent;

use crate::commands::connect_and_login;
use crate::Cli;

pub(crate) async fn command(cli: &Cli, username: &str, passphrase: &str, seconds: u64) -> Result<()> {
    let client = connect_and_login(cli, username, passphrase).await?;
    println!("listening for {seconds}s...");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, client.next_event()).await {
            Ok(Some(ClientEvent::Message {
                sender,
                sent_at,
                plaintext,
            })) => println!("[{sent_at}] {sender}: {plaintext}"),
            Ok(Some(ClientEvent::Hook { hook, subject, detail })) => {
                println!("[hook {hook:?}] {subject}: {detail}")
            }
            Ok(Some(ClientEvent::Shutdown { at })) => {
                println!("server is shutting down at {at}");
                break;
            }
            Ok(None) => {
                println!("connection closed");
                break;
            }
            Err(_) => break,
        }
    }

    client.close().await;
    Ok(())
}
