//! REG (SPEC_FULL.md §4.6).

use hush_core::HushError;
use hush_protocol::CodecError;

use super::{HandlerCtx, HandlerReply};
use crate::reply;

/// Usernames are capped at 32 bytes, matching the Principal column's
/// practical limit (§3 "Principal").
const MAX_USERNAME_LEN: usize = 32;

pub async fn handle(ctx: &HandlerCtx, args: Vec<Vec<u8>>) -> Result<HandlerReply, HushError> {
    let [username, public_key_pem] = reply::exactly(args)?;
    let username = reply::utf8_arg(username)?;
    let public_key_pem = reply::utf8_arg(public_key_pem)?;

    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(CodecError::Arguments.into());
    }
    hush_crypto::public_key_from_pem(&public_key_pem)?;

    // A tombstoned row is still present under this username, so it also
    // blocks re-registration (§8 "REG/DEREG idempotence-after-tombstone":
    // retained tombstone => second REG returns Exists).
    if ctx.services.directory.find(&username).await?.is_some() {
        return Err(HushError::PrincipalExists(username));
    }

    ctx.services.directory.insert(&username, &public_key_pem).await?;
    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}
