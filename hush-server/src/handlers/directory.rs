//! REQ and USRS (SPEC_FULL.md §4.6).

use std::sync::Arc;

use hush_core::{HushError, SessionState};
use hush_protocol::{Action, CodecError, Packet};

use super::{HandlerCtx, HandlerReply};
use crate::reply;

pub async fn handle_req(
    ctx: &HandlerCtx,
    _session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    let [username] = reply::exactly(args)?;
    let username = reply::utf8_arg(username)?;

    let principal = ctx
        .services
        .directory
        .find(&username)
        .await?
        .filter(|p| !p.is_tombstoned())
        .ok_or_else(|| HushError::PrincipalNotFound(username.clone()))?;
    let public_key_pem = principal
        .public_key_pem
        .expect("checked not tombstoned above");

    Ok(HandlerReply::Reply(Packet::new(
        Action::Req,
        ctx.id,
        0,
        vec![username.into_bytes(), public_key_pem.into_bytes()],
    )?))
}

/// Bit 0 of the filter byte selects online-only over all known usernames;
/// bit 1 appends each entry's permission tier (§4.6 "permission-decorated
/// variants"; the exact bit assignment is this implementation's own
/// resolution of an underspecified filter byte — see DESIGN.md).
const FILTER_ONLINE_ONLY: u8 = 0b01;
const FILTER_WITH_PERMISSION: u8 = 0b10;

pub async fn handle_usrs(
    ctx: &HandlerCtx,
    _session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    let [filter_arg] = reply::exactly(args)?;
    let &[filter] = filter_arg.as_slice() else {
        return Err(CodecError::Arguments.into());
    };

    let entries: Vec<(String, i16)> = if filter & FILTER_ONLINE_ONLY != 0 {
        ctx.services
            .state
            .online_sessions_summary()
            .await
            .into_iter()
            .map(|(username, permission)| (username, permission.as_i16()))
            .collect()
    } else {
        ctx.services
            .directory
            .list()
            .await?
            .into_iter()
            .filter(|p| !p.is_tombstoned())
            .map(|p| (p.username, p.permission.as_i16()))
            .collect()
    };

    if entries.is_empty() {
        return Err(HushError::Empty);
    }

    let with_permission = filter & FILTER_WITH_PERMISSION != 0;
    let body = entries
        .into_iter()
        .map(|(username, permission)| {
            if with_permission {
                format!("{username} {permission}")
            } else {
                username
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    Ok(HandlerReply::Reply(Packet::new(
        Action::Usrs,
        ctx.id,
        filter,
        vec![body.into_bytes()],
    )?))
}
