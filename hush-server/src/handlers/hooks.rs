//! SUB/UNSUB (SPEC_FULL.md §4.6).

use std::sync::Arc;

use hush_core::{HushError, SessionState};
use hush_protocol::HookId;

use super::{HandlerCtx, HandlerReply};
use crate::reply;

pub async fn handle_sub(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    let hook_id = parse_hook_id(args)?;
    session.subscribe(hook_id);
    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

pub async fn handle_unsub(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    let hook_id = parse_hook_id(args)?;
    session.unsubscribe(hook_id);
    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

fn parse_hook_id(args: Vec<Vec<u8>>) -> Result<HookId, HushError> {
    let [raw] = reply::exactly(args)?;
    let &[code] = raw.as_slice() else {
        return Err(HushError::UnknownHook);
    };
    HookId::try_from(code).map_err(|_| HushError::UnknownHook)
}
