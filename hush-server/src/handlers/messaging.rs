//! MSG and the explicit RECIV trigger (SPEC_FULL.md §4.6).

use std::sync::Arc;

use hush_core::{HushError, SessionState};
use hush_protocol::{Action, Packet, NULL_ID};

use super::handshake::drain_and_push_catchup;
use super::{HandlerCtx, HandlerReply};
use crate::reply;

pub async fn handle_msg(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    let [dest, stamp, ciphertext] = reply::exactly(args)?;
    let dest = reply::utf8_arg(dest)?;
    let sent_at = reply::decode_timestamp(&stamp)?;

    ctx.services
        .directory
        .find(&dest)
        .await?
        .filter(|p| !p.is_tombstoned())
        .ok_or_else(|| HushError::PrincipalNotFound(dest.clone()))?;

    let push = Packet::new(
        Action::Reciv,
        NULL_ID,
        0,
        vec![
            session.username.clone().into_bytes(),
            reply::encode_timestamp(sent_at),
            ciphertext.clone(),
        ],
    )?;

    let delivered = ctx.services.state.send_to_username(&dest, push).await;
    if !delivered {
        ctx.services
            .message_store
            .cache(&session.username, &dest, ciphertext, sent_at)
            .await?;
    }

    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

/// The client-initiated catch-up trigger, distinct from the automatic
/// catch-up run right after VERIF succeeds: an empty cache is reported as
/// `Empty` here (§4.6 "RECIV").
pub async fn handle_reciv(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
) -> Result<HandlerReply, HushError> {
    let drained = drain_and_push_catchup(ctx, &session.username).await?;
    if drained == 0 {
        return Err(HushError::Empty);
    }
    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}
