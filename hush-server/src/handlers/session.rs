//! LOGOUT and DEREG (SPEC_FULL.md §4.6).

use std::sync::Arc;

use hush_core::{HushError, SessionState};

use super::{HandlerCtx, HandlerReply};
use crate::reply;

pub async fn handle_logout(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
) -> Result<HandlerReply, HushError> {
    ctx.services.state.logout_session(session.connection).await;
    ctx.services
        .state
        .invalidate_reusable_token(&session.username)
        .await;
    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

/// Deletes the principal outright, unless cached messages reference it, in
/// which case it is tombstoned instead so those messages keep a valid
/// foreign key (§4.6 DEREG).
pub async fn handle_dereg(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
) -> Result<HandlerReply, HushError> {
    let username = session.username.clone();

    if ctx.services.message_store.has_any(&username).await? {
        ctx.services.directory.tombstone(&username).await?;
    } else {
        ctx.services.directory.delete(&username).await?;
    }

    ctx.services.state.logout_session(session.connection).await;
    ctx.services.state.invalidate_reusable_token(&username).await;

    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}
