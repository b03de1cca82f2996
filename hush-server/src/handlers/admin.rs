//! ADMIN sub-operation table (SPEC_FULL.md §4.6 "Admin sub-operations").

use std::sync::Arc;

use chrono::Utc;
use hush_core::{HookEvent, HushError, SessionState};
use hush_db_entities::Permission;
use hush_protocol::{Action, CodecError, HookId, Packet, NULL_ID};

use super::{HandlerCtx, HandlerReply};
use crate::reply;

pub async fn handle(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    mut args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    if args.is_empty() {
        return Err(CodecError::Arguments.into());
    }
    let sub_op = reply::utf8_arg(args.remove(0))?;

    match sub_op.as_str() {
        "shutdown" => shutdown(ctx, session, args).await,
        "broadcast" => broadcast(ctx, session, args).await,
        "deregister" => deregister(ctx, session, args).await,
        "promote" => promote(ctx, session, args).await,
        "kick" => kick(ctx, session, args).await,
        "set" => set_config(ctx, session, args).await,
        _ => Err(CodecError::Arguments.into()),
    }
}

fn require_permission(session: &SessionState, required: Permission) -> Result<(), HushError> {
    if session.permission < required {
        Err(HushError::Privileges)
    } else {
        Ok(())
    }
}

async fn shutdown(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    require_permission(session, Permission::Admin)?;
    let [stamp] = reply::exactly(args)?;
    let at = reply::decode_timestamp(&stamp)?;
    if at <= Utc::now() {
        return Err(CodecError::Arguments.into());
    }
    ctx.services.shutdown.schedule(at);
    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

async fn broadcast(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    require_permission(session, Permission::Admin)?;
    let [message] = reply::exactly(args)?;

    let sender = format!("{} [ADMIN]", session.username);
    let packet = Packet::new(
        Action::Reciv,
        NULL_ID,
        0,
        vec![sender.into_bytes(), reply::encode_timestamp(Utc::now()), message],
    )?;
    ctx.services.state.broadcast_to_sessions(packet).await;
    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

async fn deregister(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    require_permission(session, Permission::Admin)?;
    let [username] = reply::exactly(args)?;
    let username = reply::utf8_arg(username)?;

    if ctx.services.message_store.has_any(&username).await? {
        ctx.services.directory.tombstone(&username).await?;
    } else {
        ctx.services.directory.delete(&username).await?;
    }

    if let Some(target) = ctx.services.state.session_by_username(&username).await {
        ctx.services.state.logout_session(target.connection).await;
    }
    ctx.services.state.invalidate_reusable_token(&username).await;

    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

/// Raises a principal to ADMIN. The session table is not updated in place
/// (`SessionState::permission` has no interior mutability, see DESIGN.md);
/// an online target only sees the new tier after its next LOGIN. The
/// `permissions_change` hook notifies it meanwhile.
async fn promote(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    require_permission(session, Permission::Owner)?;
    let [username] = reply::exactly(args)?;
    let username = reply::utf8_arg(username)?;

    let principal = ctx
        .services
        .directory
        .find(&username)
        .await?
        .filter(|p| !p.is_tombstoned())
        .ok_or_else(|| HushError::PrincipalNotFound(username.clone()))?;
    if principal.permission >= Permission::Admin {
        return Err(CodecError::Arguments.into());
    }

    ctx.services
        .directory
        .set_permission(&username, Permission::Admin)
        .await?;
    ctx.services
        .state
        .hook_sender()
        .send(HookEvent::new(HookId::PermissionsChange, username, "admin"))
        .await;

    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

/// `ADMIN set <path> <value>`, supplementing the distilled sub-op table with
/// the dynamic-config-field REDESIGN FLAG's registered-schema replacement
/// (§9, `hush_core::ConfigSchema`).
async fn set_config(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    require_permission(session, Permission::Admin)?;
    let [path, value] = reply::exactly(args)?;
    let path = reply::utf8_arg(path)?;
    let value = reply::utf8_arg(value)?;

    let mut config = ctx.services.config.lock().await;
    ctx.services.config_schema.set(&mut config, &path, &value)?;

    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}

async fn kick(
    ctx: &HandlerCtx,
    session: &Arc<SessionState>,
    args: Vec<Vec<u8>>,
) -> Result<HandlerReply, HushError> {
    require_permission(session, Permission::Admin)?;
    let [username] = reply::exactly(args)?;
    let username = reply::utf8_arg(username)?;

    let target = ctx
        .services
        .state
        .session_by_username(&username)
        .await
        .ok_or_else(|| HushError::PrincipalNotFound(username))?;
    ctx.services.state.close_connection(target.connection).await;

    Ok(HandlerReply::Reply(reply::ok(ctx.id)))
}
