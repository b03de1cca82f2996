//! LOGIN/VERIF and the reusable-token fast path (SPEC_FULL.md §4.5 "Login
//! handshake"), plus the catch-up drain shared with the explicit RECIV
//! action.

use std::sync::Arc;

use chrono::{Duration, Utc};
use hush_core::{HookEvent, HushError, PendingVerification, PublicKey, ReusableToken, SessionState};
use hush_db_entities::Permission;
use hush_protocol::{Action, HookId, Packet, NULL_ID};
use tracing::warn;

use super::{HandlerCtx, HandlerReply};
use crate::reply;

pub async fn handle_login(ctx: &HandlerCtx, args: Vec<Vec<u8>>) -> Result<HandlerReply, HushError> {
    match args.len() {
        1 => {
            let [username] = reply::exactly(args)?;
            issue_challenge(ctx, reply::utf8_arg(username)?).await
        }
        2 if ctx.over_tls => try_reusable_token(ctx, args).await,
        _ => Err(hush_protocol::CodecError::Arguments.into()),
    }
}

pub async fn handle_verif(ctx: &HandlerCtx, args: Vec<Vec<u8>>) -> Result<HandlerReply, HushError> {
    let [username, plaintext] = reply::exactly(args)?;
    let username = reply::utf8_arg(username)?;

    let pending = ctx
        .services
        .state
        .take_pending(ctx.connection)
        .await
        .ok_or(HushError::Handshake)?;

    if pending.username != username
        || pending.is_expired(Utc::now())
        || pending.expected_plaintext != plaintext
    {
        return Err(HushError::Handshake);
    }

    let principal = ctx
        .services
        .directory
        .find(&username)
        .await?
        .filter(|p| !p.is_tombstoned())
        .ok_or_else(|| HushError::PrincipalNotFound(username.clone()))?;
    let public_key_pem = principal
        .public_key_pem
        .clone()
        .expect("checked not tombstoned above");
    let public_key = hush_crypto::public_key_from_pem(&public_key_pem)?;

    bind_session_and_respond(ctx, username, principal.permission, public_key).await
}

/// Issues a fresh 128-byte challenge encrypted under the principal's public
/// key and records the pending verification (§4.5 steps 1-2). Also used as
/// the reusable-token path's fallback when the presented token is missing or
/// invalid (§4.5 "Any failure ... falls back to full handshake").
async fn issue_challenge(ctx: &HandlerCtx, username: String) -> Result<HandlerReply, HushError> {
    let principal = ctx
        .services
        .directory
        .find(&username)
        .await?
        .filter(|p| !p.is_tombstoned())
        .ok_or_else(|| HushError::PrincipalNotFound(username.clone()))?;

    if ctx.services.state.session_by_username(&username).await.is_some() {
        ctx.services
            .state
            .hook_sender()
            .send(HookEvent::new(
                HookId::DuplicateSession,
                username.clone(),
                ctx.remote_address.to_string(),
            ))
            .await;
        return Err(HushError::DuplicateSession(username));
    }

    let public_key_pem = principal
        .public_key_pem
        .expect("checked not tombstoned above");
    let public_key = hush_crypto::public_key_from_pem(&public_key_pem)?;

    let challenge = hush_core::random_charset_bytes(hush_core::CHALLENGE_LEN);
    let ciphertext = hush_crypto::encrypt(&public_key, &challenge)?;

    let login_timeout_secs = ctx.services.config.lock().await.login_timeout_secs;
    ctx.services
        .state
        .insert_pending(
            ctx.connection,
            PendingVerification {
                username,
                expected_plaintext: challenge,
                expires_at: Utc::now() + Duration::seconds(login_timeout_secs as i64),
            },
        )
        .await?;

    Ok(HandlerReply::Reply(Packet::new(
        Action::Verif,
        ctx.id,
        0,
        vec![ciphertext],
    )?))
}

async fn try_reusable_token(ctx: &HandlerCtx, args: Vec<Vec<u8>>) -> Result<HandlerReply, HushError> {
    let [username, token] = reply::exactly(args)?;
    let username = reply::utf8_arg(username)?;

    let Some(tls_binding) = ctx.tls_binding.as_deref() else {
        return issue_challenge(ctx, username).await;
    };

    let valid = ctx
        .services
        .state
        .take_reusable_token_if_valid(&username, &token, ctx.remote_address, tls_binding)
        .await;
    if !valid {
        return issue_challenge(ctx, username).await;
    }

    let principal = ctx
        .services
        .directory
        .find(&username)
        .await?
        .filter(|p| !p.is_tombstoned())
        .ok_or_else(|| HushError::PrincipalNotFound(username.clone()))?;
    let public_key_pem = principal
        .public_key_pem
        .clone()
        .expect("checked not tombstoned above");
    let public_key = hush_crypto::public_key_from_pem(&public_key_pem)?;

    bind_session_and_respond(ctx, username, principal.permission, public_key).await
}

/// Binds the session, pushes OK (carrying a freshly minted reusable token as
/// its sole argument when this connection is over TLS), spawns the hook
/// forwarder, and runs catch-up (§4.5 step 4). The direct reply to LOGIN/VERIF
/// is sent here rather than returned, so catch-up's pushes are guaranteed to
/// follow it on the outbox rather than race it.
async fn bind_session_and_respond(
    ctx: &HandlerCtx,
    username: String,
    permission: Permission,
    public_key: PublicKey,
) -> Result<HandlerReply, HushError> {
    let reusable_token = ctx
        .over_tls
        .then(|| ctx.tls_binding.clone())
        .flatten()
        .map(|binding| (hush_core::random_charset_bytes(hush_core::REUSABLE_TOKEN_LEN), binding));

    let session = SessionState::new(
        ctx.connection,
        username.clone(),
        permission,
        public_key,
        reusable_token.as_ref().map(|(token, _)| token.clone()),
        Some(ctx.remote_address),
        ctx.over_tls,
    );
    let session = ctx.services.state.register_session(session).await?;

    let mut ok_args = Vec::new();
    if let Some((token, binding)) = reusable_token {
        ctx.services
            .state
            .store_reusable_token(
                username.clone(),
                ReusableToken {
                    token: token.clone(),
                    address: ctx.remote_address,
                    tls_binding: binding,
                },
            )
            .await;
        ok_args.push(token);
    }

    ctx.services
        .state
        .send_to_connection(ctx.connection, Packet::new(Action::Ok, ctx.id, 0, ok_args)?)
        .await;

    spawn_hook_forwarder(ctx, &session).await;
    drain_and_push_catchup(ctx, &username).await?;

    Ok(HandlerReply::NoReply)
}

async fn spawn_hook_forwarder(ctx: &HandlerCtx, session: &Arc<SessionState>) {
    let state = ctx.services.state.clone();
    let connection = ctx.connection;
    let username = session.username.clone();
    let subscribed = session.subscribed_hooks.clone();
    let handle = tokio::spawn(async move {
        let mut subscription = state.subscribe_hooks(username, subscribed).await;
        while let Some(event) = subscription.recv().await {
            match build_hook_packet(&event) {
                Ok(packet) => {
                    if !state.send_to_connection(connection, packet).await {
                        break;
                    }
                }
                Err(error) => warn!(%error, "dropping undeliverable hook event"),
            }
        }
    });
    session.set_hook_forwarder(handle).await;
}

fn build_hook_packet(event: &HookEvent) -> Result<Packet, HushError> {
    Ok(Packet::new(
        Action::Hook,
        NULL_ID,
        event.hook_id.code(),
        vec![event.subject.clone().into_bytes(), event.detail.clone().into_bytes()],
    )?)
}

/// Drains cached messages for `username` oldest-first, pushing one
/// NullID RECIV per entry, and deletes only the ones actually delivered
/// (§9 catch-up deletion-boundary decision). Returns the number drained;
/// an empty cache is not an error here (contrast with the explicit RECIV
/// action, which surfaces `Empty`).
pub async fn drain_and_push_catchup(ctx: &HandlerCtx, username: &str) -> Result<usize, HushError> {
    let cached = ctx.services.message_store.drain(username).await?;
    if cached.is_empty() {
        return Ok(0);
    }

    let mut last_delivered_id = None;
    for message in &cached {
        let packet = Packet::new(
            Action::Reciv,
            NULL_ID,
            0,
            vec![
                message.sender.clone().into_bytes(),
                reply::encode_timestamp(message.sent_at),
                message.ciphertext.clone(),
            ],
        )?;
        if !ctx.services.state.send_to_connection(ctx.connection, packet).await {
            break;
        }
        last_delivered_id = Some(message.id);
    }

    if let Some(last_delivered_id) = last_delivered_id {
        ctx.services
            .message_store
            .delete_up_to(username, last_delivered_id)
            .await?;
    }

    Ok(cached.len())
}
