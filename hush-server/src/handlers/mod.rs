//! One module per action family, dispatched from [`route`] (SPEC_FULL.md
//! §4.5 "Dispatch", §4.6).

mod admin;
mod directory;
mod handshake;
mod hooks;
mod messaging;
mod registration;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use hush_core::{HushError, Services, SessionState};
use hush_protocol::{Action, Packet};
use tracing::warn;

use crate::reply;

/// Everything a handler needs to act on one request (SPEC_FULL.md §4.5/§4.6).
///
/// `tls_binding` is `Some` only for TLS connections; it is the RFC 5705
/// exporter value computed once at TLS handshake time (see
/// `crate::tls::export_channel_binding`), used to scope reusable tokens to
/// this specific TLS connection.
pub struct HandlerCtx {
    pub services: Services,
    pub connection: u64,
    pub id: u16,
    pub remote_address: SocketAddr,
    pub over_tls: bool,
    pub tls_binding: Option<Vec<u8>>,
}

/// What a handler wants to happen next, before error mapping (§7).
pub enum HandlerReply {
    Reply(Packet),
    NoReply,
}

fn require_session(session: Option<Arc<SessionState>>) -> Result<Arc<SessionState>, HushError> {
    session.ok_or(HushError::NoSession)
}

fn ensure_no_session(session: &Option<Arc<SessionState>>) -> Result<(), HushError> {
    if session.is_some() {
        Err(HushError::AlreadySession)
    } else {
        Ok(())
    }
}

/// Runs one parsed packet through session resolution and dispatch, turning
/// the handler's outcome (or error) into the reply to send and whether the
/// connection must close afterward (§7 "Propagation policy").
pub async fn dispatch(ctx: HandlerCtx, packet: Packet) -> (Option<Packet>, bool) {
    let id = ctx.id;
    match route(&ctx, packet).await {
        Ok(HandlerReply::Reply(reply)) => (Some(reply), false),
        Ok(HandlerReply::NoReply) => (None, false),
        Err(error) => {
            let code = error.as_error_code();
            warn!(%error, ?code, request_id = id, "request failed");
            (Some(reply::err(id, code)), code.is_fatal())
        }
    }
}

async fn route(ctx: &HandlerCtx, packet: Packet) -> Result<HandlerReply, HushError> {
    let session = ctx.services.state.session_by_connection(ctx.connection).await;
    match packet.action {
        Action::Reg => {
            ensure_no_session(&session)?;
            registration::handle(ctx, packet.args).await
        }
        Action::Login => {
            ensure_no_session(&session)?;
            handshake::handle_login(ctx, packet.args).await
        }
        Action::Verif => {
            ensure_no_session(&session)?;
            handshake::handle_verif(ctx, packet.args).await
        }
        Action::Logout => session::handle_logout(ctx, &require_session(session)?).await,
        Action::Dereg => session::handle_dereg(ctx, &require_session(session)?).await,
        Action::Req => directory::handle_req(ctx, &require_session(session)?, packet.args).await,
        Action::Usrs => directory::handle_usrs(ctx, &require_session(session)?, packet.args).await,
        Action::Msg => messaging::handle_msg(ctx, &require_session(session)?, packet.args).await,
        Action::Reciv => messaging::handle_reciv(ctx, &require_session(session)?).await,
        Action::Keep => {
            // Liveness ping: the connection's reader loop already treats any
            // successfully parsed packet as activity, so there is nothing
            // else to reset here (§4.6 "KEEP").
            require_session(session)?;
            Ok(HandlerReply::NoReply)
        }
        Action::Sub => hooks::handle_sub(ctx, &require_session(session)?, packet.args).await,
        Action::Unsub => hooks::handle_unsub(ctx, &require_session(session)?, packet.args).await,
        Action::Admin => admin::handle(ctx, &require_session(session)?, packet.args).await,
        other => Err(HushError::from(hush_protocol::CodecError::Invalid(other.code()))),
    }
}
