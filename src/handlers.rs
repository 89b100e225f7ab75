//! Built-in handlers for the illustrative method table.
//!
//! | Method id | Body             | Effect                                      |
//! |-----------|------------------|---------------------------------------------|
//! | `0x0101`  | [`PlayerInfo`]   | binds the session, emits `ConnectionIdentified` |
//! | `0x0201`  | [`TargetAppeared`] | records the target, emits `TargetEligible` |
//! | `0x0202`  | [`TargetRemoved`]  | forgets the target, emits `TargetCleared`  |
//!
//! Bodies are bincode-encoded with the standard configuration.

use async_trait::async_trait;
use bincode::{Decode, Encode};
use tracing::debug;

use crate::{
    config::ConfigError,
    dispatch::{DecodedEvent, Handler, HandlerContext, HandlerTable},
    error::HandlerError,
    frame::Frame,
    message::Message,
    session::{KnownTarget, PlayerIdentity},
};

/// Method id announcing the player bound to the connection.
pub const PLAYER_INFO: u16 = 0x0101;
/// Method id announcing a target entering view.
pub const TARGET_APPEARED: u16 = 0x0201;
/// Method id announcing a target leaving view.
pub const TARGET_REMOVED: u16 = 0x0202;

/// Body of a [`PLAYER_INFO`] sub-message.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct PlayerInfo {
    /// Server-assigned player id.
    pub player_id: u64,
    /// Display name. Must not be empty.
    pub name: String,
}

/// Body of a [`TARGET_APPEARED`] sub-message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct TargetAppeared {
    /// Server-assigned target id.
    pub target_id: u64,
    /// Target category.
    pub kind: u16,
    /// Whether the target qualifies for follow-up.
    pub eligible: bool,
}

/// Body of a [`TARGET_REMOVED`] sub-message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct TargetRemoved {
    /// Server-assigned target id.
    pub target_id: u64,
}

fn decode<M: Message>(message: &Frame) -> Result<M, HandlerError> {
    M::from_body(message.body()).map_err(|e| HandlerError::decode(message.method_id(), e))
}

/// Handles [`PLAYER_INFO`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PlayerInfoHandler;

#[async_trait]
impl Handler for PlayerInfoHandler {
    async fn handle(&self, ctx: &HandlerContext, message: &Frame) -> Result<(), HandlerError> {
        let info: PlayerInfo = decode(message)?;
        if info.name.is_empty() {
            return Err(HandlerError::rejected(message.method_id(), "empty player name"));
        }
        debug!(connection_id = %ctx.connection(), player_id = info.player_id, "player identified");
        ctx.session().set_player(PlayerIdentity {
            player_id: info.player_id,
            name: info.name.clone(),
        });
        ctx.session().set_connection(ctx.connection());
        ctx.emit(DecodedEvent::ConnectionIdentified {
            player_id: info.player_id,
            name: info.name,
        });
        Ok(())
    }
}

/// Handles [`TARGET_APPEARED`].
///
/// Only targets that are new to the session and flagged eligible produce an
/// event; repeats refresh the stored kind silently.
#[derive(Clone, Copy, Debug, Default)]
pub struct TargetAppearedHandler;

#[async_trait]
impl Handler for TargetAppearedHandler {
    async fn handle(&self, ctx: &HandlerContext, message: &Frame) -> Result<(), HandlerError> {
        let target: TargetAppeared = decode(message)?;
        let is_new = ctx.session().insert_target(KnownTarget {
            target_id: target.target_id,
            kind: target.kind,
        });
        if is_new && target.eligible {
            ctx.emit(DecodedEvent::TargetEligible {
                target_id: target.target_id,
            });
        }
        Ok(())
    }
}

/// Handles [`TARGET_REMOVED`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TargetRemovedHandler;

#[async_trait]
impl Handler for TargetRemovedHandler {
    async fn handle(&self, ctx: &HandlerContext, message: &Frame) -> Result<(), HandlerError> {
        let removed: TargetRemoved = decode(message)?;
        if ctx.session().remove_target(removed.target_id) {
            ctx.emit(DecodedEvent::TargetCleared {
                target_id: removed.target_id,
            });
        }
        Ok(())
    }
}

/// Add the built-in handlers to `table`.
///
/// # Errors
///
/// Returns [`ConfigError::DuplicateRoute`] if `table` already routes one of
/// the built-in method ids.
pub fn install(table: HandlerTable) -> Result<HandlerTable, ConfigError> {
    table
        .route(PLAYER_INFO, PlayerInfoHandler)?
        .route(TARGET_APPEARED, TargetAppearedHandler)?
        .route(TARGET_REMOVED, TargetRemovedHandler)
}

/// A table routing only the built-in handlers.
///
/// # Errors
///
/// Never fails in practice; the signature mirrors [`install`].
pub fn builtin_table() -> Result<HandlerTable, ConfigError> { install(HandlerTable::new()) }
