//! Membership and host checks over an already-fetched snapshot.

use crate::{
    error::ServiceError,
    state::game::{GameSnapshot, Player},
};

/// Initiative rank held by the host.
pub const HOST_INITIATIVE: i32 = 0;

/// True when some player of the snapshot holds `secret`. Empty secrets never match.
pub fn is_member(snapshot: &GameSnapshot, secret: &str) -> bool {
    snapshot.player_by_secret(secret).is_some()
}

/// True when the player holding `secret` is the host. False for non-members.
pub fn is_host(snapshot: &GameSnapshot, secret: &str) -> bool {
    snapshot
        .player_by_secret(secret)
        .is_some_and(|player| player.initiative == HOST_INITIATIVE)
}

/// Return the calling player or reject with a forbidden error.
pub fn require_member<'a>(
    snapshot: &'a GameSnapshot,
    secret: &str,
) -> Result<&'a Player, ServiceError> {
    snapshot
        .player_by_secret(secret)
        .ok_or_else(|| ServiceError::Forbidden("player not in game".into()))
}

/// Reject unless the caller is the host. Callers check membership first.
pub fn require_host(snapshot: &GameSnapshot, secret: &str) -> Result<(), ServiceError> {
    if is_host(snapshot, secret) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("only the host may do this".into()))
    }
}
