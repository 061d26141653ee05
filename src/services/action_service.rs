use std::collections::HashMap;

use tracing::{info, warn};

use crate::{
    dao::models::GameUpdate,
    dto::action::{ActionResponse, PointsUpdate},
    error::ServiceError,
    state::{
        SharedState,
        authorization::{require_host, require_member},
        game::GameSnapshot,
        session::SessionIdentity,
        state_machine::{self, Effect, GameAction, Privilege},
    },
};

/// Run `action` on `game_id` for the caller, holding the game's action lock throughout.
pub async fn perform_action(
    state: &SharedState,
    game_id: &str,
    action: &str,
    params: &HashMap<String, String>,
    identity: &SessionIdentity,
) -> Result<ActionResponse, ServiceError> {
    let (_guard, snapshot) = state.lock_game(game_id).await?;
    dispatch_action(
        state,
        &snapshot,
        GameAction::parse(action),
        params,
        &identity.secret,
    )
    .await
}

/// Gate and execute an action against an already-loaded snapshot.
///
/// Checks run in order: membership, phase, privilege, parameters. The cache
/// entry is invalidated only once the store write has completed.
pub async fn dispatch_action(
    state: &SharedState,
    snapshot: &GameSnapshot,
    action: GameAction,
    params: &HashMap<String, String>,
    secret: &str,
) -> Result<ActionResponse, ServiceError> {
    let game_id = snapshot.game.id.as_str();
    let caller = require_member(snapshot, secret).inspect_err(|_| {
        warn!(game_id, %action, "rejecting action from a non-member");
    })?;

    let plan = state_machine::plan(snapshot.game.phase, action, state.config().lifecycle_policy)?;
    if plan.privilege == Privilege::Host {
        require_host(snapshot, secret).inspect_err(|_| {
            warn!(
                game_id,
                player_id = caller.id,
                action = %plan.action,
                "host-only action refused"
            );
        })?;
    }

    let store = state.require_game_store().await?;
    let response = match plan.effect {
        Effect::Transition { to, initiative } => {
            let update = GameUpdate {
                phase: to,
                initiative_current: initiative,
            };
            state
                .bounded_write(game_id, store.update_game(game_id.to_owned(), update))
                .await?;
            info!(
                game_id,
                player_id = caller.id,
                action = %plan.action,
                from = plan.from.status_name(),
                to = to.status_name(),
                "game phase changed"
            );
            ActionResponse {
                action: plan.action.to_string(),
                status: to.status_name().to_owned(),
                initiative_current: initiative,
                points: None,
            }
        }
        Effect::AdjustPoints => {
            let (target, delta) = points_params(snapshot, params)?;
            let points = state
                .bounded_write(
                    game_id,
                    store.adjust_player_points(game_id.to_owned(), target, delta),
                )
                .await?;
            info!(
                game_id,
                player_id = caller.id,
                target,
                delta,
                points,
                "points adjusted"
            );
            ActionResponse {
                action: plan.action.to_string(),
                status: snapshot.game.phase.status_name().to_owned(),
                initiative_current: snapshot.game.initiative_current,
                points: Some(PointsUpdate {
                    player_id: target,
                    points,
                }),
            }
        }
    };

    state.cache().invalidate(game_id);
    Ok(response)
}

fn points_params(
    snapshot: &GameSnapshot,
    params: &HashMap<String, String>,
) -> Result<(i64, i32), ServiceError> {
    let player_id: i64 = required_param(params, "player_id")?;
    let delta: i32 = required_param(params, "delta")?;

    let Some(target) = snapshot.player(player_id) else {
        return Err(ServiceError::NotFound(format!(
            "player `{player_id}` is not in game `{}`",
            snapshot.game.id
        )));
    };
    // Stores disagree on overflow, so totals must stay within i32 up front.
    if target.points.checked_add(delta).is_none() {
        return Err(ServiceError::InvalidInput(format!(
            "`delta` {delta} would overflow the points of player `{player_id}`"
        )));
    }
    Ok((player_id, delta))
}

fn required_param<T: std::str::FromStr>(
    params: &HashMap<String, String>,
    name: &str,
) -> Result<T, ServiceError> {
    let raw = params
        .get(name)
        .ok_or_else(|| ServiceError::InvalidInput(format!("missing `{name}` parameter")))?;
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::InvalidInput(format!("`{name}` must be an integer")))
}
