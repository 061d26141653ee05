use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Payload used to open a new game lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Display name of the game.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

/// Freshly created game.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateGameResponse {
    /// Six hexadecimal digits identifying the game.
    pub game_id: String,
    /// Display name of the game.
    pub name: String,
    /// Where players go next to join.
    pub join_path: String,
}

/// Payload used to join an existing game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRequest {
    /// Display name, unique within the game.
    #[validate(length(min = 1, max = 32))]
    pub username: String,
}

/// Identity handed to a player after joining. The secret travels in the cookie only.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// Joined game.
    pub game_id: String,
    /// Identifier of the new player.
    pub player_id: i64,
    /// Turn order rank assigned to the player.
    pub initiative: i32,
    /// Whether the player is the host.
    pub host: bool,
}
