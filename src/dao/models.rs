use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::game::GamePhase;

/// Game row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Short hexadecimal code identifying the game.
    pub id: String,
    /// Display name chosen at creation.
    pub name: String,
    /// Player who created the lobby (first joiner), once known.
    pub owner_id: Option<i64>,
    /// Current lifecycle phase.
    pub phase: GamePhase,
    /// Initiative rank of the player whose turn it is.
    pub initiative_current: Option<i32>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Partial update applied to a game row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameUpdate {
    /// Phase the game moves to.
    pub phase: GamePhase,
    /// New initiative pointer; `None` clears it.
    pub initiative_current: Option<i32>,
}

/// Player row, shared across games.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Store-assigned numeric identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// Membership of a player in a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GamePlayerEntity {
    /// Game the player joined.
    pub game_id: String,
    /// Joined player.
    pub player_id: i64,
    /// Current point total.
    pub points: i32,
    /// Turn order rank; 0 is the host.
    pub initiative: i32,
    /// Secret bound to this membership and carried in the session cookie.
    pub session_key: String,
}

/// Joined read of a membership and its player row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GamePlayerRow {
    /// Player identifier.
    pub player_id: i64,
    /// Player display name.
    pub name: String,
    /// Current point total.
    pub points: i32,
    /// Turn order rank.
    pub initiative: i32,
    /// Session secret of the membership.
    pub session_key: String,
}

/// Persisted card kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardKindEntity {
    /// Point modifier.
    Modifier,
    /// One-shot prompt.
    Prompt,
    /// Two-faced rule.
    Rule,
}

/// Card row associated with a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardEntity {
    /// Stable card identifier.
    pub id: Uuid,
    /// Game the card belongs to.
    pub game_id: String,
    /// Holding player, `None` while the card sits on the wheel.
    pub player_id: Option<i64>,
    /// Card variant.
    pub kind: CardKindEntity,
    /// Front text (the only text for modifiers and prompts).
    pub front: String,
    /// Back text for rules.
    pub back: Option<String>,
    /// Whether the back face is showing.
    pub flipped: bool,
}
