use std::time::{Instant, SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{CardEntity, CardKindEntity, GameEntity, GamePlayerRow};

/// Lifecycle phase of a game, persisted as its numeric identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GamePhase {
    /// Game exists but nobody joined yet.
    Created,
    /// At least one player joined; waiting for the start.
    Inviting,
    /// First in-progress sub-state.
    InProgressA,
    /// Second in-progress sub-state.
    InProgressB,
    /// Third in-progress sub-state.
    InProgressC,
    /// Terminal phase.
    Over,
}

/// Raised when a stored phase identifier is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown game phase id {0}")]
pub struct UnknownPhase(pub u8);

impl GamePhase {
    /// Numeric identifier used by the storage layer.
    pub fn id(self) -> u8 {
        match self {
            GamePhase::Created => 0,
            GamePhase::Inviting => 1,
            GamePhase::InProgressA => 2,
            GamePhase::InProgressB => 3,
            GamePhase::InProgressC => 4,
            GamePhase::Over => 5,
        }
    }

    /// True for every in-progress sub-state.
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            GamePhase::InProgressA | GamePhase::InProgressB | GamePhase::InProgressC
        )
    }

    /// True before the game has started.
    pub fn is_pregame(self) -> bool {
        matches!(self, GamePhase::Created | GamePhase::Inviting)
    }

    /// Name exposed to clients; in-progress sub-states share one name.
    pub fn status_name(self) -> &'static str {
        match self {
            GamePhase::Created => "created",
            GamePhase::Inviting => "inviting",
            GamePhase::InProgressA | GamePhase::InProgressB | GamePhase::InProgressC => {
                "in_progress"
            }
            GamePhase::Over => "over",
        }
    }
}

impl TryFrom<u8> for GamePhase {
    type Error = UnknownPhase;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GamePhase::Created),
            1 => Ok(GamePhase::Inviting),
            2 => Ok(GamePhase::InProgressA),
            3 => Ok(GamePhase::InProgressB),
            4 => Ok(GamePhase::InProgressC),
            5 => Ok(GamePhase::Over),
            other => Err(UnknownPhase(other)),
        }
    }
}

impl From<GamePhase> for u8 {
    fn from(value: GamePhase) -> Self {
        value.id()
    }
}

/// Game metadata carried in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    /// Short game code.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Player who opened the lobby.
    pub owner_id: Option<i64>,
    /// Current phase.
    pub phase: GamePhase,
    /// Initiative rank whose turn it is.
    pub initiative_current: Option<i32>,
}

/// A player as seen by one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Player identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Current point total.
    pub points: i32,
    /// Turn order rank; 0 denotes the host.
    pub initiative: i32,
    /// Session secret bound to the membership.
    pub session_key: String,
}

/// Which face of a card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardFace {
    /// Front face.
    #[default]
    Front,
    /// Back face.
    Back,
}

/// Card variants. Only rules carry two distinct faces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardKind {
    /// Adjusts points when played.
    Modifier { text: String },
    /// Asks the holder to do something.
    Prompt { text: String },
    /// Standing rule with an alternative back face.
    Rule { front: String, back: String },
}

impl CardKind {
    /// Text visible for the given face.
    pub fn render(&self, face: CardFace) -> &str {
        match (self, face) {
            (CardKind::Modifier { text } | CardKind::Prompt { text }, _) => text,
            (CardKind::Rule { front, .. }, CardFace::Front) => front,
            (CardKind::Rule { back, .. }, CardFace::Back) => back,
        }
    }

    /// Face showing after a flip. Single-faced cards stay as they are.
    pub fn flip(&self, face: CardFace) -> CardFace {
        match (self, face) {
            (CardKind::Rule { .. }, CardFace::Front) => CardFace::Back,
            (CardKind::Rule { .. }, CardFace::Back) => CardFace::Front,
            (_, face) => face,
        }
    }
}

/// Where a card currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardHolder {
    /// Still on the wheel.
    Wheel,
    /// Held by the given player.
    Player(i64),
}

/// A card associated with a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Card identifier.
    pub id: Uuid,
    /// Current holder.
    pub holder: CardHolder,
    /// Variant and texts.
    pub kind: CardKind,
    /// Face currently showing.
    pub face: CardFace,
}

impl Card {
    /// Text currently visible on the card.
    pub fn text(&self) -> &str {
        self.kind.render(self.face)
    }
}

/// Timestamped read of a game's full state. Replaced wholesale, never mutated.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    /// Wall-clock time of the fetch.
    pub updated_at: SystemTime,
    /// Monotonic time of the fetch, used for staleness.
    pub fetched_at: Instant,
    /// Game metadata.
    pub game: GameInfo,
    /// Authoritative membership list.
    pub players: Vec<Player>,
    /// Cards associated with the game.
    pub cards: Vec<Card>,
    /// Client-facing settings (e.g. polling interval).
    pub config: IndexMap<String, String>,
}

impl GameSnapshot {
    /// Find the player holding the given session secret.
    pub fn player_by_secret(&self, secret: &str) -> Option<&Player> {
        if secret.is_empty() {
            return None;
        }
        self.players
            .iter()
            .find(|player| player.session_key == secret)
    }

    /// Find a player by identifier.
    pub fn player(&self, id: i64) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Highest initiative rank in use, if any player joined.
    pub fn max_initiative(&self) -> Option<i32> {
        self.players.iter().map(|player| player.initiative).max()
    }
}

impl From<GameEntity> for GameInfo {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            phase: value.phase,
            initiative_current: value.initiative_current,
        }
    }
}

impl From<GamePlayerRow> for Player {
    fn from(value: GamePlayerRow) -> Self {
        Self {
            id: value.player_id,
            name: value.name,
            points: value.points,
            initiative: value.initiative,
            session_key: value.session_key,
        }
    }
}

impl From<CardEntity> for Card {
    fn from(value: CardEntity) -> Self {
        let kind = match value.kind {
            CardKindEntity::Modifier => CardKind::Modifier { text: value.front },
            CardKindEntity::Prompt => CardKind::Prompt { text: value.front },
            CardKindEntity::Rule => CardKind::Rule {
                back: value.back.unwrap_or_else(|| value.front.clone()),
                front: value.front,
            },
        };
        Self {
            id: value.id,
            holder: value.player_id.map_or(CardHolder::Wheel, CardHolder::Player),
            kind,
            face: if value.flipped {
                CardFace::Back
            } else {
                CardFace::Front
            },
        }
    }
}
