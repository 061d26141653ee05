use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        authorization::HOST_INITIATIVE,
        game::{Card, CardFace, CardHolder, CardKind, GameSnapshot, Player},
    },
};

/// Public view of a player. Session secrets never leave the server.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct PlayerSummary {
    /// Player identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Current score.
    pub points: i32,
    /// Turn rank; 0 is the host.
    pub initiative: i32,
    /// Whether this player hosts the game.
    pub host: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            points: player.points,
            initiative: player.initiative,
            host: player.initiative == HOST_INITIATIVE,
        }
    }
}

/// Card kind as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CardKindDto {
    /// Acts on other cards.
    Modifier,
    /// One-off task.
    Prompt,
    /// Two-sided standing rule.
    Rule,
}

/// Card as laid out on the table.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct CardSummary {
    /// Card identifier.
    pub id: Uuid,
    /// Card variant.
    pub kind: CardKindDto,
    /// Text of the face currently showing.
    pub text: String,
    /// `front` or `back`.
    #[schema(value_type = String)]
    pub face: CardFace,
    /// Holding player, absent while the card sits on the wheel.
    pub holder: Option<i64>,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        let kind = match card.kind {
            CardKind::Modifier { .. } => CardKindDto::Modifier,
            CardKind::Prompt { .. } => CardKindDto::Prompt,
            CardKind::Rule { .. } => CardKindDto::Rule,
        };
        Self {
            id: card.id,
            kind,
            text: card.text().to_owned(),
            face: card.face,
            holder: match card.holder {
                CardHolder::Wheel => None,
                CardHolder::Player(id) => Some(id),
            },
        }
    }
}

/// Phase information polled by clients.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct StatusResponse {
    /// Phase name, in-progress sub-phases collapsed.
    pub status: String,
    /// Initiative rank whose turn it is.
    pub initiative_current: Option<i32>,
    /// Suggested polling interval, such as `500ms`.
    pub poll_interval: Option<String>,
    /// RFC 3339 time the snapshot was read.
    pub updated_at: String,
}

impl From<&GameSnapshot> for StatusResponse {
    fn from(snapshot: &GameSnapshot) -> Self {
        Self {
            status: snapshot.game.phase.status_name().to_owned(),
            initiative_current: snapshot.game.initiative_current,
            poll_interval: snapshot.config.get("poll_interval").cloned(),
            updated_at: format_system_time(snapshot.updated_at),
        }
    }
}

/// Game page payload: metadata, players and client settings.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct GameView {
    /// Six hexadecimal digit game code.
    pub game_id: String,
    /// Game name.
    pub name: String,
    /// Phase name, in-progress sub-phases collapsed.
    pub status: String,
    /// Player who opened the lobby.
    pub owner_id: Option<i64>,
    /// Initiative rank whose turn it is.
    pub initiative_current: Option<i32>,
    /// Members in initiative order.
    pub players: Vec<PlayerSummary>,
    /// Client settings such as `poll_interval`.
    pub config: IndexMap<String, String>,
    /// RFC 3339 time the snapshot was read.
    pub updated_at: String,
}

impl From<&GameSnapshot> for GameView {
    fn from(snapshot: &GameSnapshot) -> Self {
        Self {
            game_id: snapshot.game.id.clone(),
            name: snapshot.game.name.clone(),
            status: snapshot.game.phase.status_name().to_owned(),
            owner_id: snapshot.game.owner_id,
            initiative_current: snapshot.game.initiative_current,
            players: snapshot.players.iter().map(PlayerSummary::from).collect(),
            config: snapshot.config.clone(),
            updated_at: format_system_time(snapshot.updated_at),
        }
    }
}

/// Whole snapshot minus secrets.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct StateResponse {
    /// Game metadata and players.
    #[serde(flatten)]
    pub game: GameView,
    /// Every card of the game.
    pub cards: Vec<CardSummary>,
}

impl From<&GameSnapshot> for StateResponse {
    fn from(snapshot: &GameSnapshot) -> Self {
        Self {
            game: snapshot.into(),
            cards: snapshot.cards.iter().map(CardSummary::from).collect(),
        }
    }
}

/// Payload of one data topic.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(untagged)]
pub enum TopicPayload {
    /// `players` topic.
    Players(Vec<PlayerSummary>),
    /// `table` topic.
    Table(Vec<CardSummary>),
    /// `status` topic.
    Status(StatusResponse),
    /// `state` topic.
    State(StateResponse),
}
