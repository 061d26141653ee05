use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::{
    dao::models::{CardEntity, CardKindEntity, GameEntity, GamePlayerEntity},
    state::game::GamePhase,
};

pub const GAME_COLLECTION: &str = "games";
pub const PLAYER_COLLECTION: &str = "players";
pub const MEMBERSHIP_COLLECTION: &str = "game_players";
pub const CARD_COLLECTION: &str = "cards";
pub const COUNTER_COLLECTION: &str = "counters";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub owner_id: Option<i64>,
    pub phase: GamePhase,
    pub initiative_current: Option<i32>,
    pub created_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            phase: value.phase,
            initiative_current: value.initiative_current,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            phase: value.phase,
            initiative_current: value.initiative_current,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMembershipDocument {
    pub game_id: String,
    pub player_id: i64,
    pub points: i32,
    pub initiative: i32,
    pub session_key: String,
}

impl From<GamePlayerEntity> for MongoMembershipDocument {
    fn from(value: GamePlayerEntity) -> Self {
        Self {
            game_id: value.game_id,
            player_id: value.player_id,
            points: value.points,
            initiative: value.initiative,
            session_key: value.session_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCardDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub player_id: Option<i64>,
    pub kind: CardKindEntity,
    pub front: String,
    pub back: Option<String>,
    #[serde(default)]
    pub flipped: bool,
}

impl From<CardEntity> for MongoCardDocument {
    fn from(value: CardEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id,
            player_id: value.player_id,
            kind: value.kind,
            front: value.front,
            back: value.back,
            flipped: value.flipped,
        }
    }
}

impl TryFrom<MongoCardDocument> for CardEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoCardDocument) -> MongoResult<Self> {
        let id = Uuid::parse_str(&value.id).map_err(|err| MongoDaoError::Corrupt {
            collection: CARD_COLLECTION,
            message: format!("card id `{}`: {err}", value.id),
        })?;
        Ok(Self {
            id,
            game_id: value.game_id,
            player_id: value.player_id,
            kind: value.kind,
            front: value.front,
            back: value.back,
            flipped: value.flipped,
        })
    }
}

/// Monotonic sequence used to hand out player identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCounterDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: i64,
}
