//! Process-local [`GameStore`] used when no database is configured and in tests.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{
    game_store::GameStore,
    models::{CardEntity, GameEntity, GamePlayerEntity, GamePlayerRow, GameUpdate, PlayerEntity},
    storage::{StorageError, StorageResult},
};

/// In-memory store keeping every table behind a single lock so each call is atomic.
#[derive(Clone, Default)]
pub struct InMemoryGameStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    games: HashMap<String, GameEntity>,
    players: HashMap<i64, PlayerEntity>,
    memberships: Vec<GamePlayerEntity>,
    cards: Vec<CardEntity>,
    last_player_id: i64,
}

impl InMemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn game_mut(&mut self, id: &str) -> StorageResult<&mut GameEntity> {
        self.games
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("game `{id}`")))
    }
}

impl GameStore for InMemoryGameStore {
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.games.get(&id).cloned()) })
    }

    fn list_game_players(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<GamePlayerRow>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            tables
                .memberships
                .iter()
                .filter(|membership| membership.game_id == game_id)
                .map(|membership| {
                    let player = tables.players.get(&membership.player_id).ok_or_else(|| {
                        StorageError::NotFound(format!("player `{}`", membership.player_id))
                    })?;
                    Ok(GamePlayerRow {
                        player_id: membership.player_id,
                        name: player.name.clone(),
                        points: membership.points,
                        initiative: membership.initiative,
                        session_key: membership.session_key.clone(),
                    })
                })
                .collect::<StorageResult<Vec<_>>>()
        })
    }

    fn list_game_cards(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<CardEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            Ok(tables
                .cards
                .iter()
                .filter(|card| card.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            if tables.games.contains_key(&game.id) {
                return Err(StorageError::Conflict(format!("game `{}`", game.id)));
            }
            tables.games.insert(game.id.clone(), game);
            Ok(())
        })
    }

    fn update_game(&self, id: String, update: GameUpdate) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            let game = tables.game_mut(&id)?;
            game.phase = update.phase;
            game.initiative_current = update.initiative_current;
            Ok(())
        })
    }

    fn set_game_owner(&self, id: String, owner_id: i64) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            tables.game_mut(&id)?.owner_id = Some(owner_id);
            Ok(())
        })
    }

    fn insert_cards(&self, cards: Vec<CardEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.cards.extend(cards);
            Ok(())
        })
    }

    fn create_player(&self, name: String) -> BoxFuture<'static, StorageResult<i64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            tables.last_player_id += 1;
            let id = tables.last_player_id;
            tables.players.insert(id, PlayerEntity { id, name });
            Ok(id)
        })
    }

    fn add_game_player(
        &self,
        membership: GamePlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            if !tables.games.contains_key(&membership.game_id) {
                return Err(StorageError::NotFound(format!(
                    "game `{}`",
                    membership.game_id
                )));
            }
            if tables.memberships.iter().any(|existing| {
                existing.game_id == membership.game_id && existing.player_id == membership.player_id
            }) {
                return Err(StorageError::Conflict(format!(
                    "player `{}` in game `{}`",
                    membership.player_id, membership.game_id
                )));
            }
            tables.memberships.push(membership);
            Ok(())
        })
    }

    fn adjust_player_points(
        &self,
        game_id: String,
        player_id: i64,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<i32>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            let membership = tables
                .memberships
                .iter_mut()
                .find(|membership| {
                    membership.game_id == game_id && membership.player_id == player_id
                })
                .ok_or_else(|| {
                    StorageError::NotFound(format!("player `{player_id}` in game `{game_id}`"))
                })?;
            membership.points = membership.points.saturating_add(delta);
            Ok(membership.points)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::game::GamePhase;

    fn game(id: &str) -> GameEntity {
        GameEntity {
            id: id.into(),
            name: "Test Game".into(),
            owner_id: None,
            phase: GamePhase::Created,
            initiative_current: None,
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn create_game_rejects_duplicate_code() {
        let store = InMemoryGameStore::new();
        store.create_game(game("abc123")).await.unwrap();

        let err = store.create_game(game("abc123")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn players_are_joined_with_their_membership() {
        let store = InMemoryGameStore::new();
        store.create_game(game("abc123")).await.unwrap();
        let id = store.create_player("Bobson Dugnut".into()).await.unwrap();
        store
            .add_game_player(GamePlayerEntity {
                game_id: "abc123".into(),
                player_id: id,
                points: 0,
                initiative: 0,
                session_key: "secret".into(),
            })
            .await
            .unwrap();

        let rows = store.list_game_players("abc123".into()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Bobson Dugnut");
        assert_eq!(rows[0].session_key, "secret");
        assert!(store.list_game_players("other".into()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn adjust_points_applies_signed_delta() {
        let store = InMemoryGameStore::new();
        store.create_game(game("abc123")).await.unwrap();
        let id = store.create_player("Mike Truk".into()).await.unwrap();
        store
            .add_game_player(GamePlayerEntity {
                game_id: "abc123".into(),
                player_id: id,
                points: 3,
                initiative: 1,
                session_key: "secret".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.adjust_player_points("abc123".into(), id, -5).await.unwrap(), -2);
        let err = store
            .adjust_player_points("abc123".into(), id + 1, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_game_on_unknown_id_fails() {
        let store = InMemoryGameStore::new();
        let err = store
            .update_game(
                "nope".into(),
                GameUpdate {
                    phase: GamePhase::Over,
                    initiative_current: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
