pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{CardEntity, GameEntity, GamePlayerEntity, GamePlayerRow, GameUpdate};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for games, players and cards.
///
/// Every call is atomic and immediately consistent with earlier writes issued
/// by the same process.
pub trait GameStore: Send + Sync {
    /// Game row, `None` if no such game.
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Members of a game joined with their player rows.
    fn list_game_players(&self, game_id: String)
    -> BoxFuture<'static, StorageResult<Vec<GamePlayerRow>>>;
    /// All cards of a game.
    fn list_game_cards(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<CardEntity>>>;
    /// Insert a new game; fails with [`StorageError::Conflict`] if the code is taken.
    ///
    /// [`StorageError::Conflict`]: crate::dao::storage::StorageError::Conflict
    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Set phase and initiative pointer.
    fn update_game(&self, id: String, update: GameUpdate) -> BoxFuture<'static, StorageResult<()>>;
    /// Record the player who opened the lobby.
    fn set_game_owner(&self, id: String, owner_id: i64) -> BoxFuture<'static, StorageResult<()>>;
    /// Seed cards; each carries its game id.
    fn insert_cards(&self, cards: Vec<CardEntity>) -> BoxFuture<'static, StorageResult<()>>;
    /// Create a player row and return its identifier.
    fn create_player(&self, name: String) -> BoxFuture<'static, StorageResult<i64>>;
    /// Attach a player to a game with rank and session secret.
    fn add_game_player(
        &self,
        membership: GamePlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Add `delta` to a player's points and return the new total.
    fn adjust_player_points(
        &self,
        game_id: String,
        player_id: i64,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<i32>>;
    /// Cheap round trip to the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the connection after failed health checks.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
