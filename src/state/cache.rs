//! Short-lived read-through cache of game snapshots.
//!
//! Clients poll the status, table and players topics continuously; the cache
//! absorbs those bursts while keeping phase changes visible within `max_age`.
//! Entries live in a sharded map so lookups for different games never contend.

use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use dashmap::{DashMap, mapref::entry::Entry};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::game::{GameSnapshot, Player},
};

/// Failures while producing a snapshot.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The game could not be read, whether absent or unreadable.
    #[error("no game found with id `{0}`")]
    NoSuchGame(String),
    /// The game exists but its players could not be read.
    #[error("fetching players of game `{game_id}` failed")]
    PlayerFetchFailed {
        /// Game being read.
        game_id: String,
        /// Store error.
        #[source]
        source: StorageError,
    },
    /// The game exists but its cards could not be read.
    #[error("fetching cards of game `{game_id}` failed")]
    CardFetchFailed {
        /// Game being read.
        game_id: String,
        /// Store error.
        #[source]
        source: StorageError,
    },
}

#[derive(Default)]
struct CacheSlot {
    /// Bumped by every invalidation; fetches started under an older value are discarded.
    generation: u64,
    snapshot: Option<Arc<GameSnapshot>>,
}

/// Per-game snapshot cache owned by the application state.
pub struct GameCache {
    entries: DashMap<String, CacheSlot>,
    max_age: Duration,
    defaults: IndexMap<String, String>,
}

impl GameCache {
    /// Create a cache whose entries expire after `max_age` and whose snapshots
    /// carry the given client config values.
    pub fn new(max_age: Duration, defaults: IndexMap<String, String>) -> Self {
        Self {
            entries: DashMap::new(),
            max_age,
            defaults,
        }
    }

    /// Return the snapshot of `game_id`, refetching from `store` when missing or stale.
    pub async fn get(
        &self,
        store: &dyn GameStore,
        game_id: &str,
    ) -> Result<Arc<GameSnapshot>, CacheError> {
        let generation = match self.entries.get(game_id) {
            Some(slot) => {
                if let Some(snapshot) = &slot.snapshot {
                    let cache_age = snapshot.fetched_at.elapsed();
                    if cache_age < self.max_age {
                        debug!(game_id, ?cache_age, "cache hit");
                        return Ok(snapshot.clone());
                    }
                    debug!(game_id, ?cache_age, "cache stale");
                }
                slot.generation
            }
            None => {
                debug!(game_id, "cache miss");
                0
            }
        };

        let snapshot = Arc::new(self.fetch(store, game_id).await?);
        self.store_if_current(game_id, generation, snapshot.clone());
        Ok(snapshot)
    }

    /// Drop the entry for `game_id`. Fetches already in flight will not repopulate it.
    pub fn invalidate(&self, game_id: &str) {
        let mut slot = self.entries.entry(game_id.to_owned()).or_default();
        slot.generation += 1;
        slot.snapshot = None;
        debug!(game_id, generation = slot.generation, "cache invalidated");
    }

    /// Number of games with a snapshot currently cached, stale or not.
    pub fn cached_games(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| slot.snapshot.is_some())
            .count()
    }

    fn store_if_current(&self, game_id: &str, generation: u64, snapshot: Arc<GameSnapshot>) {
        match self.entries.entry(game_id.to_owned()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                if slot.generation != generation {
                    debug!(game_id, "discarding fetch overtaken by invalidation");
                    return;
                }
                let newer = slot
                    .snapshot
                    .as_ref()
                    .is_none_or(|existing| existing.fetched_at <= snapshot.fetched_at);
                if newer {
                    slot.snapshot = Some(snapshot);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(CacheSlot {
                    generation,
                    snapshot: Some(snapshot),
                });
            }
        }
        debug!(game_id, "cache updated");
    }

    async fn fetch(
        &self,
        store: &dyn GameStore,
        game_id: &str,
    ) -> Result<GameSnapshot, CacheError> {
        let (game, players, cards) = tokio::join!(
            store.find_game(game_id.to_owned()),
            store.list_game_players(game_id.to_owned()),
            store.list_game_cards(game_id.to_owned()),
        );

        let game = match game {
            Ok(Some(game)) => game,
            Ok(None) => return Err(CacheError::NoSuchGame(game_id.to_owned())),
            Err(err) => {
                warn!(game_id, error = %err, "reading game failed; reporting it as missing");
                return Err(CacheError::NoSuchGame(game_id.to_owned()));
            }
        };
        let players = players.map_err(|source| CacheError::PlayerFetchFailed {
            game_id: game_id.to_owned(),
            source,
        })?;
        let cards = cards.map_err(|source| CacheError::CardFetchFailed {
            game_id: game_id.to_owned(),
            source,
        })?;

        debug!(
            game_id,
            game_name = %game.name,
            phase = game.phase.status_name(),
            player_count = players.len(),
            card_count = cards.len(),
            "fetched game state"
        );

        Ok(GameSnapshot {
            updated_at: SystemTime::now(),
            fetched_at: Instant::now(),
            game: game.into(),
            players: players.into_iter().map(Player::from).collect(),
            cards: cards.into_iter().map(Into::into).collect(),
            config: self.defaults.clone(),
        })
    }
}
