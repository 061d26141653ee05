pub mod authorization;
pub mod cache;
/// Game model: phases, snapshots, players and cards.
pub mod game;
pub mod session;
/// Phase gate.
pub mod state_machine;

use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, storage::StorageResult},
    error::ServiceError,
    state::{cache::GameCache, game::GameSnapshot},
};

/// Handle to [`AppState`] shared by every request.
pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, snapshot cache and per-game locks.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    cache: GameCache,
    config: AppConfig,
    degraded: watch::Sender<bool>,
    game_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    /// Fresh state with no store installed, hence degraded.
    pub fn new(config: AppConfig) -> SharedState {
        let cache = GameCache::new(config.cache_max_age, config.client_defaults());
        Arc::new(Self {
            game_store: RwLock::new(None),
            cache,
            config,
            degraded: watch::Sender::new(true),
            game_locks: DashMap::new(),
        })
    }

    /// Currently installed store, if any.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        self.game_store.read().await.clone()
    }

    /// Current game store or [`ServiceError::Degraded`].
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Swap in `store` and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        *self.game_store.write().await = Some(store);
        self.set_degraded(false);
    }

    /// Drop the store; requests answer 503 until another one is installed.
    pub async fn clear_game_store(&self) {
        self.game_store.write().await.take();
        self.set_degraded(true);
    }

    /// Whether requests needing storage currently fail with 503.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Receiver notified whenever the degraded flag flips.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Snapshot cache shared by every request.
    pub fn cache(&self) -> &GameCache {
        &self.cache
    }

    /// Cached snapshot of `game_id`, fetched through the installed store when stale.
    pub async fn snapshot(&self, game_id: &str) -> Result<Arc<GameSnapshot>, ServiceError> {
        let store = self.require_game_store().await?;
        Ok(self.cache.get(store.as_ref(), game_id).await?)
    }

    /// Serialise mutations of one game and return its snapshot as seen under the lock.
    ///
    /// Unknown games are rejected before a lock entry is created, so the lock
    /// table only ever holds games that exist.
    pub async fn lock_game(
        &self,
        game_id: &str,
    ) -> Result<(OwnedMutexGuard<()>, Arc<GameSnapshot>), ServiceError> {
        self.snapshot(game_id).await?;
        let lock = self
            .game_locks
            .entry(game_id.to_owned())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        // Re-read: the previous holder invalidated the entry before releasing.
        let snapshot = self.snapshot(game_id).await?;
        Ok((guard, snapshot))
    }

    #[cfg(test)]
    pub(crate) fn lock_entries(&self) -> usize {
        self.game_locks.len()
    }

    /// Await a store write bounded by the configured store timeout.
    pub async fn bounded_write<T, Fut>(&self, game_id: &str, write: Fut) -> Result<T, ServiceError>
    where
        Fut: Future<Output = StorageResult<T>>,
    {
        match timeout(self.config.store_timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(
                    game_id,
                    limit = ?self.config.store_timeout,
                    "store write timed out; cache left untouched"
                );
                Err(ServiceError::Timeout)
            }
        }
    }

    /// Flip the degraded flag, notifying watchers only on change.
    pub fn set_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dao::game_store::memory::InMemoryGameStore,
        state::{cache::tests::seed_game, game::GamePhase},
    };

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.snapshot("abc123").await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_game_store(Arc::new(InMemoryGameStore::new()))
            .await;
        assert!(!state.is_degraded());
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow());
    }

    async fn state_with_games(ids: &[&str]) -> SharedState {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(InMemoryGameStore::new());
        for id in ids {
            seed_game(store.as_ref(), id, GamePhase::Inviting).await;
        }
        state.install_game_store(store).await;
        state
    }

    #[tokio::test]
    async fn game_locks_are_per_game() {
        let state = state_with_games(&["aaaaaa", "bbbbbb"]).await;
        let _held = state.lock_game("aaaaaa").await.unwrap();

        let other =
            tokio::time::timeout(Duration::from_millis(50), state.lock_game("bbbbbb")).await;
        assert!(matches!(other, Ok(Ok(_))));

        let same =
            tokio::time::timeout(Duration::from_millis(50), state.lock_game("aaaaaa")).await;
        assert!(same.is_err());
    }

    #[tokio::test]
    async fn unknown_games_never_get_a_lock_entry() {
        let state = state_with_games(&["aaaaaa"]).await;
        for n in 0..100 {
            let result = state.lock_game(&format!("nope{n}")).await;
            assert!(matches!(result, Err(ServiceError::NotFound(_))));
        }
        assert_eq!(state.lock_entries(), 0);

        drop(state.lock_game("aaaaaa").await.unwrap());
        assert_eq!(state.lock_entries(), 1);
    }

    #[tokio::test]
    async fn slow_writes_time_out() {
        let config = AppConfig {
            store_timeout: Duration::from_millis(10),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        let result = state
            .bounded_write("abc123", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
    }
}
