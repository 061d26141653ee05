use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Ping the installed store and report the service condition.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let status = match state.game_store().await {
        Some(_) if state.is_degraded() => HealthStatus::Degraded,
        Some(store) => match store.health_check().await {
            Ok(()) => HealthStatus::Ok,
            Err(err) => {
                warn!(error = %err, "storage ping failed");
                HealthStatus::Degraded
            }
        },
        None => {
            warn!("no storage installed; reporting degraded");
            HealthStatus::Degraded
        }
    };

    HealthResponse {
        status,
        cached_games: state.cache().cached_games(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::game_store::memory::InMemoryGameStore, state::AppState,
    };

    #[tokio::test]
    async fn degraded_without_a_store() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn ok_once_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(InMemoryGameStore::new()))
            .await;
        let health = health_status(&state).await;
        assert_eq!(health.status, HealthStatus::Ok);
        assert_eq!(health.cached_games, 0);
    }
}
