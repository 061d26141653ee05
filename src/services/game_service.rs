use tracing::warn;

use crate::{
    dto::view::{CardSummary, GameView, PlayerSummary, StateResponse, StatusResponse, TopicPayload},
    error::ServiceError,
    state::{
        SharedState,
        authorization::require_member,
        game::{GamePhase, GameSnapshot},
        session::SessionIdentity,
    },
};

/// Data topics polled by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Players with points and initiative.
    Players,
    /// Cards on the table.
    Table,
    /// Phase and polling information.
    Status,
    /// Whole snapshot minus secrets.
    State,
}

impl Topic {
    /// Parse a topic name from the request path.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "players" => Some(Topic::Players),
            "table" => Some(Topic::Table),
            "status" => Some(Topic::Status),
            "state" => Some(Topic::State),
            _ => None,
        }
    }
}

/// Game page for a member of `game_id`.
pub async fn game_view(
    state: &SharedState,
    game_id: &str,
    identity: &SessionIdentity,
) -> Result<GameView, ServiceError> {
    let snapshot = member_snapshot(state, game_id, identity).await?;
    Ok(GameView::from(snapshot.as_ref()))
}

/// One data topic of `game_id` for a member. Finished games expose nothing.
pub async fn topic_data(
    state: &SharedState,
    game_id: &str,
    topic: &str,
    identity: &SessionIdentity,
) -> Result<TopicPayload, ServiceError> {
    let snapshot = member_snapshot(state, game_id, identity).await?;
    if snapshot.game.phase == GamePhase::Over {
        return Err(ServiceError::GameOver);
    }

    let topic = Topic::parse(topic)
        .ok_or_else(|| ServiceError::InvalidInput(format!("unknown topic `{topic}`")))?;
    Ok(render_topic(&snapshot, topic))
}

fn render_topic(snapshot: &GameSnapshot, topic: Topic) -> TopicPayload {
    match topic {
        Topic::Players => {
            TopicPayload::Players(snapshot.players.iter().map(PlayerSummary::from).collect())
        }
        Topic::Table => TopicPayload::Table(snapshot.cards.iter().map(CardSummary::from).collect()),
        Topic::Status => TopicPayload::Status(StatusResponse::from(snapshot)),
        Topic::State => TopicPayload::State(StateResponse::from(snapshot)),
    }
}

async fn member_snapshot(
    state: &SharedState,
    game_id: &str,
    identity: &SessionIdentity,
) -> Result<std::sync::Arc<GameSnapshot>, ServiceError> {
    let snapshot = state.snapshot(game_id).await?;
    if let Err(err) = require_member(&snapshot, &identity.secret) {
        warn!(game_id, player_id = %identity.player_id, "prohibiting access by a non-member");
        return Err(err);
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{game_store::GameStore, models::GameUpdate},
        state::{
            AppState,
            cache::tests::{FaultyStore, seed_game, seed_player},
        },
    };

    fn member(secret: &str) -> SessionIdentity {
        SessionIdentity {
            player_id: "1".into(),
            secret: secret.into(),
        }
    }

    async fn state_with_game(phase: GamePhase) -> (SharedState, Arc<FaultyStore>) {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(FaultyStore::default());
        seed_game(store.as_ref(), "abc123", phase).await;
        seed_player(store.as_ref(), "abc123", "Bobson Dugnut", 0, "host-secret").await;
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    #[test]
    fn topics_parse_by_name() {
        assert_eq!(Topic::parse("players"), Some(Topic::Players));
        assert_eq!(Topic::parse("table"), Some(Topic::Table));
        assert_eq!(Topic::parse("Status"), None);
    }

    #[tokio::test]
    async fn game_view_hides_nothing_but_secrets() {
        let (state, _) = state_with_game(GamePhase::Inviting).await;
        let view = game_view(&state, "abc123", &member("host-secret"))
            .await
            .unwrap();
        assert_eq!(view.status, "inviting");
        assert_eq!(view.players.len(), 1);
        assert!(view.players[0].host);
        assert_eq!(view.config.get("poll_interval").map(String::as_str), Some("500ms"));

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("host-secret"));
    }

    #[tokio::test]
    async fn topics_require_membership() {
        let (state, _) = state_with_game(GamePhase::Inviting).await;
        let err = topic_data(&state, "abc123", "players", &member("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn status_topic_reports_collapsed_phase() {
        let (state, _) = state_with_game(GamePhase::InProgressB).await;
        let payload = topic_data(&state, "abc123", "status", &member("host-secret"))
            .await
            .unwrap();
        match payload {
            TopicPayload::Status(status) => {
                assert_eq!(status.status, "in_progress");
                assert_eq!(status.poll_interval.as_deref(), Some("500ms"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_topics_and_finished_games_are_rejected() {
        let (state, store) = state_with_game(GamePhase::Inviting).await;
        let err = topic_data(&state, "abc123", "weather", &member("host-secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        store
            .update_game(
                "abc123".into(),
                GameUpdate {
                    phase: GamePhase::Over,
                    initiative_current: None,
                },
            )
            .await
            .unwrap();
        state.cache().invalidate("abc123");
        let err = topic_data(&state, "abc123", "players", &member("host-secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GameOver));
    }
}
