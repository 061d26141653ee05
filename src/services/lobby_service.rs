use std::{fmt::Write, time::SystemTime};

use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::DeckCard,
    dao::{
        game_store::GameStore,
        models::{CardEntity, GameEntity, GamePlayerEntity, GameUpdate},
        storage::StorageError,
    },
    dto::lobby::{CreateGameResponse, JoinResponse},
    error::ServiceError,
    state::{
        SharedState,
        authorization::{HOST_INITIATIVE, is_member},
        game::{GamePhase, GameSnapshot},
        session::{SessionIdentity, session_cookie},
    },
};

const GAME_CODE_ATTEMPTS: usize = 5;
const SESSION_SECRET_BYTES: usize = 32;

/// Result of a successful join: the response body and the cookie to set.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Body returned to the joining player.
    pub response: JoinResponse,
    /// `Set-Cookie` value scoping the session to the game.
    pub cookie: String,
}

/// Open a new lobby named `name` and seed its cards from the configured deck.
pub async fn create_game(
    state: &SharedState,
    name: String,
) -> Result<CreateGameResponse, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "game name must not be empty".into(),
        ));
    }

    let store = state.require_game_store().await?;

    for attempt in 1..=GAME_CODE_ATTEMPTS {
        let game_id = generate_game_code();
        let game = GameEntity {
            id: game_id.clone(),
            name: name.to_owned(),
            owner_id: None,
            phase: GamePhase::Created,
            initiative_current: None,
            created_at: SystemTime::now(),
        };

        match state.bounded_write(&game_id, store.create_game(game)).await {
            Ok(()) => {}
            Err(ServiceError::Storage(StorageError::Conflict(_))) => {
                debug!(game_id, attempt, "game code already taken; retrying");
                continue;
            }
            Err(err) => return Err(err),
        }

        let cards = deck_cards(&game_id, &state.config().deck);
        let card_count = cards.len();
        state
            .bounded_write(&game_id, store.insert_cards(cards))
            .await?;

        info!(game_id, game_name = name, card_count, "game created");
        return Ok(CreateGameResponse {
            join_path: format!("/{game_id}/join"),
            game_id,
            name: name.to_owned(),
        });
    }

    warn!(attempts = GAME_CODE_ATTEMPTS, "no free game code found");
    Err(ServiceError::Internal("could not allocate a game code".into()))
}

/// Add a player named `username` to `game_id`.
///
/// `caller` is the identity already carried by the request, if any; members
/// cannot join a second time.
pub async fn join_game(
    state: &SharedState,
    game_id: &str,
    username: String,
    caller: Option<SessionIdentity>,
) -> Result<JoinOutcome, ServiceError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ServiceError::InvalidInput(
            "username must not be empty".into(),
        ));
    }

    let store = state.require_game_store().await?;
    let (_guard, snapshot) = state.lock_game(game_id).await?;

    if caller.is_some_and(|caller| is_member(&snapshot, &caller.secret)) {
        return Err(ServiceError::Conflict("player already in game".into()));
    }

    let phase = snapshot.game.phase;
    if phase == GamePhase::Over {
        return Err(ServiceError::GameOver);
    }
    if phase.is_in_progress() {
        return Err(ServiceError::Conflict("game in progress".into()));
    }
    if snapshot.players.iter().any(|player| player.name == username) {
        return Err(ServiceError::Conflict(format!(
            "username `{username}` is already taken"
        )));
    }

    let initiative = snapshot
        .max_initiative()
        .map_or(HOST_INITIATIVE, |max| max + 1);
    let secret = generate_session_secret();

    let player_id = state
        .bounded_write(game_id, store.create_player(username.to_owned()))
        .await?;

    // Membership goes last: a host row is only stored once the game is ready for it.
    let result = async {
        open_lobby(state, store.as_ref(), &snapshot, player_id, initiative).await?;
        let membership = GamePlayerEntity {
            game_id: game_id.to_owned(),
            player_id,
            points: 0,
            initiative,
            session_key: secret.clone(),
        };
        state
            .bounded_write(game_id, store.add_game_player(membership))
            .await
    }
    .await;
    // A partial join may still have moved the game to `inviting`.
    state.cache().invalidate(game_id);
    result?;
    info!(game_id, player_id, initiative, "player joined game");

    Ok(JoinOutcome {
        cookie: session_cookie(player_id, &secret, game_id),
        response: JoinResponse {
            game_id: game_id.to_owned(),
            player_id,
            initiative,
            host: initiative == HOST_INITIATIVE,
        },
    })
}

/// Move a fresh game to `inviting` and record the first joiner as its owner.
async fn open_lobby(
    state: &SharedState,
    store: &dyn GameStore,
    snapshot: &GameSnapshot,
    player_id: i64,
    initiative: i32,
) -> Result<(), ServiceError> {
    let game_id = snapshot.game.id.as_str();
    if snapshot.game.phase == GamePhase::Created {
        let update = GameUpdate {
            phase: GamePhase::Inviting,
            initiative_current: Some(HOST_INITIATIVE),
        };
        state
            .bounded_write(game_id, store.update_game(game_id.to_owned(), update))
            .await?;
    }
    // An owner left behind by a failed join is replaced by the next host.
    if initiative == HOST_INITIATIVE {
        state
            .bounded_write(game_id, store.set_game_owner(game_id.to_owned(), player_id))
            .await?;
    }
    Ok(())
}

fn generate_game_code() -> String {
    format!("{:06x}", rand::rng().random_range(0..=0xff_ffffu32))
}

fn generate_session_secret() -> String {
    let mut bytes = [0u8; SESSION_SECRET_BYTES];
    rand::rng().fill(&mut bytes);
    bytes
        .iter()
        .fold(String::with_capacity(SESSION_SECRET_BYTES * 2), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

fn deck_cards(game_id: &str, deck: &[DeckCard]) -> Vec<CardEntity> {
    deck.iter()
        .map(|card| CardEntity {
            id: Uuid::new_v4(),
            game_id: game_id.to_owned(),
            player_id: None,
            kind: card.kind,
            front: card.front.clone(),
            back: card.back.clone(),
            flipped: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, atomic::Ordering},
    };

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::InMemoryGameStore,
        services::action_service::perform_action,
        state::{
            AppState,
            cache::tests::{FaultyStore, seed_game},
            session::parse_session_value,
        },
    };

    async fn state() -> (SharedState, Arc<InMemoryGameStore>) {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(InMemoryGameStore::new());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    fn identity(outcome: &JoinOutcome) -> SessionIdentity {
        let value = outcome
            .cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value)
            .unwrap();
        parse_session_value(value).unwrap()
    }

    #[test]
    fn codes_and_secrets_have_the_expected_shape() {
        let code = generate_game_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));

        let secret = generate_session_secret();
        assert_eq!(secret.len(), 64);
        assert_ne!(secret, generate_session_secret());
    }

    #[tokio::test]
    async fn create_game_seeds_the_deck() {
        let (state, store) = state().await;
        let created = create_game(&state, "  Test Game ".into()).await.unwrap();
        assert_eq!(created.name, "Test Game");
        assert_eq!(created.join_path, format!("/{}/join", created.game_id));

        let cards = store.list_game_cards(created.game_id).await.unwrap();
        assert_eq!(cards.len(), state.config().deck.len());
        assert!(cards.iter().all(|card| card.player_id.is_none()));
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let (state, _) = state().await;
        assert!(matches!(
            create_game(&state, "   ".into()).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn first_joiner_hosts_and_opens_the_lobby() {
        let (state, store) = state().await;
        let game_id = create_game(&state, "Test Game".into()).await.unwrap().game_id;

        let host = join_game(&state, &game_id, "Bobson Dugnut".into(), None)
            .await
            .unwrap();
        assert_eq!(host.response.initiative, 0);
        assert!(host.response.host);
        assert!(host.cookie.ends_with(&format!("Path=/{game_id}")));

        let game = store.find_game(game_id.clone()).await.unwrap().unwrap();
        assert_eq!(game.phase, GamePhase::Inviting);
        assert_eq!(game.owner_id, Some(host.response.player_id));

        let guest = join_game(&state, &game_id, "Mike Truk".into(), None)
            .await
            .unwrap();
        assert_eq!(guest.response.initiative, 1);
        assert!(!guest.response.host);

        // Joins invalidate, so the new player is visible right away.
        let snapshot = state.snapshot(&game_id).await.unwrap();
        assert_eq!(snapshot.players.len(), 2);
        assert!(is_member(&snapshot, &identity(&guest).secret));
    }

    #[tokio::test]
    async fn duplicate_names_and_repeat_joins_conflict() {
        let (state, _) = state().await;
        let game_id = create_game(&state, "Test Game".into()).await.unwrap().game_id;
        let host = join_game(&state, &game_id, "Bobson Dugnut".into(), None)
            .await
            .unwrap();

        let err = join_game(&state, &game_id, "Bobson Dugnut".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = join_game(&state, &game_id, "Someone Else".into(), Some(identity(&host)))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::Conflict(message) if message == "player already in game")
        );
    }

    #[tokio::test]
    async fn started_and_finished_games_refuse_joins() {
        let (state, store) = state().await;
        let game_id = create_game(&state, "Test Game".into()).await.unwrap().game_id;

        for (phase, started) in [(GamePhase::InProgressB, true), (GamePhase::Over, false)] {
            store
                .update_game(
                    game_id.clone(),
                    GameUpdate {
                        phase,
                        initiative_current: None,
                    },
                )
                .await
                .unwrap();
            state.cache().invalidate(&game_id);

            let err = join_game(&state, &game_id, "Late Comer".into(), None)
                .await
                .unwrap_err();
            if started {
                assert!(matches!(err, ServiceError::Conflict(_)));
            } else {
                assert!(matches!(err, ServiceError::GameOver));
            }
        }
    }

    #[tokio::test]
    async fn joining_an_unknown_game_is_not_found() {
        let (state, _) = state().await;
        let err = join_game(&state, "ffffff", "Nobody".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    async fn faulty_state() -> (SharedState, Arc<FaultyStore>) {
        let state = AppState::new(AppConfig::default());
        let store = Arc::new(FaultyStore::default());
        seed_game(store.as_ref(), "abc123", GamePhase::Created).await;
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    async fn host_can_start(state: &SharedState, outcome: &JoinOutcome) {
        let started = perform_action(
            state,
            "abc123",
            "start",
            &HashMap::new(),
            &identity(outcome),
        )
        .await
        .unwrap();
        assert_eq!(started.status, "in_progress");
    }

    #[tokio::test]
    async fn failed_lobby_opening_stores_no_membership() {
        let (state, store) = faulty_state().await;

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = join_game(&state, "abc123", "Bobson Dugnut".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(store.list_game_players("abc123".into()).await.unwrap().is_empty());

        store.fail_writes.store(false, Ordering::SeqCst);
        let host = join_game(&state, "abc123", "Bobson Dugnut".into(), None)
            .await
            .unwrap();
        assert!(host.response.host);
        host_can_start(&state, &host).await;
    }

    #[tokio::test]
    async fn failed_membership_write_still_refreshes_the_game() {
        let (state, store) = faulty_state().await;

        store.fail_memberships.store(true, Ordering::SeqCst);
        join_game(&state, "abc123", "Bobson Dugnut".into(), None)
            .await
            .unwrap_err();

        // The lobby did open; the cache must not keep serving `created`.
        let snapshot = state.snapshot("abc123").await.unwrap();
        assert_eq!(snapshot.game.phase, GamePhase::Inviting);
        assert!(snapshot.players.is_empty());

        store.fail_memberships.store(false, Ordering::SeqCst);
        let host = join_game(&state, "abc123", "Bobson Dugnut".into(), None)
            .await
            .unwrap();
        assert_eq!(host.response.initiative, HOST_INITIATIVE);
        let game = store.find_game("abc123".into()).await.unwrap().unwrap();
        assert_eq!(game.owner_id, Some(host.response.player_id));
        host_can_start(&state, &host).await;
    }
}
