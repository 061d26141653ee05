use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::IntoResponse,
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::lobby::{CreateGameRequest, CreateGameResponse, JoinRequest, JoinResponse},
    error::AppError,
    services::lobby_service,
    state::{SharedState, session::resolve_session},
};

/// Lobby endpoints: opening games and joining them.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/create", post(create_game))
        .route("/{game_id}/join", post(join_game))
}

/// Open a new game lobby.
#[utoipa::path(
    post,
    path = "/create",
    tag = "lobby",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = CreateGameResponse),
        (status = 400, description = "Invalid game name"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<CreateGameResponse>, AppError> {
    Ok(Json(lobby_service::create_game(&state, payload.name).await?))
}

/// Join a game and receive the session cookie scoped to it.
#[utoipa::path(
    post,
    path = "/{game_id}/join",
    tag = "lobby",
    params(("game_id" = String, Path, description = "Six hexadecimal digit game code")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Joined; the cookie carries the session", body = JoinResponse),
        (status = 404, description = "Unknown game"),
        (status = 409, description = "Already a member, name taken or game in progress"),
        (status = 410, description = "Game over")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<JoinRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let caller = resolve_session(&headers).ok();
    let outcome = lobby_service::join_game(&state, &game_id, payload.username, caller).await?;
    Ok(([(SET_COOKIE, outcome.cookie)], Json(outcome.response)))
}
