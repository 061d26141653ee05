use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::{action::ActionResponse, view::{GameView, TopicPayload}},
    error::AppError,
    services::{action_service, game_service},
    state::{SharedState, session::SessionIdentity},
};

/// Member-only game endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/{game_id}", get(get_game))
        .route("/{game_id}/data/{topic}", get(get_topic))
        .route("/{game_id}/action/{action}", post(post_action))
}

/// Return the game page data for a member.
#[utoipa::path(
    get,
    path = "/{game_id}",
    tag = "game",
    params(("game_id" = String, Path, description = "Game code")),
    responses(
        (status = 200, description = "Game view", body = GameView),
        (status = 401, description = "Session cookie missing"),
        (status = 403, description = "Invalid cookie or not a member"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    identity: SessionIdentity,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::game_view(&state, &game_id, &identity).await?))
}

/// Return one data topic (`players`, `table`, `status` or `state`).
#[utoipa::path(
    get,
    path = "/{game_id}/data/{topic}",
    tag = "game",
    params(
        ("game_id" = String, Path, description = "Game code"),
        ("topic" = String, Path, description = "players, table, status or state")
    ),
    responses(
        (status = 200, description = "Topic payload", body = TopicPayload),
        (status = 400, description = "Unknown topic"),
        (status = 403, description = "Not a member"),
        (status = 410, description = "Game over")
    )
)]
pub async fn get_topic(
    State(state): State<SharedState>,
    Path((game_id, topic)): Path<(String, String)>,
    identity: SessionIdentity,
) -> Result<Json<TopicPayload>, AppError> {
    Ok(Json(
        game_service::topic_data(&state, &game_id, &topic, &identity).await?,
    ))
}

/// Run a game action. Parameters travel in the query string.
#[utoipa::path(
    post,
    path = "/{game_id}/action/{action}",
    tag = "game",
    params(
        ("game_id" = String, Path, description = "Game code"),
        ("action" = String, Path, description = "start, points, end or a card mechanic"),
        ("player_id" = Option<i64>, Query, description = "Target of `points`"),
        ("delta" = Option<i32>, Query, description = "Signed adjustment for `points`")
    ),
    responses(
        (status = 200, description = "Action applied", body = ActionResponse),
        (status = 400, description = "Unsupported action or bad parameters"),
        (status = 403, description = "Not a member or not the host"),
        (status = 410, description = "Game over"),
        (status = 425, description = "Game not started"),
        (status = 501, description = "Mechanic not implemented")
    )
)]
pub async fn post_action(
    State(state): State<SharedState>,
    Path((game_id, action)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    identity: SessionIdentity,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        action_service::perform_action(&state, &game_id, &action, &params, &identity).await?,
    ))
}
