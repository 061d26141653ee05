use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Member-only game routes.
pub mod game;
/// Health check route.
pub mod health;
/// Create and join routes.
pub mod lobby;

/// Full HTTP surface: health, lobby and game routes plus Swagger UI at `/docs`.
pub fn router(state: SharedState) -> Router {
    let swagger = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    health::router()
        .merge(lobby::router())
        .merge(game::router())
        .merge(swagger)
        .with_state(state)
}
