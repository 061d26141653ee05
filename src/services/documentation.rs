use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Rulette Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::lobby::create_game,
        crate::routes::lobby::join_game,
        crate::routes::game::get_game,
        crate::routes::game::get_topic,
        crate::routes::game::post_action,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::lobby::CreateGameRequest,
            crate::dto::lobby::CreateGameResponse,
            crate::dto::lobby::JoinRequest,
            crate::dto::lobby::JoinResponse,
            crate::dto::view::GameView,
            crate::dto::view::TopicPayload,
            crate::dto::action::ActionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobby", description = "Creating and joining games"),
        (name = "game", description = "Member-only game views and actions"),
    )
)]
/// OpenAPI document for every route.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_view_documents_the_client_config_map() {
        let doc: serde_json::Value =
            serde_json::from_str(&ApiDoc::openapi().to_json().unwrap()).unwrap();
        let config = &doc["components"]["schemas"]["GameView"]["properties"]["config"];
        assert_eq!(config["type"], "object");
        assert!(doc["paths"]["/{game_id}/action/{action}"]["post"].is_object());
    }
}
