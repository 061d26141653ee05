/// Gated game actions.
pub mod action_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Member-only read views.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Game creation and joining.
pub mod lobby_service;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
