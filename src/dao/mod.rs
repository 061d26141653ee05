//! Persistence: the store trait with its backends, row models and errors.

/// The store trait and its backends.
pub mod game_store;
/// Rows as the stores persist them.
pub mod models;
/// Backend-neutral storage errors.
pub mod storage;
