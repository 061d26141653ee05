//! Rulette game backend: lobby, polling views and gated game actions over HTTP.

pub mod config;
pub mod dao;
/// Request and response bodies.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Operations behind the routes.
pub mod services;
/// Shared state, cache, sessions and the phase gate.
pub mod state;
