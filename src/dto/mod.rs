use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Action results.
pub mod action;
/// Health check body.
pub mod health;
/// Create and join bodies.
pub mod lobby;
/// Member-only game views and data topics.
pub mod view;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
