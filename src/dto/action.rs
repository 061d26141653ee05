use serde::Serialize;
use utoipa::ToSchema;

/// New total of a player whose points were adjusted.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PointsUpdate {
    /// Adjusted player.
    pub player_id: i64,
    /// Points after the adjustment.
    pub points: i32,
}

/// Outcome of a successful action.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Action that ran.
    pub action: String,
    /// Game status after the action.
    pub status: String,
    /// Initiative pointer after the action.
    pub initiative_current: Option<i32>,
    /// Present for point adjustments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<PointsUpdate>,
}
