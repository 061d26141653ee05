use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::game::GamePhase;

/// Reserved card-economy mechanics. Recognised but not playable yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanic {
    /// Spin the wheel to draw a card.
    Spin,
    /// Flip a rule card.
    Flip,
    /// Destroy a card.
    Shred,
    /// Duplicate a card.
    Clone,
    /// Hand a card to another player.
    Transfer,
    /// Accuse a player of breaking a rule.
    Accuse,
    /// Rule on an accusation.
    Judge,
}

impl Mechanic {
    /// Wire name of the mechanic.
    pub fn name(self) -> &'static str {
        match self {
            Mechanic::Spin => "spin",
            Mechanic::Flip => "flip",
            Mechanic::Shred => "shred",
            Mechanic::Clone => "clone",
            Mechanic::Transfer => "transfer",
            Mechanic::Accuse => "accuse",
            Mechanic::Judge => "judge",
        }
    }
}

/// Action requested through the action endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
    /// Move a pre-game lobby into play.
    Start,
    /// Adjust one player's points.
    Points,
    /// Finish the game for good.
    End,
    /// One of the reserved mechanics.
    Mechanic(Mechanic),
    /// Anything the server does not know about.
    Unsupported(String),
}

impl GameAction {
    /// Parse an action name. Unknown names are kept for error reporting.
    pub fn parse(name: &str) -> Self {
        match name {
            "start" => GameAction::Start,
            "points" => GameAction::Points,
            "end" => GameAction::End,
            "spin" => GameAction::Mechanic(Mechanic::Spin),
            "flip" => GameAction::Mechanic(Mechanic::Flip),
            "shred" => GameAction::Mechanic(Mechanic::Shred),
            "clone" => GameAction::Mechanic(Mechanic::Clone),
            "transfer" => GameAction::Mechanic(Mechanic::Transfer),
            "accuse" => GameAction::Mechanic(Mechanic::Accuse),
            "decide" | "judge" => GameAction::Mechanic(Mechanic::Judge),
            other => GameAction::Unsupported(other.to_owned()),
        }
    }
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameAction::Start => f.write_str("start"),
            GameAction::Points => f.write_str("points"),
            GameAction::End => f.write_str("end"),
            GameAction::Mechanic(mechanic) => f.write_str(mechanic.name()),
            GameAction::Unsupported(name) => f.write_str(name),
        }
    }
}

/// Who may start and end a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePolicy {
    /// Only the host (initiative 0).
    #[default]
    HostOnly,
    /// Every member of the game.
    AnyMember,
}

impl LifecyclePolicy {
    fn privilege(self) -> Privilege {
        match self {
            LifecyclePolicy::HostOnly => Privilege::Host,
            LifecyclePolicy::AnyMember => Privilege::Member,
        }
    }
}

/// Minimum standing required from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Any member of the game.
    Member,
    /// The host only.
    Host,
}

/// Mutation the dispatcher performs once the plan is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Persist a new phase and initiative pointer.
    Transition {
        /// Phase after the action.
        to: GamePhase,
        /// Initiative pointer after the action.
        initiative: Option<i32>,
    },
    /// Apply a signed delta to a target player's points.
    AdjustPoints,
}

/// Validated outcome of gating an action against a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Phase the game was in.
    pub from: GamePhase,
    /// Requested action.
    pub action: GameAction,
    /// Standing the caller must have.
    pub privilege: Privilege,
    /// Mutation to perform.
    pub effect: Effect,
}

/// Rejections produced by the phase gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The game has not started yet.
    #[error("game has not started yet; `{action}` is not available")]
    TooEarly {
        /// Requested action.
        action: GameAction,
    },
    /// The game is over; nothing can change any more.
    #[error("game over")]
    GameOver,
    /// Known mechanic that is not playable yet.
    #[error("`{}` is not implemented", .0.name())]
    NotImplemented(Mechanic),
    /// Unknown action or one that is illegal in the current phase.
    #[error("action `{action}` is not supported while {}", .from.status_name())]
    Unsupported {
        /// Phase the game was in.
        from: GamePhase,
        /// Requested action.
        action: GameAction,
    },
}

/// Decide whether `action` may run in `phase` and what it would do.
///
/// Pure: the caller is responsible for checking membership before and the
/// plan's privilege and parameters after.
pub fn plan(
    phase: GamePhase,
    action: GameAction,
    policy: LifecyclePolicy,
) -> Result<Plan, GateError> {
    let (privilege, effect) = match (phase, &action) {
        (GamePhase::Over, _) => return Err(GateError::GameOver),
        (GamePhase::Created | GamePhase::Inviting, GameAction::Start) => (
            policy.privilege(),
            Effect::Transition {
                to: GamePhase::InProgressA,
                initiative: Some(0),
            },
        ),
        (GamePhase::Created | GamePhase::Inviting, _) => {
            return Err(GateError::TooEarly { action });
        }
        (_, GameAction::Points) => (Privilege::Host, Effect::AdjustPoints),
        (_, GameAction::End) => (
            policy.privilege(),
            Effect::Transition {
                to: GamePhase::Over,
                initiative: None,
            },
        ),
        (_, GameAction::Mechanic(mechanic)) => return Err(GateError::NotImplemented(*mechanic)),
        (from, GameAction::Start | GameAction::Unsupported(_)) => {
            return Err(GateError::Unsupported { from, action });
        }
    };

    Ok(Plan {
        from: phase,
        action,
        privilege,
        effect,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IN_PROGRESS: [GamePhase; 3] = [
        GamePhase::InProgressA,
        GamePhase::InProgressB,
        GamePhase::InProgressC,
    ];

    fn gate(phase: GamePhase, action: &str) -> Result<Plan, GateError> {
        plan(phase, GameAction::parse(action), LifecyclePolicy::HostOnly)
    }

    #[test]
    fn parses_known_and_unknown_actions() {
        assert_eq!(GameAction::parse("start"), GameAction::Start);
        assert_eq!(GameAction::parse("decide"), GameAction::Mechanic(Mechanic::Judge));
        assert_eq!(GameAction::parse("judge"), GameAction::Mechanic(Mechanic::Judge));
        assert_eq!(
            GameAction::parse("dance"),
            GameAction::Unsupported("dance".into())
        );
        assert_eq!(GameAction::parse("Start").to_string(), "Start");
    }

    #[test]
    fn start_moves_lobby_into_play() {
        for phase in [GamePhase::Created, GamePhase::Inviting] {
            let plan = gate(phase, "start").unwrap();
            assert_eq!(plan.privilege, Privilege::Host);
            assert_eq!(
                plan.effect,
                Effect::Transition {
                    to: GamePhase::InProgressA,
                    initiative: Some(0)
                }
            );
        }
    }

    #[test]
    fn anything_but_start_is_too_early_before_play() {
        for action in ["points", "end", "spin", "dance"] {
            let err = gate(GamePhase::Inviting, action).unwrap_err();
            assert!(matches!(err, GateError::TooEarly { .. }), "{action}: {err:?}");
        }
    }

    #[test]
    fn in_progress_sub_states_are_gated_identically() {
        for phase in IN_PROGRESS {
            assert_eq!(gate(phase, "points").unwrap().effect, Effect::AdjustPoints);
            assert_eq!(gate(phase, "points").unwrap().privilege, Privilege::Host);
            assert_eq!(
                gate(phase, "end").unwrap().effect,
                Effect::Transition {
                    to: GamePhase::Over,
                    initiative: None
                }
            );
            assert_eq!(
                gate(phase, "flip").unwrap_err(),
                GateError::NotImplemented(Mechanic::Flip)
            );
            assert!(matches!(
                gate(phase, "dance").unwrap_err(),
                GateError::Unsupported { .. }
            ));
        }
    }

    #[test]
    fn start_cannot_run_twice() {
        let err = gate(GamePhase::InProgressB, "start").unwrap_err();
        assert_eq!(
            err,
            GateError::Unsupported {
                from: GamePhase::InProgressB,
                action: GameAction::Start
            }
        );
    }

    #[test]
    fn over_is_terminal() {
        for action in ["start", "points", "end", "spin", "dance"] {
            assert_eq!(gate(GamePhase::Over, action).unwrap_err(), GateError::GameOver);
        }
    }

    #[test]
    fn lifecycle_policy_relaxes_start_and_end_but_not_points() {
        let start = plan(
            GamePhase::Created,
            GameAction::Start,
            LifecyclePolicy::AnyMember,
        )
        .unwrap();
        assert_eq!(start.privilege, Privilege::Member);

        let points = plan(
            GamePhase::InProgressA,
            GameAction::Points,
            LifecyclePolicy::AnyMember,
        )
        .unwrap();
        assert_eq!(points.privilege, Privilege::Host);
    }
}
