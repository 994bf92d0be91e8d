//! Lifecycle states and the legal transition graph.
//!
//! Everything in this module is pure data and rules. Every mutator in the
//! crate validates its edge through [`is_legal_transition`] so there is a
//! single definition of what the lifecycle permits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a service.
///
/// A service starts in `New`, passes through `Starting` and `Running`,
/// then `Stopping`, and ends in one of the two absorbing states
/// `Terminated` or `Failed`.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::State;
///
/// assert!(State::New.can_transition_to(State::Starting));
/// assert!(!State::Running.can_transition_to(State::Starting));
/// assert!(State::Failed.is_terminal());
/// assert_eq!(State::Running.to_string(), "RUNNING");
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    New,
    Starting,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl State {
    /// Stable, human-readable label.
    pub const fn name(self) -> &'static str {
        match self {
            State::New => "NEW",
            State::Starting => "STARTING",
            State::Running => "RUNNING",
            State::Stopping => "STOPPING",
            State::Terminated => "TERMINATED",
            State::Failed => "FAILED",
        }
    }

    /// True for the absorbing states; no transition leaves them.
    pub const fn is_terminal(self) -> bool {
        matches!(self, State::Terminated | State::Failed)
    }

    /// True while a hook is expected to be in flight.
    pub const fn is_transitioning(self) -> bool {
        matches!(self, State::Starting | State::Stopping)
    }

    /// Whether the edge `self -> to` is in the transition table.
    pub const fn can_transition_to(self, to: State) -> bool {
        is_legal_transition(self, to)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical list of all lifecycle states, in lifecycle order.
pub const ALL_STATES: [State; 6] = [
    State::New,
    State::Starting,
    State::Running,
    State::Stopping,
    State::Terminated,
    State::Failed,
];

/// The transition table.
///
/// `New -> Terminated` exists only for stopping a service that was never
/// started; it bypasses both hooks.
pub const fn is_legal_transition(from: State, to: State) -> bool {
    use State::*;

    matches!(
        (from, to),
        (New, Starting)
            | (New, Terminated)
            | (Starting, Running)
            | (Starting, Failed)
            | (Running, Stopping)
            | (Stopping, Terminated)
            | (Stopping, Failed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_contains_exactly_the_lifecycle_edges() {
        let expected = [
            (State::New, State::Starting),
            (State::New, State::Terminated),
            (State::Starting, State::Running),
            (State::Starting, State::Failed),
            (State::Running, State::Stopping),
            (State::Stopping, State::Terminated),
            (State::Stopping, State::Failed),
        ];

        let mut legal = Vec::new();
        for from in ALL_STATES {
            for to in ALL_STATES {
                if is_legal_transition(from, to) {
                    legal.push((from, to));
                }
            }
        }

        assert_eq!(legal.len(), expected.len());
        for edge in expected {
            assert!(legal.contains(&edge), "missing edge {edge:?}");
        }
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for from in ALL_STATES.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL_STATES {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
            }
        }
    }

    #[test]
    fn no_edge_moves_backward() {
        let position = |s: State| ALL_STATES.iter().position(|x| *x == s).unwrap();
        for from in ALL_STATES {
            for to in ALL_STATES {
                if from.can_transition_to(to) {
                    assert!(position(to) > position(from));
                }
            }
        }
    }

    #[test]
    fn self_transitions_are_illegal() {
        for state in ALL_STATES {
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn transitioning_states() {
        assert!(State::Starting.is_transitioning());
        assert!(State::Stopping.is_transitioning());
        assert!(!State::Running.is_transitioning());
        assert!(!State::New.is_transitioning());
    }

    #[test]
    fn display_uses_upper_case_names() {
        assert_eq!(State::New.to_string(), "NEW");
        assert_eq!(State::Terminated.to_string(), "TERMINATED");
    }

    #[test]
    fn state_serializes_as_name() {
        let json = serde_json::to_string(&State::Stopping).unwrap();
        assert_eq!(json, "\"STOPPING\"");
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, State::Stopping);
    }
}
