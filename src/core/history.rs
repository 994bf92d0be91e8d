//! Transition history tracking.
//!
//! Every transition a service performs is appended to its history, in the
//! order the transition guard applied it. The history is what late
//! listeners are replayed from.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single applied transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The state being transitioned from
    pub from: State,
    /// The state being transitioned to
    pub to: State,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
    /// Value of the transition counter after this transition (starts at 1)
    pub sequence: u64,
}

/// Ordered, append-only history of transitions.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::{State, TransitionHistory};
///
/// let mut history = TransitionHistory::new();
/// history.record(State::New, State::Starting, 1);
/// history.record(State::Starting, State::Running, 2);
///
/// assert_eq!(history.path(), vec![State::New, State::Starting, State::Running]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: Vec<Transition>,
}

impl TransitionHistory {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Append a transition and return the stored record.
    pub fn record(&mut self, from: State, to: State, sequence: u64) -> &Transition {
        self.transitions.push(Transition {
            from,
            to,
            timestamp: Utc::now(),
            sequence,
        });
        &self.transitions[self.transitions.len() - 1]
    }

    /// States traversed, starting with the first `from` state.
    pub fn path(&self) -> Vec<State> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Time between the first and the last transition.
    ///
    /// `None` when nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.first()?, self.transitions.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// All transitions, oldest first.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_is_empty() {
        let history = TransitionHistory::new();
        assert!(history.is_empty());
        assert!(history.path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn record_returns_stored_transition() {
        let mut history = TransitionHistory::new();
        let stored = history.record(State::New, State::Starting, 1).clone();

        assert_eq!(stored.from, State::New);
        assert_eq!(stored.to, State::Starting);
        assert_eq!(stored.sequence, 1);
        assert_eq!(history.transitions(), &[stored]);
    }

    #[test]
    fn path_follows_recorded_order() {
        let mut history = TransitionHistory::new();
        history.record(State::New, State::Starting, 1);
        history.record(State::Starting, State::Running, 2);
        history.record(State::Running, State::Stopping, 3);
        history.record(State::Stopping, State::Terminated, 4);

        assert_eq!(
            history.path(),
            vec![
                State::New,
                State::Starting,
                State::Running,
                State::Stopping,
                State::Terminated
            ]
        );
    }

    #[test]
    fn duration_spans_first_to_last() {
        let mut history = TransitionHistory::new();
        history.record(State::New, State::Starting, 1);
        std::thread::sleep(Duration::from_millis(10));
        history.record(State::Starting, State::Running, 2);

        assert!(history.duration().unwrap() >= Duration::from_millis(10));
    }

    #[test]
    fn history_serializes() {
        let mut history = TransitionHistory::new();
        history.record(State::New, State::Terminated, 1);

        let json = serde_json::to_string(&history).unwrap();
        let back: TransitionHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transitions(), history.transitions());
    }
}
