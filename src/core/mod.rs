//! Core lifecycle machinery.
//!
//! This module contains the state machine and its synchronization:
//! - State definitions and the transition table
//! - Transition history, the source of listener replay
//! - The per-service record and the guard that serializes access to it
//! - Blocking waits built on the guard's condition variable
//!
//! Nothing here runs user code while a lock is held.

mod guard;
mod history;
mod record;
mod state;
mod wait;

pub use history::{Transition, TransitionHistory};
pub use state::{is_legal_transition, State, ALL_STATES};

pub(crate) use guard::{Applied, TransitionGuard};
