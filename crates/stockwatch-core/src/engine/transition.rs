//! Notification latch
//!
//! Each product carries a two-state latch in [`NotificationState`]: armed
//! (`notified == false` or no entry) and fired (`notified == true`).
//!
//! | observation  | armed                 | fired          |
//! |--------------|-----------------------|----------------|
//! | `InStock`    | announce, → fired     | suppress       |
//! | `OutOfStock` | stays armed           | → armed        |
//! | `Unknown`    | no change             | no change      |
//!
//! The persisted flag is the only edge memory; the previous run's
//! observation is not consulted.

use crate::config::Product;
use crate::traits::{NotificationState, Observation, StockStatus};

/// What happened to one product's latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Rising edge: a notification must be sent
    Fired,
    /// Already announced for this streak
    Suppressed,
    /// A previously fired latch was re-armed
    Reset,
    /// Nothing changed
    Unchanged,
}

/// Result of applying one run's observations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// State to persist
    pub state: NotificationState,
    /// Products to announce, in observation order
    pub notifications: Vec<Product>,
    /// Per-product transition, in observation order
    pub transitions: Vec<(u32, Transition)>,
}

/// Apply one observation to the state
pub fn step(state: &mut NotificationState, observation: &Observation, timestamp: &str) -> Transition {
    let key = observation.product.state_key();
    match observation.status {
        StockStatus::InStock if state.is_notified(&key) => Transition::Suppressed,
        StockStatus::InStock => {
            state.mark_notified(key, timestamp);
            Transition::Fired
        }
        StockStatus::OutOfStock if state.reset(&key) => Transition::Reset,
        StockStatus::OutOfStock | StockStatus::Unknown => Transition::Unchanged,
    }
}

/// Apply every observation of a run to the state
///
/// `timestamp` is recorded on entries that fire.
pub fn apply_observations(
    mut state: NotificationState,
    observations: &[Observation],
    timestamp: &str,
) -> TransitionOutcome {
    let mut notifications = Vec::new();
    let mut transitions = Vec::with_capacity(observations.len());

    for observation in observations {
        let transition = step(&mut state, observation, timestamp);
        if transition == Transition::Fired {
            notifications.push(observation.product.clone());
        }
        transitions.push((observation.product.id, transition));
    }

    TransitionOutcome {
        state,
        notifications,
        transitions,
    }
}
