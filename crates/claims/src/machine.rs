//! Shared state machine contract

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{TransitionError, TransitionResult};

/// A finite-state machine whose transitions are a fixed table of
/// `(action name, next state)` pairs per state.
pub trait StateMachine: Copy + Eq + Display + FromStr + 'static {
    /// Name used in error messages
    const NAME: &'static str;

    /// Outgoing edges of this state
    fn transitions(&self) -> &'static [(&'static str, Self)];

    /// States reachable in one step
    fn next_states(&self) -> Vec<Self> {
        let mut states: Vec<Self> = Vec::new();
        for (_, next) in self.transitions() {
            if !states.contains(next) {
                states.push(*next);
            }
        }
        states
    }

    /// Action names that may move the machine out of this state
    fn allowed_actions(&self) -> Vec<&'static str> {
        self.transitions().iter().map(|(action, _)| *action).collect()
    }

    fn can_transition(&self, to: Self) -> bool {
        self.transitions().iter().any(|(_, next)| *next == to)
    }

    fn allows_action(&self, action: &str) -> bool {
        self.transitions().iter().any(|(name, _)| *name == action)
    }

    /// State an action leads to from here
    fn target_of(&self, action: &str) -> Option<Self> {
        self.transitions()
            .iter()
            .find(|(name, _)| *name == action)
            .map(|(_, next)| *next)
    }

    /// True when no further transition exists
    fn is_terminal(&self) -> bool {
        self.transitions().is_empty()
    }

    /// Check that `action` is the edge from this state to `to`
    fn check(&self, to: Self, action: &str) -> TransitionResult<()> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self.to_string()));
        }
        if !self.can_transition(to) {
            return Err(TransitionError::NotAllowed {
                machine: Self::NAME,
                from: self.to_string(),
                to: to.to_string(),
            });
        }
        if self.target_of(action) != Some(to) {
            return Err(TransitionError::ActionNotAllowed {
                action: action.to_string(),
                state: self.to_string(),
            });
        }
        Ok(())
    }
}

/// `can_transition` over state names; an unknown name on either side is false
pub fn can_transition_named<S: StateMachine>(from: &str, to: &str) -> bool {
    match (S::from_str(from), S::from_str(to)) {
        (Ok(from), Ok(to)) => from.can_transition(to),
        _ => false,
    }
}
