//! The review state machine shared by teacher approval and enrollment.
//!
//! Both workflows have the same shape: `Pending → Approved | Rejected`, with
//! both outcomes terminal. Re-applying the current terminal state is a no-op.

use std::fmt::Display;

use crate::{Error, Result};

/// What a valid review decision does to the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// The state moves out of `Pending`; the caller must persist it.
  Changed,
  /// The requested state is already current.
  Unchanged,
}

/// A three-state review workflow.
pub trait ReviewState: Copy + Eq + Display {
  const PENDING: Self;

  fn is_terminal(self) -> bool { self != Self::PENDING }

  /// Validate a review decision moving `self` to `next`.
  fn transition_to(self, next: Self) -> Result<Transition> {
    if next == Self::PENDING || (self.is_terminal() && next != self) {
      return Err(Error::InvalidTransition {
        from: self.to_string(),
        to:   next.to_string(),
      });
    }
    if next == self {
      return Ok(Transition::Unchanged);
    }
    Ok(Transition::Changed)
  }
}
