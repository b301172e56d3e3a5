//! Bridge lifecycle state machine.
//!
//! ```text
//! Uninitialized → Initializing → Ready → { Active ⇄ Backgrounded } → Destroyed
//! ```
//!
//! `Destroyed` is terminal and reachable from every other state. Repeated
//! requests for the state the bridge is already in (or, for `Ready`, any
//! state past it) are reported as [`Transition::Unchanged`] so callers can
//! skip their side effects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;

/// The lifecycle states of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing attached yet.
    #[default]
    Uninitialized,
    /// Transport attachment and built-in module registration in progress.
    Initializing,
    /// Ready for calls, not yet foregrounded.
    Ready,
    /// In the foreground.
    Active,
    /// In the background.
    Backgrounded,
    /// Torn down. Terminal.
    Destroyed,
}

impl LifecycleState {
    /// Whether calls may be issued in this state.
    #[must_use]
    pub const fn accepts_calls(self) -> bool {
        matches!(self, Self::Ready | Self::Active | Self::Backgrounded)
    }

    /// Whether this is the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Lowercase name, suitable for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Backgrounded => "backgrounded",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permitted transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed; side effects should run.
    Changed {
        /// Previous state.
        from: LifecycleState,
        /// New state.
        to: LifecycleState,
    },
    /// Idempotent request; the state stays as reported.
    Unchanged(LifecycleState),
}

impl Transition {
    /// Whether the state actually changed.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// The lifecycle state machine. Not synchronized; wrap it in a lock when
/// shared.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    /// A state machine in [`LifecycleState::Uninitialized`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Request a transition to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the state machine
    /// has no edge from the current state to `to`.
    pub fn transition(&mut self, to: LifecycleState) -> Result<Transition, LifecycleError> {
        use LifecycleState::{Active, Backgrounded, Destroyed, Initializing, Ready, Uninitialized};

        let from = self.state;
        match (from, to) {
            (Destroyed, Destroyed)
            | (Initializing, Initializing)
            | (Ready | Active | Backgrounded, Ready)
            | (Active, Active)
            | (Backgrounded, Backgrounded) => Ok(Transition::Unchanged(from)),
            (Destroyed, _) => Err(LifecycleError::InvalidTransition { from, to }),
            (_, Destroyed)
            | (Uninitialized, Initializing)
            | (Initializing, Ready)
            | (Ready | Backgrounded, Active)
            | (Ready | Active, Backgrounded) => {
                self.state = to;
                Ok(Transition::Changed { from, to })
            },
            _ => Err(LifecycleError::InvalidTransition { from, to }),
        }
    }

    /// Return to [`LifecycleState::Initializing`] after the content reloaded.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] once destroyed.
    pub fn reload(&mut self) -> Result<Transition, LifecycleError> {
        let from = self.state;
        match from {
            LifecycleState::Destroyed => Err(LifecycleError::InvalidTransition {
                from,
                to: LifecycleState::Initializing,
            }),
            LifecycleState::Initializing => Ok(Transition::Unchanged(from)),
            _ => {
                self.state = LifecycleState::Initializing;
                Ok(Transition::Changed {
                    from,
                    to: LifecycleState::Initializing,
                })
            },
        }
    }
}
