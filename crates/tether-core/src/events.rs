//! Reserved event names published by the lifecycle controller.
//!
//! Content-side clients treat these as lifecycle signals in addition to
//! delivering them to listeners.

use crate::lifecycle::LifecycleState;

/// The bridge reached [`LifecycleState::Ready`].
pub const READY: &str = "bridge.ready";
/// The host moved to the foreground.
pub const FOREGROUND: &str = "bridge.foreground";
/// The host moved to the background.
pub const BACKGROUND: &str = "bridge.background";
/// The bridge was destroyed.
pub const DESTROYED: &str = "bridge.destroyed";

/// The state a reserved lifecycle event announces, if `name` is one.
#[must_use]
pub fn lifecycle_state_for(name: &str) -> Option<LifecycleState> {
    match name {
        READY => Some(LifecycleState::Ready),
        FOREGROUND => Some(LifecycleState::Active),
        BACKGROUND => Some(LifecycleState::Backgrounded),
        DESTROYED => Some(LifecycleState::Destroyed),
        _ => None,
    }
}

/// The reserved event announcing `state`, if any.
#[must_use]
pub fn event_for_state(state: LifecycleState) -> Option<&'static str> {
    match state {
        LifecycleState::Ready => Some(READY),
        LifecycleState::Active => Some(FOREGROUND),
        LifecycleState::Backgrounded => Some(BACKGROUND),
        LifecycleState::Destroyed => Some(DESTROYED),
        LifecycleState::Uninitialized | LifecycleState::Initializing => None,
    }
}
