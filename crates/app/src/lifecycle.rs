//! Atomic lifecycle cell shared by controller implementations.

use std::sync::atomic::{AtomicU8, Ordering};

use homelink_domain::controller::ControllerState;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;
const DESTROYED: u8 = 3;

/// Tracks `Uninitialized → Initializing → Ready → Destroyed`.
#[derive(Debug, Default)]
pub struct Lifecycle(AtomicU8);

impl Lifecycle {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(UNINITIALIZED))
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        match self.0.load(Ordering::Acquire) {
            INITIALIZING => ControllerState::Initializing,
            READY => ControllerState::Ready,
            DESTROYED => ControllerState::Destroyed,
            _ => ControllerState::Uninitialized,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ControllerState::Ready
    }

    /// `Uninitialized → Initializing`. Fails from any other state.
    pub fn begin_init(&self) -> bool {
        self.transition(UNINITIALIZED, INITIALIZING)
    }

    /// `Initializing → Ready`. Fails if destroyed meanwhile.
    pub fn mark_ready(&self) -> bool {
        self.transition(INITIALIZING, READY)
    }

    /// `Initializing → Uninitialized`, after a failed init.
    pub fn abort_init(&self) -> bool {
        self.transition(INITIALIZING, UNINITIALIZED)
    }

    /// Move to `Destroyed`. Returns `false` if it already was.
    pub fn destroy(&self) -> bool {
        self.0.swap(DESTROYED, Ordering::AcqRel) != DESTROYED
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.0
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_walk_through_happy_path() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ControllerState::Uninitialized);
        assert!(lifecycle.begin_init());
        assert_eq!(lifecycle.state(), ControllerState::Initializing);
        assert!(lifecycle.mark_ready());
        assert!(lifecycle.is_ready());
        assert!(lifecycle.destroy());
        assert_eq!(lifecycle.state(), ControllerState::Destroyed);
    }

    #[test]
    fn should_refuse_second_init() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_init());
        assert!(!lifecycle.begin_init());
    }

    #[test]
    fn should_allow_retry_after_aborted_init() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_init());
        assert!(lifecycle.abort_init());
        assert!(lifecycle.begin_init());
    }

    #[test]
    fn should_be_idempotent_when_destroying_twice() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.destroy());
        assert!(!lifecycle.destroy());
        assert!(!lifecycle.begin_init());
    }

    #[test]
    fn should_not_become_ready_once_destroyed_during_init() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_init());
        lifecycle.destroy();
        assert!(!lifecycle.mark_ready());
        assert_eq!(lifecycle.state(), ControllerState::Destroyed);
    }
}
