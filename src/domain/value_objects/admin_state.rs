//! AdminState Value Object
//!
//! The manager's administrative lifecycle state. Transitions are monotonic:
//! Unregistered -> Registered -> ShuttingDown -> ShutDown.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Administrative lifecycle state of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AdminState {
    /// Not yet registered with the domain manager
    #[default]
    Unregistered,

    /// Registered with the domain manager; inbound registrations forward upstream
    Registered,

    /// Teardown in progress; inbound registrations are ignored
    ShuttingDown,

    /// Teardown complete
    ShutDown,
}

impl AdminState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Unregistered,
            1 => Self::Registered,
            2 => Self::ShuttingDown,
            _ => Self::ShutDown,
        }
    }

    /// True while the manager refuses inbound registrations
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Self::ShuttingDown | Self::ShutDown)
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::ShuttingDown => "shutting-down",
            Self::ShutDown => "shut-down",
        };
        write!(f, "{}", s)
    }
}

/// Lock-free cell holding the current AdminState
///
/// The compare-and-swap in `advance` is the serialization point between a
/// shutdown request and a concurrent registration: whichever observes its
/// expected state first wins.
#[derive(Debug, Default)]
pub struct AdminStateCell(AtomicU8);

impl AdminStateCell {
    pub fn new(state: AdminState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> AdminState {
        AdminState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Transition from `from` to `to`; returns false if the current state
    /// was not `from`. Backward transitions are rejected regardless.
    pub fn advance(&self, from: AdminState, to: AdminState) -> bool {
        if (to as u8) < (from as u8) {
            return false;
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        assert_eq!(AdminState::default(), AdminState::Unregistered);
    }

    #[test]
    fn test_display() {
        assert_eq!(AdminState::Registered.to_string(), "registered");
        assert_eq!(AdminState::ShuttingDown.to_string(), "shutting-down");
    }

    #[test]
    fn test_is_shutting_down() {
        assert!(!AdminState::Unregistered.is_shutting_down());
        assert!(!AdminState::Registered.is_shutting_down());
        assert!(AdminState::ShuttingDown.is_shutting_down());
        assert!(AdminState::ShutDown.is_shutting_down());
    }

    #[test]
    fn test_cell_advance() {
        let cell = AdminStateCell::new(AdminState::Unregistered);
        assert!(cell.advance(AdminState::Unregistered, AdminState::Registered));
        assert_eq!(cell.load(), AdminState::Registered);

        // Losing CAS leaves the state untouched
        assert!(!cell.advance(AdminState::Unregistered, AdminState::Registered));
        assert_eq!(cell.load(), AdminState::Registered);
    }

    #[test]
    fn test_cell_rejects_backward() {
        let cell = AdminStateCell::new(AdminState::ShuttingDown);
        assert!(!cell.advance(AdminState::ShuttingDown, AdminState::Registered));
        assert_eq!(cell.load(), AdminState::ShuttingDown);
    }
}
