//! Endpoint lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Connecting → Workable      ping succeeded after open
//! Connecting → Unworkable    open exhausted its attempts, or ping failed
//! Workable   → Unworkable    network-class error observed
//! Unworkable → Workable      recovery probe or reconnect succeeded
//! any        → Closed        explicit shutdown; terminal
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointState {
    Connecting = 0,
    Workable = 1,
    Unworkable = 2,
    Closed = 3,
}

impl From<u8> for EndpointState {
    fn from(val: u8) -> Self {
        match val {
            1 => EndpointState::Workable,
            2 => EndpointState::Unworkable,
            3 => EndpointState::Closed,
            _ => EndpointState::Connecting,
        }
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndpointState::Connecting => "connecting",
            EndpointState::Workable => "workable",
            EndpointState::Unworkable => "unworkable",
            EndpointState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Atomic cell holding an `EndpointState`.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: EndpointState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> EndpointState {
        self.0.load(Ordering::SeqCst).into()
    }

    /// Move to `to` unless already there or closed. Returns whether the state changed.
    pub(crate) fn transition(&self, to: EndpointState) -> bool {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let state = EndpointState::from(current);
            if state == EndpointState::Closed || state == to {
                return false;
            }
            match self
                .0
                .compare_exchange_weak(current, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(x) => current = x,
            }
        }
    }

    /// Enter the terminal state. Returns the previous state.
    pub(crate) fn close(&self) -> EndpointState {
        self.0.swap(EndpointState::Closed as u8, Ordering::SeqCst).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let cell = StateCell::new(EndpointState::Connecting);
        assert!(cell.transition(EndpointState::Workable));
        assert!(!cell.transition(EndpointState::Workable));
        assert!(cell.transition(EndpointState::Unworkable));
        assert!(cell.transition(EndpointState::Workable));
        assert_eq!(cell.load(), EndpointState::Workable);
    }

    #[test]
    fn test_closed_is_terminal() {
        let cell = StateCell::new(EndpointState::Workable);
        assert_eq!(cell.close(), EndpointState::Workable);
        assert!(!cell.transition(EndpointState::Workable));
        assert!(!cell.transition(EndpointState::Connecting));
        assert_eq!(cell.load(), EndpointState::Closed);
    }
}
