//! Session state
//!
//! A session tracks what the device has told us about the connection:
//! - Session key (assigned by the device in its connect reply)
//! - Sequence counter (one per request, starting at 0)
//! - Lifecycle state

use std::sync::atomic::{AtomicU16, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Session lifecycle
///
/// ```text
/// Disconnected → Connecting → KeyExchanged → [Authenticated] → Ready → Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Disconnected,

    /// Transport open, connect request in flight
    Connecting,

    /// Device replied to connect and assigned a session key
    KeyExchanged,

    /// Comm key accepted
    Authenticated,

    /// Ready for commands
    Ready,
}

/// Session manager
///
/// Owned by one connection. The key and counter are atomics so the
/// sequence can be drawn through `&self` while a request is being built.
#[derive(Debug)]
pub struct Session {
    session_key: AtomicU16,
    sequence: AtomicU16,
    state: RwLock<SessionState>,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            session_key: AtomicU16::new(0),
            sequence: AtomicU16::new(0),
            state: RwLock::new(SessionState::Disconnected),
        }
    }

    pub fn session_key(&self) -> u16 {
        self.session_key.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Check if commands may be sent
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Reset key and sequence and move to `Connecting`
    pub fn begin_connect(&self) -> Result<()> {
        let mut state = self.state.write();

        if *state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot connect from state: {:?}",
                *state
            )));
        }

        self.session_key.store(0, Ordering::Release);
        self.sequence.store(0, Ordering::Release);
        *state = SessionState::Connecting;
        Ok(())
    }

    /// Adopt the key from the device's connect reply
    pub fn exchange_key(&self, session_key: u16) -> Result<()> {
        self.transition(SessionState::Connecting, SessionState::KeyExchanged)?;
        self.session_key.store(session_key, Ordering::Release);
        Ok(())
    }

    /// Mark the comm key as accepted
    pub fn authenticate(&self) -> Result<()> {
        self.transition(SessionState::KeyExchanged, SessionState::Authenticated)
    }

    /// Open the session for commands
    pub fn mark_ready(&self) -> Result<()> {
        let mut state = self.state.write();

        if !matches!(*state, SessionState::KeyExchanged | SessionState::Authenticated) {
            return Err(Error::InvalidSessionState(format!(
                "Cannot become ready from state: {:?}",
                *state
            )));
        }

        *state = SessionState::Ready;
        Ok(())
    }

    fn transition(&self, from: SessionState, to: SessionState) -> Result<()> {
        let mut state = self.state.write();

        if *state != from {
            return Err(Error::InvalidSessionState(format!(
                "Cannot move to {:?} from state: {:?}",
                to, *state
            )));
        }

        *state = to;
        Ok(())
    }

    /// Close session
    pub fn close(&self) {
        self.session_key.store(0, Ordering::Release);
        self.sequence.store(0, Ordering::Release);
        *self.state.write() = SessionState::Disconnected;
    }

    /// Get the sequence number for the next request
    ///
    /// Returns the current value and increments, wrapping at `u16::MAX`.
    pub fn next_sequence(&self) -> u16 {
        self.sequence.fetch_add(1, Ordering::AcqRel)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
