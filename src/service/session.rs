use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unlocked,
    Locked,
}

/// Inactivity gate over the whole journal. Starts unlocked; any recognized
/// user activity restarts the countdown, and expiry hides everything behind
/// the passphrase prompt until the shared secret is re-entered.
pub struct SessionGuard {
    passphrase: String,
    timeout: Duration,
    state: SessionState,
    deadline: Instant,
}

impl SessionGuard {
    pub fn new(passphrase: impl Into<String>, timeout: Duration) -> Self {
        SessionGuard {
            passphrase: passphrase.into(),
            timeout,
            state: SessionState::Unlocked,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == SessionState::Locked
    }

    /// A key press, paste, pointer event, or resize. Restarts the countdown
    /// while unlocked; ignored while locked.
    pub fn record_activity(&mut self) {
        self.record_activity_at(Instant::now());
    }

    fn record_activity_at(&mut self, now: Instant) {
        if self.state == SessionState::Unlocked {
            self.deadline = now + self.timeout;
        }
    }

    /// Check the countdown. Returns true when this call crossed into
    /// `Locked`, so the caller can switch the UI over exactly once.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    fn poll_at(&mut self, now: Instant) -> bool {
        if self.state == SessionState::Unlocked && now >= self.deadline {
            self.state = SessionState::Locked;
            return true;
        }
        false
    }

    /// A correct passphrase unlocks and restarts the countdown; anything
    /// else leaves the gate closed. The caller clears its input field and
    /// shows the inline error on `false`.
    pub fn submit_passphrase(&mut self, attempt: &str) -> bool {
        self.submit_passphrase_at(attempt, Instant::now())
    }

    fn submit_passphrase_at(&mut self, attempt: &str, now: Instant) -> bool {
        if attempt == self.passphrase {
            self.state = SessionState::Unlocked;
            self.deadline = now + self.timeout;
            true
        } else {
            false
        }
    }
}
