// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Deadline captured once, polled repeatedly (`OSALTimeout` in the source).

use std::time::{Duration, Instant};

/// A deadline computed once at construction. `None` means infinite.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timeout {
    deadline: Option<Instant>,
}

impl Timeout {
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            deadline: duration.map(|d| Instant::now() + d),
        }
    }

    /// Remaining time until the deadline. `None` means infinite; an expired
    /// deadline yields `Some(Duration::ZERO)`.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_never_expires() {
        let t = Timeout::new(None);
        assert!(t.remaining().is_none());
        assert!(!t.is_expired());
    }

    #[test]
    fn expired_yields_zero() {
        let t = Timeout::new(Some(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(t.is_expired());
    }

    #[test]
    fn not_yet_expired() {
        let t = Timeout::new(Some(Duration::from_secs(10)));
        assert!(!t.is_expired());
        assert!(t.remaining().unwrap() > Duration::from_secs(1));
    }
}
