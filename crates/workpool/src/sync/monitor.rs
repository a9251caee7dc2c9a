// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Monitor: a mutex plus a condition variable, closure-based so no guard
//! ever escapes the call that took it.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use super::timeout::Timeout;
use crate::status::Status;

pub(crate) struct Monitor<T> {
    state: Mutex<T>,
    cvar: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(value),
            cvar: Condvar::new(),
        }
    }

    /// Run `f` with exclusive access to the guarded state.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn notify_one(&self) {
        self.cvar.notify_one();
    }

    pub fn notify_all(&self) {
        self.cvar.notify_all();
    }

    /// Block until `ready` holds for the guarded state, or `timeout`
    /// elapses (`None` = infinite). Returns immediately without waiting if
    /// `ready` already holds. On success runs `f` with exclusive access and
    /// returns its value; on timeout returns `Status::Timeout` and leaves
    /// state untouched.
    pub fn wait_until<R>(
        &self,
        timeout: Option<Duration>,
        mut ready: impl FnMut(&T) -> bool,
        f: impl FnOnce(&mut T) -> R,
    ) -> (Status, Option<R>) {
        let deadline = Timeout::new(timeout);
        let mut guard = self.state.lock().unwrap();
        while !ready(&guard) {
            match deadline.remaining() {
                None => {
                    guard = self.cvar.wait(guard).unwrap();
                }
                Some(remaining) => {
                    if remaining.is_zero() {
                        return (Status::Timeout, None);
                    }
                    let (g, result) = self.cvar.wait_timeout(guard, remaining).unwrap();
                    guard = g;
                    if result.timed_out() && !ready(&guard) {
                        return (Status::Timeout, None);
                    }
                }
            }
        }
        (Status::Ok, Some(f(&mut guard)))
    }
}
