// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Skeleton that hosts pause/resume/stop lifecycle over a user-supplied
//! per-iteration routine, run on a dedicated OS thread. Workers and the
//! pool's dispatcher are both built on top of this.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::sync::Monitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Paused,
}

/// Owns the pause/resume/stop control surface for one background thread,
/// plus a finished signal the thread raises on itself right before its run
/// wrapper returns. The thread itself is spawned by the caller, which
/// repeatedly calls [`ManagedThread::run_iteration`] around its own
/// per-iteration routine and calls [`ManagedThread::mark_finished`] once,
/// on exit.
pub(crate) struct ManagedThread {
    run_state: Monitor<RunState>,
    stopped: AtomicBool,
    finished: Monitor<bool>,
}

impl ManagedThread {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            run_state: Monitor::new(RunState::Running),
            stopped: AtomicBool::new(false),
            finished: Monitor::new(false),
        })
    }

    /// Blocks the calling (background) thread while paused; returns
    /// immediately while running. Returns `false` once `stop` has been
    /// called, telling the caller's loop to exit.
    pub fn run_iteration(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        self.run_state
            .wait_until(None, |s| *s == RunState::Running, |_| ());
        !self.stopped.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        self.run_state.with(|s| *s = RunState::Paused);
    }

    pub fn resume(&self) {
        self.run_state.with(|s| *s = RunState::Running);
        self.run_state.notify_all();
    }

    /// Unblock a paused loop and tell `run_iteration` to return `false`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.run_state.with(|s| *s = RunState::Running);
        self.run_state.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Raised by the managed thread itself, exactly once, right before its
    /// run wrapper returns.
    pub fn mark_finished(&self) {
        self.finished.with(|f| *f = true);
        self.finished.notify_all();
    }

    /// Block until `mark_finished` has been called. Unlike joining the
    /// thread's `JoinHandle`, this never risks a self-join: it only waits
    /// on a condvar, so even a caller running on the managed thread itself
    /// merely blocks pointlessly rather than deadlocking the OS thread
    /// join machinery.
    pub fn wait_finished(&self) {
        self.finished.wait_until(None, |f| *f, |_| ());
    }
}

/// Detaches its thread on drop instead of joining it. Joining from inside a
/// `Drop` impl is a self-join hazard: if the managed thread itself ends up
/// holding the last owner of this handle (e.g. the last `Arc` to the
/// worker/pool it belongs to), the thread would block trying to join
/// itself. Shutdown code that needs join-like synchronization instead
/// calls [`ManagedThread::wait_finished`] from whichever thread is tearing
/// things down, which is never the managed thread itself.
pub(crate) struct DetachedThread {
    _handle: JoinHandle<()>,
}

impl DetachedThread {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { _handle: handle }
    }
}
