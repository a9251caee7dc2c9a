// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The scheduler contract and its three policies.

mod fcfs;
mod priority;
mod sjf;

pub use fcfs::FcfsScheduler;
pub use priority::PriorityScheduler;
pub use sjf::SjfScheduler;

use std::sync::Arc;
use std::time::Duration;

use crate::id::{SchedulerId, TaskId};
use crate::status::Status;
use crate::task::Task;

/// Running counters of scheduled / unscheduled / stolen / dequeued-for-
/// execution tasks, mutated only under the owning scheduler's monitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
    pub scheduled: u64,
    pub unscheduled: u64,
    pub stolen: u64,
    pub dequeued_for_execution: u64,
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scheduled: {}, unscheduled: {}, stolen: {}, dequeued: {}",
            self.scheduled, self.unscheduled, self.stolen, self.dequeued_for_execution
        )
    }
}

/// An ordered queue of tasks under a policy (FCFS, Priority, SJF). Never
/// exposes its internal containers; every mutation goes through this
/// contract.
pub trait Scheduler: Send + Sync {
    fn id(&self) -> SchedulerId;
    fn size(&self) -> usize;
    fn is_scheduled(&self, task_id: TaskId) -> bool;
    fn statistics(&self) -> Statistics;

    /// Reject a null-equivalent (there is no null in Rust, so this is
    /// reserved for tasks lacking the tag the policy requires) with
    /// `Error`; counter unchanged. On success the task is observable via
    /// `is_scheduled` immediately and any waiter in `wait_task_for_execution`
    /// is unblocked.
    fn schedule(&self, task: Arc<Task>) -> Status;

    /// Succeeds (`Ok`) if at least one element was accepted; rejected
    /// elements are logged and skipped. Empty or fully-rejected input is
    /// `Error`.
    fn schedule_many(&self, tasks: Vec<Arc<Task>>) -> Status;

    /// Return the policy-next task and remove it; `None` if empty.
    /// Increments the dequeued-for-execution counter.
    fn get_task_for_execution(&self) -> Option<Arc<Task>>;

    /// Return the policy-*reverse* task and remove it, for work-stealing.
    /// Increments the stolen counter. Never blocks.
    fn steal(&self) -> Option<Arc<Task>>;

    /// Remove the task with the matching id if present; increments the
    /// unscheduled counter on a hit.
    fn unschedule_one(&self, task_id: TaskId) -> Option<Arc<Task>>;

    /// Drain the entire queue; increments the unscheduled counter by the
    /// number drained.
    fn unschedule_all(&self) -> Vec<Arc<Task>>;

    /// Same as `unschedule_all` but drops the tasks. `Error` iff the queue
    /// was already empty.
    fn clear_all(&self) -> Status;

    /// Block until the queue becomes non-empty or `timeout` elapses
    /// (`None` = infinite). Returns `Ok` immediately if already non-empty.
    fn wait_task_for_execution(&self, timeout: Option<Duration>) -> Status;

    /// Wake every waiter unconditionally (used on shutdown).
    fn notify_task_for_execution(&self);
}
