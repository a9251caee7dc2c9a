// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! A one-shot unit of work: identity, a small state machine, an erased
//! callable, and a result handle that publishes the callable's return
//! value exactly once.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::id::TaskId;
use crate::status::Status;

/// `Created -> Submitted -> InExecution -> Executed`, with `Canceled`
/// reachable from any non-`Canceled` state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created = 0,
    Submitted = 1,
    InExecution = 2,
    Executed = 3,
    Canceled = 4,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Submitted,
            2 => Self::InExecution,
            3 => Self::Executed,
            _ => Self::Canceled,
        }
    }
}

/// `High` sorts above `Normal` sorts above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// `Short` sorts below `Medium` sorts below `Long`. `Undefined` is
/// normalized to `Long` at scheduling time by the SJF policy, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BurstTime {
    Short,
    Medium,
    Long,
    Undefined,
}

impl Default for BurstTime {
    fn default() -> Self {
        BurstTime::Medium
    }
}

/// The ordering tag a task carries, fixed for the task's lifetime. A single
/// `Task` carries at most one tag rather than being subclassed per policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    None,
    Priority(Priority),
    BurstTime(BurstTime),
}

type Callable = Box<dyn FnOnce() + Send>;

/// Slot that the callable writes its return value into exactly once, and
/// that the submitter's [`TaskHandle`] reads back. Mirrors the
/// notify-on-completion pattern used for OS-thread join waits elsewhere in
/// this codebase, generalized to an arbitrary result type.
struct ResultSlot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> ResultSlot<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn set(&self, value: T) {
        *self.value.lock().unwrap() = Some(value);
        self.ready.notify_all();
    }

    fn try_take(&self) -> Option<T> {
        self.value.lock().unwrap().take()
    }

    fn take_blocking(&self, timeout: Option<Duration>) -> Option<T> {
        let mut guard = self.value.lock().unwrap();
        match timeout {
            None => {
                while guard.is_none() {
                    guard = self.ready.wait(guard).unwrap();
                }
            }
            Some(d) => {
                let (g, _) = self
                    .ready
                    .wait_timeout_while(guard, d, |v| v.is_none())
                    .unwrap();
                guard = g;
            }
        }
        guard.take()
    }
}

/// Handle returned by [`Task::submit`]. Publishes the submitted callable's
/// return value exactly once; re-submission abandons whatever handle was
/// previously issued (its slot simply never gets filled).
pub struct TaskHandle<T> {
    slot: Arc<ResultSlot<T>>,
}

impl<T> TaskHandle<T> {
    fn new(slot: Arc<ResultSlot<T>>) -> Self {
        Self { slot }
    }

    /// Return the result if it is already available, without blocking.
    pub fn try_get(&self) -> Option<T> {
        self.slot.try_take()
    }

    /// Block until the result is available.
    pub fn get(&self) -> T {
        self.slot
            .take_blocking(None)
            .expect("result slot notified without a value")
    }

    /// Block until the result is available or `timeout` elapses.
    pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
        self.slot.take_blocking(Some(timeout))
    }
}

/// A user-supplied unit of work wrapped with identity, state, and a result
/// channel.
pub struct Task {
    id: TaskId,
    state: AtomicU8,
    tag: Tag,
    callable: Mutex<Option<Callable>>,
}

impl Task {
    fn with_tag(tag: Tag) -> Arc<Self> {
        Arc::new(Self {
            id: TaskId::new(),
            state: AtomicU8::new(TaskState::Created as u8),
            tag,
            callable: Mutex::new(None),
        })
    }

    /// A plain task carrying no ordering tag (valid for FCFS only).
    pub fn new() -> Arc<Self> {
        Self::with_tag(Tag::None)
    }

    pub fn with_priority(priority: Priority) -> Arc<Self> {
        Self::with_tag(Tag::Priority(priority))
    }

    pub fn with_burst_time(burst_time: BurstTime) -> Arc<Self> {
        Self::with_tag(Tag::BurstTime(burst_time))
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Store an erased wrapper that, when invoked, runs `f` and fulfills
    /// the returned handle with its result. Transitions to `Submitted`
    /// unless the task is currently `InExecution`, in which case the
    /// payload is replaced but the state is left alone (per the source's
    /// behavior: a submit racing an in-flight execution does not
    /// retroactively re-arm that execution).
    pub fn submit<F, R>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let slot = Arc::new(ResultSlot::new());
        let slot_for_callable = slot.clone();
        let boxed: Callable = Box::new(move || {
            let result = f();
            slot_for_callable.set(result);
        });

        *self.callable.lock().unwrap() = Some(boxed);

        loop {
            let cur = self.state.load(Ordering::Acquire);
            if cur == TaskState::InExecution as u8 {
                break;
            }
            if self
                .state
                .compare_exchange(
                    cur,
                    TaskState::Submitted as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                break;
            }
        }

        TaskHandle::new(slot)
    }

    /// Run the wrapped callable if the task is `Submitted`. `Error` if no
    /// callable is present. `Canceled` if the task is already `Canceled`,
    /// or if it is in any state other than `Submitted` (the source never
    /// re-runs a task that isn't freshly submitted; it reports this the
    /// same way it reports an explicit cancellation).
    pub fn execute(&self) -> Status {
        let mut guard = self.callable.lock().unwrap();
        if guard.is_none() {
            return Status::Error;
        }
        let cur = TaskState::from_u8(self.state.load(Ordering::Acquire));
        if cur != TaskState::Submitted {
            return Status::Canceled;
        }
        if self
            .state
            .compare_exchange(
                TaskState::Submitted as u8,
                TaskState::InExecution as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            // Lost a race (most likely to a concurrent cancel()).
            return Status::Canceled;
        }
        let callable = guard.take().unwrap();
        drop(guard);

        callable();

        // If cancel() raced us while InExecution, the state is already
        // Canceled and this CAS silently fails: the callable still ran to
        // completion, but the task's final state reflects the cancel.
        let _ = self.state.compare_exchange(
            TaskState::InExecution as u8,
            TaskState::Executed as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        Status::Ok
    }

    /// Move to `Canceled` from any non-`Canceled` state. Idempotent: a
    /// second call returns `Canceled` without side effects. Does not
    /// preempt an execution already in flight.
    pub fn cancel(&self) -> Status {
        loop {
            let cur = self.state.load(Ordering::Acquire);
            if cur == TaskState::Canceled as u8 {
                return Status::Canceled;
            }
            if self
                .state
                .compare_exchange(cur, TaskState::Canceled as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Status::Ok;
            }
        }
    }
}

/// Construct `n` independently-submitted tasks sharing the same callable.
/// Callers who don't need per-task result handles use this instead of
/// `submit` in a loop (if you are interested in each result individually,
/// submit the tasks yourself instead).
pub fn submit_repeated<F, R>(n: usize, tag: Tag, f: F) -> Vec<Arc<Task>>
where
    F: Fn() -> R + Send + Clone + 'static,
    R: Send + 'static,
{
    (0..n)
        .map(|_| {
            let task = Task::with_tag(tag);
            let f = f.clone();
            let _handle = task.submit(move || f());
            task
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn submit_then_execute_publishes_result() {
        let task = Task::new();
        let handle = task.submit(|| 42);
        assert_eq!(task.execute(), Status::Ok);
        assert_eq!(task.state(), TaskState::Executed);
        assert_eq!(handle.try_get(), Some(42));
    }

    #[test]
    fn execute_without_submit_is_error() {
        let task = Task::new();
        assert_eq!(task.execute(), Status::Error);
    }

    #[test]
    fn cancel_then_cancel_stays_canceled() {
        let task = Task::new();
        let _handle = task.submit(|| ());
        assert_eq!(task.cancel(), Status::Ok);
        assert_eq!(task.state(), TaskState::Canceled);
        assert_eq!(task.cancel(), Status::Canceled);
    }

    #[test]
    fn executed_task_can_be_canceled_afterward() {
        let task = Task::new();
        let _handle = task.submit(|| ());
        assert_eq!(task.execute(), Status::Ok);
        assert_eq!(task.cancel(), Status::Ok);
        assert_eq!(task.state(), TaskState::Canceled);
    }

    #[test]
    fn resubmission_replaces_payload_and_result() {
        let task = Task::new();
        let first = task.submit(|| 1);
        assert_eq!(task.execute(), Status::Ok);
        assert_eq!(first.try_get(), Some(1));

        let second = task.submit(|| 2);
        assert_eq!(task.execute(), Status::Ok);
        assert_eq!(second.try_get(), Some(2));
        assert_eq!(task.state(), TaskState::Executed);
    }

    #[test]
    fn cancel_before_submitted_execution_wins() {
        let task = Task::new();
        let _handle = task.submit(|| ());
        task.cancel();
        assert_eq!(task.execute(), Status::Canceled);
    }

    #[test]
    fn submit_repeated_creates_independent_tasks() {
        let counter = Arc::new(AtomicU32::new(0));
        let tasks = submit_repeated(5, Tag::None, {
            let counter = counter.clone();
            move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        assert_eq!(tasks.len(), 5);
        for t in &tasks {
            assert_eq!(t.execute(), Status::Ok);
        }
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }
}
