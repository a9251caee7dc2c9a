// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! A worker: a dedicated thread driving its own private scheduler.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::PoolError;
use crate::id::{TaskId, WorkerId};
use crate::managed_thread::{DetachedThread, ManagedThread};
use crate::scheduler::{Scheduler, Statistics};
use crate::status::Status;
use crate::sync::Monitor;
use crate::task::Task;

/// Idle-polling timeout the run loop uses while waiting for its scheduler
/// to receive work (fixed, matching the source).
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Ready,
    Running,
    Waiting,
    Paused,
    Stopped,
    Finished,
}

pub struct Worker {
    id: WorkerId,
    scheduler: Arc<dyn Scheduler>,
    state: Monitor<WorkerState>,
    waiting_since: Mutex<Instant>,
    managed: Arc<ManagedThread>,
    thread: Mutex<Option<DetachedThread>>,
    on_idle: Arc<dyn Fn() + Send + Sync>,
}

impl Worker {
    pub fn new(scheduler: Arc<dyn Scheduler>, on_idle: Arc<dyn Fn() + Send + Sync>) -> Arc<Self> {
        Arc::new(Self {
            id: WorkerId::new(),
            scheduler,
            state: Monitor::new(WorkerState::Ready),
            waiting_since: Mutex::new(Instant::now()),
            managed: ManagedThread::new(),
            thread: Mutex::new(None),
            on_idle,
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state.with(|s| *s)
    }

    fn set_state(&self, state: WorkerState) {
        self.state.with(|s| *s = state);
    }

    /// Scheduler queue size: used by the dispatcher for load balancing and
    /// available-worker selection.
    pub fn size(&self) -> usize {
        self.scheduler.size()
    }

    pub fn statistics(&self) -> Statistics {
        self.scheduler.statistics()
    }

    /// Microseconds since the worker last started running a task. The
    /// clock runs continuously from that point regardless of whether the
    /// worker is currently running or idle, matching the source.
    pub fn waiting_time_micros(&self) -> u64 {
        self.waiting_since.lock().unwrap().elapsed().as_micros() as u64
    }

    pub fn add_task(&self, task: Arc<Task>) -> Status {
        self.scheduler.schedule(task)
    }

    pub fn add_tasks(&self, tasks: Vec<Arc<Task>>) -> Status {
        self.scheduler.schedule_many(tasks)
    }

    pub fn steal_task(&self) -> Option<Arc<Task>> {
        self.scheduler.steal()
    }

    pub fn remove_one_task(&self, task_id: TaskId) -> Option<Arc<Task>> {
        self.scheduler.unschedule_one(task_id)
    }

    pub fn remove_all_tasks(&self) -> Vec<Arc<Task>> {
        self.scheduler.unschedule_all()
    }

    pub fn clear_all_tasks(&self) -> Status {
        self.scheduler.clear_all()
    }

    pub fn is_task_added(&self, task_id: TaskId) -> bool {
        self.scheduler.is_scheduled(task_id)
    }

    /// Start the worker's dedicated thread. `start_paused` mirrors the
    /// fleet-scaling rule: a worker created while the pool is `Paused`
    /// starts its thread already paused. A background worker thread is the
    /// caller's concern only at creation time: if the OS refuses to spawn
    /// it, that failure is reported here rather than panicking a thread
    /// that never existed.
    pub fn start(self: &Arc<Self>, start_paused: bool) -> Result<(), PoolError> {
        if start_paused {
            self.managed.pause();
            self.set_state(WorkerState::Paused);
        }
        let this = self.clone();
        let handle = std::thread::Builder::new()
            .name(format!("workpool-worker-{}", self.id))
            .spawn(move || this.run_loop())
            .map_err(PoolError::ThreadSpawnFailed)?;
        *self.thread.lock().unwrap() = Some(DetachedThread::new(handle));
        Ok(())
    }

    /// Block until the worker's run loop has returned. A no-op if the
    /// worker's thread was never started. Safe to call from any thread
    /// other than the worker's own, including while tearing down the pool.
    pub fn wait_finished(&self) {
        if self.thread.lock().unwrap().is_some() {
            self.managed.wait_finished();
        }
    }

    pub fn pause(&self) {
        self.managed.pause();
        self.set_state(WorkerState::Paused);
    }

    pub fn resume(&self) {
        self.managed.resume();
    }

    /// Stop the run loop and notify the scheduler so any
    /// `wait_task_for_execution` caller unblocks.
    pub fn stop(&self) {
        self.managed.stop();
        self.scheduler.notify_task_for_execution();
    }

    fn run_loop(self: Arc<Self>) {
        loop {
            if !self.managed.run_iteration() {
                break;
            }
            if self.state() == WorkerState::Paused {
                self.set_state(WorkerState::Waiting);
            }

            match self.scheduler.get_task_for_execution() {
                Some(task) => {
                    *self.waiting_since.lock().unwrap() = Instant::now();
                    self.set_state(WorkerState::Running);
                    task.execute();
                }
                None => {
                    self.set_state(WorkerState::Waiting);
                    (self.on_idle)();
                    let _ = self.scheduler.wait_task_for_execution(Some(IDLE_TIMEOUT));
                }
            }
        }
        debug!("worker {} run loop exiting", self.id);
        self.set_state(WorkerState::Finished);
        self.managed.mark_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FcfsScheduler;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn worker_executes_tasks_from_its_own_scheduler() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(FcfsScheduler::new());
        let worker = Worker::new(scheduler.clone(), Arc::new(|| {}));
        worker.start(false).unwrap();

        let counter = Arc::new(AtomicU32::new(0));
        let counter2 = counter.clone();
        let task = Task::new();
        let handle = task.submit(move || {
            counter2.fetch_add(1, Ordering::Relaxed);
        });
        worker.add_task(task);

        for _ in 0..200 {
            if handle.try_get().is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        worker.stop();
    }

    #[test]
    fn worker_pause_blocks_execution_until_resumed() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(FcfsScheduler::new());
        let worker = Worker::new(scheduler, Arc::new(|| {}));
        worker.start(false).unwrap();
        worker.pause();

        let counter = Arc::new(AtomicU32::new(0));
        let counter2 = counter.clone();
        let task = Task::new();
        let _handle = task.submit(move || {
            counter2.fetch_add(1, Ordering::Relaxed);
        });
        worker.add_task(task);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::Relaxed), 0);

        worker.resume();
        for _ in 0..200 {
            if counter.load(Ordering::Relaxed) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        worker.stop();
    }
}
