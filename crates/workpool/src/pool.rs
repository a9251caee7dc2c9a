// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The pool: owns workers and a central scheduler, runs a dispatcher
//! thread that moves tasks from the central scheduler onto workers, scales
//! the fleet, and exposes the public API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, warn};

use crate::error::PoolError;
use crate::id::{PoolId, TaskId};
use crate::managed_thread::{DetachedThread, ManagedThread};
use crate::options::{PoolOptions, SchedulerKind};
use crate::scheduler::{FcfsScheduler, PriorityScheduler, Scheduler, SjfScheduler};
use crate::status::Status;
use crate::sync::{micros_to_duration, Monitor};
use crate::task::Task;
use crate::worker::{Worker, WorkerState};

/// Fixed idle-polling timeout for the dispatcher's wait, matching the
/// source.
const DISPATCH_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Ready,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Statistic {
    pub current_number_of_all_workers: u32,
    pub number_of_workers_in_ready_state: u32,
    pub number_of_workers_in_running_state: u32,
    pub number_of_workers_in_waiting_state: u32,
    pub number_of_workers_in_paused_state: u32,
    pub total_number_of_added_tasks: u64,
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Current number of all workers : {}\nWorkers in READY state : {}\n\
             Workers in RUNNING state : {}\nWorkers in WAITING state : {}\n\
             Workers in PAUSED state : {}\nTotal number of added tasks : {}",
            self.current_number_of_all_workers,
            self.number_of_workers_in_ready_state,
            self.number_of_workers_in_running_state,
            self.number_of_workers_in_waiting_state,
            self.number_of_workers_in_paused_state,
            self.total_number_of_added_tasks
        )
    }
}

/// The pool's "tasks-execution monitor": shared between the dispatcher,
/// workers (free-state notification), and `wait_all_tasks_execution_finished`.
/// Workers hold an `Arc` to this, not to the pool itself — no cycle.
struct DispatcherSignal {
    flags: Monitor<DispatchFlags>,
}

struct DispatchFlags {
    woken: bool,
    all_put_for_execution: bool,
    end: bool,
}

impl DispatcherSignal {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            flags: Monitor::new(DispatchFlags {
                woken: false,
                all_put_for_execution: false,
                end: false,
            }),
        })
    }

    fn notify(&self) {
        self.flags.with(|f| f.woken = true);
        self.flags.notify_all();
    }

    fn mark_all_put_for_execution(&self) {
        self.flags.with(|f| f.all_put_for_execution = true);
        self.flags.notify_all();
    }

    fn clear_all_put_for_execution(&self) {
        self.flags.with(|f| f.all_put_for_execution = false);
    }

    fn is_all_put_for_execution(&self) -> bool {
        self.flags.with(|f| f.all_put_for_execution)
    }

    fn raise_end(&self) {
        self.flags.with(|f| f.end = true);
        self.flags.notify_all();
    }

    fn is_ended(&self) -> bool {
        self.flags.with(|f| f.end)
    }

    fn wait_woken(&self, timeout: Duration) {
        self.flags
            .wait_until(Some(timeout), |f| f.woken || f.end, |f| f.woken = false);
    }

    /// Block until `drained` holds or `timeout` elapses.
    fn wait_drained(&self, timeout: Option<Duration>, drained: impl Fn() -> bool) -> Status {
        let (status, _) = self.flags.wait_until(timeout, |_| drained(), |_| ());
        status
    }
}

fn make_scheduler(kind: SchedulerKind) -> Arc<dyn Scheduler> {
    match kind {
        SchedulerKind::Fcfs => Arc::new(FcfsScheduler::new()),
        SchedulerKind::Priority => Arc::new(PriorityScheduler::new()),
        SchedulerKind::Sjf => Arc::new(SjfScheduler::new()),
    }
}

pub struct Pool {
    id: PoolId,
    options: PoolOptions,
    central: Arc<dyn Scheduler>,
    workers: Arc<Monitor<Vec<Arc<Worker>>>>,
    signal: Arc<DispatcherSignal>,
    dispatcher_managed: Arc<ManagedThread>,
    dispatcher_thread: Mutex<Option<DetachedThread>>,
    state: Monitor<PoolState>,
    total_added: AtomicU64,
}

impl Pool {
    /// Create the pool's central scheduler, `initial_workers` workers each
    /// with their own independent scheduler of the same policy, and —
    /// unless `postpone_execution` is set — immediately start execution.
    pub fn new(options: PoolOptions) -> Arc<Self> {
        let central = make_scheduler(options.scheduler_type);
        let signal = DispatcherSignal::new();

        let mut initial = Vec::with_capacity(options.initial_workers as usize);
        for _ in 0..options.initial_workers {
            let scheduler = make_scheduler(options.scheduler_type);
            let signal_for_worker = signal.clone();
            let worker = Worker::new(scheduler, Arc::new(move || signal_for_worker.notify()));
            initial.push(worker);
        }

        let pool = Arc::new(Self {
            id: PoolId::new(),
            options,
            central,
            workers: Arc::new(Monitor::new(initial)),
            signal,
            dispatcher_managed: ManagedThread::new(),
            dispatcher_thread: Mutex::new(None),
            state: Monitor::new(PoolState::Ready),
            total_added: AtomicU64::new(0),
        });

        if !options.postpone_execution {
            pool.start_execution();
        }

        pool
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn state(&self) -> PoolState {
        self.state.with(|s| *s)
    }

    pub fn options(&self) -> PoolOptions {
        self.options
    }

    pub fn workers_size(&self) -> usize {
        self.workers.with(|ws| ws.len())
    }

    pub fn statistic(&self) -> Statistic {
        self.workers.with(|ws| {
            let mut stat = Statistic {
                current_number_of_all_workers: ws.len() as u32,
                total_number_of_added_tasks: self.total_added.load(Ordering::Relaxed),
                ..Default::default()
            };
            for w in ws.iter() {
                match w.state() {
                    WorkerState::Ready => stat.number_of_workers_in_ready_state += 1,
                    WorkerState::Running => stat.number_of_workers_in_running_state += 1,
                    WorkerState::Waiting => stat.number_of_workers_in_waiting_state += 1,
                    WorkerState::Paused => stat.number_of_workers_in_paused_state += 1,
                    WorkerState::Stopped | WorkerState::Finished => {}
                }
            }
            stat
        })
    }

    pub fn tasks_size(&self, also_from_workers: bool) -> usize {
        let central = self.central.size();
        if !also_from_workers {
            return central;
        }
        central + self.workers.with(|ws| ws.iter().map(|w| w.size()).sum::<usize>())
    }

    pub fn is_task_added(&self, task_id: TaskId) -> bool {
        self.central.is_scheduled(task_id)
    }

    // ---- Lifecycle -----------------------------------------------------

    pub fn start_execution(&self) -> Status {
        let allowed = self.state.with(|s| {
            if *s == PoolState::Ready {
                *s = PoolState::Running;
                true
            } else {
                false
            }
        });
        if !allowed {
            return Status::Error;
        }

        self.workers.with(|ws| {
            for w in ws.iter() {
                if let Err(e) = w.start(false) {
                    error!("failed to start worker {}: {e}", w.id());
                }
            }
        });
        if let Err(e) = self.spawn_dispatcher() {
            error!("failed to spawn dispatcher thread: {e}");
            self.state.with(|s| *s = PoolState::Ready);
            return Status::Error;
        }
        Status::Ok
    }

    pub fn pause_execution(&self) -> Status {
        let allowed = self.state.with(|s| {
            if *s == PoolState::Running {
                *s = PoolState::Paused;
                true
            } else {
                false
            }
        });
        if !allowed {
            return Status::Error;
        }
        self.dispatcher_managed.pause();
        self.workers.with(|ws| {
            for w in ws.iter() {
                w.pause();
            }
        });
        Status::Ok
    }

    pub fn resume_execution(&self) -> Status {
        let allowed = self.state.with(|s| {
            if *s == PoolState::Paused {
                *s = PoolState::Running;
                true
            } else {
                false
            }
        });
        if !allowed {
            return Status::Error;
        }
        self.dispatcher_managed.resume();
        self.workers.with(|ws| {
            for w in ws.iter() {
                w.resume();
            }
        });
        Status::Ok
    }

    /// Spawns the dispatcher thread. It receives only independent `Arc`
    /// handles (central scheduler, worker list, signal, managed-thread
    /// gate) — never an `Arc<Pool>` — so the pool and its dispatcher
    /// thread never form an ownership cycle (Design Note: cyclic
    /// references).
    fn spawn_dispatcher(&self) -> Result<(), PoolError> {
        let central = self.central.clone();
        let workers = self.workers.clone();
        let signal = self.signal.clone();
        let managed = self.dispatcher_managed.clone();

        let handle = std::thread::Builder::new()
            .name(format!("workpool-dispatcher-{}", self.id))
            .spawn(move || dispatcher_loop(central, workers, signal, managed))
            .map_err(PoolError::ThreadSpawnFailed)?;
        *self.dispatcher_thread.lock().unwrap() = Some(DetachedThread::new(handle));
        Ok(())
    }

    // ---- Task operations -------------------------------------------------

    pub fn add_task(&self, task: Arc<Task>) -> Status {
        let status = self.central.schedule(task);
        if status == Status::Ok {
            self.total_added.fetch_add(1, Ordering::Relaxed);
            self.signal.clear_all_put_for_execution();
            self.signal.notify();
        }
        status
    }

    pub fn add_tasks(&self, tasks: Vec<Arc<Task>>) -> Status {
        if tasks.is_empty() {
            return Status::Error;
        }
        let n = tasks.len() as u64;
        let status = self.central.schedule_many(tasks);
        if status == Status::Ok {
            self.total_added.fetch_add(n, Ordering::Relaxed);
            self.signal.clear_all_put_for_execution();
            self.signal.notify();
        }
        status
    }

    /// Distribute tasks round-robin by insertion order (task i -> worker i
    /// mod W), bypassing the central scheduler entirely. Tasks added this
    /// way are not counted by `is_task_added`.
    pub fn add_task_to_every_worker(&self, tasks: Vec<Arc<Task>>) -> Status {
        if tasks.is_empty() {
            return Status::Error;
        }
        self.workers.with(|ws| {
            if ws.is_empty() {
                return Status::Error;
            }
            let w = ws.len();
            for (i, task) in tasks.into_iter().enumerate() {
                ws[i % w].add_task(task);
            }
            Status::Ok
        })
    }

    pub fn remove_one_task(&self, task_id: TaskId) -> Option<Arc<Task>> {
        self.central.unschedule_one(task_id)
    }

    pub fn remove_all_tasks(&self, also_from_workers: bool) -> Vec<Arc<Task>> {
        let mut drained = self.central.unschedule_all();
        if also_from_workers {
            self.workers.with(|ws| {
                for w in ws.iter() {
                    drained.extend(w.remove_all_tasks());
                }
            });
        }
        drained
    }

    pub fn clear_all_tasks(&self, also_from_workers: bool) -> Status {
        let central_cleared = self.central.clear_all() == Status::Ok;
        let mut any_worker_cleared = false;
        if also_from_workers {
            self.workers.with(|ws| {
                for w in ws.iter() {
                    if w.clear_all_tasks() == Status::Ok {
                        any_worker_cleared = true;
                    }
                }
            });
        }
        if central_cleared || any_worker_cleared {
            Status::Ok
        } else {
            Status::Error
        }
    }

    pub fn wait_all_tasks_execution_finished(&self, timeout_micros: i64) -> Status {
        let timeout = micros_to_duration(timeout_micros);
        self.signal.wait_drained(timeout, || self.tasks_size(true) == 0)
    }

    // ---- Fleet scaling ---------------------------------------------------

    pub fn increase_workers(&self, n: u32) -> Status {
        let paused = self.state() == PoolState::Paused;
        self.workers.with(|ws| {
            let current = ws.len() as u32;
            if current >= self.options.max_workers {
                return Status::Error;
            }
            let to_add = n.min(self.options.max_workers - current);
            for _ in 0..to_add {
                let scheduler = make_scheduler(self.options.scheduler_type);
                let signal = self.signal.clone();
                let worker = Worker::new(scheduler, Arc::new(move || signal.notify()));
                if self.state() != PoolState::Ready {
                    if let Err(e) = worker.start(paused) {
                        error!("failed to start worker {}: {e}", worker.id());
                    }
                }
                ws.push(worker);
            }
            Status::Ok
        })
    }

    pub fn decrease_workers(&self, n: u32, reschedule: bool) -> Status {
        self.workers.with(|ws| {
            let current = ws.len() as u32;
            if current <= self.options.min_workers {
                return Status::Error;
            }
            let removable = n.min(current - self.options.min_workers) as usize;
            if removable == 0 {
                return Status::Error;
            }

            // Partition: empty workers first, non-empty after.
            let mut empty_idx: Vec<usize> = Vec::new();
            let mut nonempty_idx: Vec<usize> = Vec::new();
            for (i, w) in ws.iter().enumerate() {
                if w.size() == 0 {
                    empty_idx.push(i);
                } else {
                    nonempty_idx.push(i);
                }
            }

            let mut to_remove: Vec<usize> = Vec::with_capacity(removable);
            to_remove.extend(empty_idx.into_iter().take(removable));
            if to_remove.len() < removable {
                let remaining = removable - to_remove.len();
                to_remove.extend(nonempty_idx.into_iter().take(remaining));
            }
            to_remove.sort_unstable();

            for &idx in to_remove.iter().rev() {
                let worker = ws.remove(idx);
                if reschedule {
                    for task in worker.remove_all_tasks() {
                        self.central.schedule(task);
                    }
                }
                worker.stop();
            }
            Status::Ok
        })
    }

    fn select_available_worker(workers: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        if let Some(w) = workers
            .iter()
            .find(|w| w.size() == 0 && w.state() == WorkerState::Waiting)
        {
            return Some(w.clone());
        }
        let mut best: Option<&Arc<Worker>> = None;
        let mut best_size = usize::MAX;
        for w in workers.iter() {
            let size = w.size();
            if size < best_size {
                best_size = size;
                best = Some(w);
            }
        }
        best.cloned()
    }

    fn load_balance(workers: &[Arc<Worker>]) {
        if workers.len() < 2 {
            return;
        }
        let mut lo_idx = 0usize;
        let mut hi_idx = 0usize;
        let mut lo = usize::MAX;
        let mut hi = 0usize;
        for (i, w) in workers.iter().enumerate() {
            let size = w.size();
            if size < lo {
                lo = size;
                lo_idx = i;
            }
            if size > hi {
                hi = size;
                hi_idx = i;
            }
        }
        if hi > lo + 1 {
            if let Some(task) = workers[hi_idx].steal_task() {
                workers[lo_idx].add_task(task);
            }
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if self.options.wait_all_tasks_execution_finished {
            let _ = self.wait_all_tasks_execution_finished(-1);
        }
        self.signal.raise_end();
        self.dispatcher_managed.stop();
        if self.dispatcher_thread.lock().unwrap().is_some() {
            self.dispatcher_managed.wait_finished();
        }
        self.workers.with(|ws| {
            for w in ws.iter() {
                w.stop();
            }
            for w in ws.iter() {
                w.wait_finished();
            }
        });
        debug!("pool {} shutting down", self.id);
    }
}

/// Standalone dispatcher loop, run on its own thread. Takes only the
/// independent `Arc` handles it needs — never the `Pool` itself, so there
/// is no ownership cycle between the pool and its dispatcher thread.
fn dispatcher_loop(
    central: Arc<dyn Scheduler>,
    workers: Arc<Monitor<Vec<Arc<Worker>>>>,
    signal: Arc<DispatcherSignal>,
    managed: Arc<ManagedThread>,
) {
    let mut needs_new = true;
    let mut task_in_hand: Option<Arc<Task>> = None;

    loop {
        if !managed.run_iteration() {
            break;
        }
        if signal.is_ended() {
            break;
        }

        if needs_new && task_in_hand.is_none() {
            task_in_hand = central.get_task_for_execution();
            if task_in_hand.is_none() {
                signal.mark_all_put_for_execution();
            }
            needs_new = false;
        }

        if signal.is_ended() {
            break;
        }

        if let Some(task) = task_in_hand.take() {
            let selected = workers.with(|ws| Pool::select_available_worker(ws));
            match selected {
                Some(worker) => {
                    worker.add_task(task);
                    needs_new = true;
                }
                None => {
                    warn!("no available worker; holding task for next tick");
                    task_in_hand = Some(task);
                }
            }
        } else if central.size() != 0 {
            // New tasks may have arrived since the check above (Design
            // Note (b) in the source: under concurrent clearAll this can
            // briefly spin; it moves on to the next iteration's wait).
            needs_new = true;
            continue;
        } else {
            signal.wait_woken(DISPATCH_IDLE_TIMEOUT);
            // Only rebalance once every task seen so far has actually been
            // handed to a worker: load-balancing mid-dispatch would steal
            // from a worker that is about to receive more work anyway.
            if signal.is_all_put_for_execution() {
                workers.with(|ws| Pool::load_balance(ws));
            }
            needs_new = true;
        }
    }
    managed.mark_finished();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PoolOptionsBuilder;

    #[test]
    fn statistic_display_matches_field_order() {
        let stat = Statistic {
            current_number_of_all_workers: 4,
            number_of_workers_in_ready_state: 1,
            number_of_workers_in_running_state: 2,
            number_of_workers_in_waiting_state: 1,
            number_of_workers_in_paused_state: 0,
            total_number_of_added_tasks: 10,
        };
        let text = stat.to_string();
        assert!(text.contains("Current number of all workers : 4"));
        assert!(text.contains("Total number of added tasks : 10"));
    }

    #[test]
    fn lifecycle_transitions_reject_out_of_order_calls() {
        let pool = Pool::new(
            PoolOptionsBuilder::new()
                .initial_workers(1)
                .postpone_execution(true)
                .build(),
        );
        assert_eq!(pool.state(), PoolState::Ready);
        // Can't pause before starting.
        assert_eq!(pool.pause_execution(), Status::Error);
        assert_eq!(pool.start_execution(), Status::Ok);
        // Can't start twice.
        assert_eq!(pool.start_execution(), Status::Error);
        assert_eq!(pool.pause_execution(), Status::Ok);
        assert_eq!(pool.state(), PoolState::Paused);
        assert_eq!(pool.resume_execution(), Status::Ok);
        assert_eq!(pool.state(), PoolState::Running);
    }

    #[test]
    fn decrease_workers_rejects_below_min() {
        let pool = Pool::new(
            PoolOptionsBuilder::new()
                .initial_workers(2)
                .min_workers(2)
                .postpone_execution(true)
                .build(),
        );
        assert_eq!(pool.decrease_workers(1, false), Status::Error);
    }

    #[test]
    fn increase_workers_respects_max() {
        let pool = Pool::new(
            PoolOptionsBuilder::new()
                .initial_workers(2)
                .max_workers(2)
                .postpone_execution(true)
                .build(),
        );
        assert_eq!(pool.increase_workers(1), Status::Error);
        assert_eq!(pool.workers_size(), 2);
    }
}
