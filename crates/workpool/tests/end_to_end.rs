// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end tests that drive a full `Pool` (dispatcher + worker fleet)
//! rather than individual components in isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use workpool::{Pool, PoolOptionsBuilder, Priority, SchedulerKind, Task};

fn poll_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn fcfs_pool_dispatches_tasks_in_arrival_order() {
    let pool = Pool::new(
        PoolOptionsBuilder::new()
            .scheduler_type(SchedulerKind::Fcfs)
            .initial_workers(1)
            .build(),
    );

    let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    for i in 0..5u32 {
        let order = order.clone();
        let task = Task::new();
        task.submit(move || order.lock().unwrap().push(i));
        pool.add_task(task);
    }

    poll_until(|| order.lock().unwrap().len() == 5, Duration::from_secs(2));
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn priority_pool_runs_high_priority_work_first() {
    // A single worker makes dequeue order from the central scheduler
    // directly observable in execution order.
    let pool = Pool::new(
        PoolOptionsBuilder::new()
            .scheduler_type(SchedulerKind::Priority)
            .initial_workers(1)
            .postpone_execution(true)
            .build(),
    );

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let make = |label: &'static str, priority: Priority, order: Arc<Mutex<Vec<&'static str>>>| {
        let task = Task::with_priority(priority);
        task.submit(move || order.lock().unwrap().push(label));
        task
    };

    pool.add_task(make("low", Priority::Low, order.clone()));
    pool.add_task(make("high", Priority::High, order.clone()));
    pool.add_task(make("normal", Priority::Normal, order.clone()));

    pool.start_execution();

    poll_until(|| order.lock().unwrap().len() == 3, Duration::from_secs(2));
    assert_eq!(*order.lock().unwrap(), vec!["high", "normal", "low"]);
}

#[test]
fn sjf_pool_normalizes_undefined_burst_time_to_longest() {
    use workpool::BurstTime;

    let pool = Pool::new(
        PoolOptionsBuilder::new()
            .scheduler_type(SchedulerKind::Sjf)
            .initial_workers(1)
            .postpone_execution(true)
            .build(),
    );

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let make = |label: &'static str, burst: BurstTime, order: Arc<Mutex<Vec<&'static str>>>| {
        let task = Task::with_burst_time(burst);
        task.submit(move || order.lock().unwrap().push(label));
        task
    };

    pool.add_task(make("undefined", BurstTime::Undefined, order.clone()));
    pool.add_task(make("short", BurstTime::Short, order.clone()));
    pool.add_task(make("medium", BurstTime::Medium, order.clone()));

    pool.start_execution();

    poll_until(|| order.lock().unwrap().len() == 3, Duration::from_secs(2));
    assert_eq!(*order.lock().unwrap(), vec!["short", "medium", "undefined"]);
}

#[test]
fn idle_workers_steal_work_via_load_balancing() {
    // The dispatcher's placement and its load-balance pass between
    // submissions should together keep the fleet draining even when tasks
    // arrive in one large batch.
    let pool = Pool::new(
        PoolOptionsBuilder::new()
            .scheduler_type(SchedulerKind::Fcfs)
            .initial_workers(4)
            .build(),
    );

    let completed = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let completed = completed.clone();
            let task = Task::new();
            task.submit(move || {
                std::thread::sleep(Duration::from_millis(5));
                completed.fetch_add(1, Ordering::Relaxed);
            });
            task
        })
        .collect();

    pool.add_tasks(tasks);

    let drained = poll_until(|| completed.load(Ordering::Relaxed) == 20, Duration::from_secs(5));
    assert!(drained, "expected all 20 tasks to complete");
}

#[test]
fn shrinking_the_fleet_reschedules_pending_work() {
    let pool = Pool::new(
        PoolOptionsBuilder::new()
            .scheduler_type(SchedulerKind::Fcfs)
            .initial_workers(3)
            .min_workers(1)
            .postpone_execution(true)
            .build(),
    );

    let completed = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let completed = completed.clone();
        let task = Task::new();
        task.submit(move || {
            completed.fetch_add(1, Ordering::Relaxed);
        });
        pool.add_task(task);
    }

    // Shrink before starting execution so tasks are still sitting on the
    // central scheduler, exercising decrease_workers' reschedule path
    // rather than draining a worker mid-flight.
    assert_eq!(pool.decrease_workers(2, true), workpool::Status::Ok);
    assert_eq!(pool.workers_size(), 1);

    pool.start_execution();

    let drained = poll_until(|| completed.load(Ordering::Relaxed) == 10, Duration::from_secs(2));
    assert!(drained, "expected all tasks to survive the fleet shrink");
}

#[test]
fn pausing_the_pool_halts_execution_until_resumed() {
    let pool = Pool::new(
        PoolOptionsBuilder::new()
            .scheduler_type(SchedulerKind::Fcfs)
            .initial_workers(2)
            .build(),
    );

    let completed = Arc::new(AtomicUsize::new(0));
    assert_eq!(pool.pause_execution(), workpool::Status::Ok);

    for _ in 0..5 {
        let completed = completed.clone();
        let task = Task::new();
        task.submit(move || {
            completed.fetch_add(1, Ordering::Relaxed);
        });
        pool.add_task(task);
    }

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(completed.load(Ordering::Relaxed), 0, "no work should run while paused");

    assert_eq!(pool.resume_execution(), workpool::Status::Ok);
    let drained = poll_until(|| completed.load(Ordering::Relaxed) == 5, Duration::from_secs(2));
    assert!(drained, "expected work to resume once unpaused");
}

#[test]
fn wait_all_tasks_execution_finished_blocks_until_drained() {
    let pool = Pool::new(
        PoolOptionsBuilder::new()
            .scheduler_type(SchedulerKind::Fcfs)
            .initial_workers(2)
            .build(),
    );

    for _ in 0..8 {
        let task = Task::new();
        task.submit(|| std::thread::sleep(Duration::from_millis(10)));
        pool.add_task(task);
    }

    assert_eq!(pool.wait_all_tasks_execution_finished(-1), workpool::Status::Ok);
    assert_eq!(pool.tasks_size(true), 0);
}
