// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! First-Come-First-Served scheduling policy: a single arrival-ordered
//! queue. `get_task_for_execution` pops the front, `steal` pops the back.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use super::{Scheduler, Statistics};
use crate::id::{SchedulerId, TaskId};
use crate::status::Status;
use crate::sync::Monitor;
use crate::task::Task;

struct State {
    queue: VecDeque<Arc<Task>>,
    stats: Statistics,
}

pub struct FcfsScheduler {
    id: SchedulerId,
    monitor: Monitor<State>,
}

impl FcfsScheduler {
    pub fn new() -> Self {
        Self {
            id: SchedulerId::new(),
            monitor: Monitor::new(State {
                queue: VecDeque::new(),
                stats: Statistics::default(),
            }),
        }
    }
}

impl Default for FcfsScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for FcfsScheduler {
    fn id(&self) -> SchedulerId {
        self.id
    }

    fn size(&self) -> usize {
        self.monitor.with(|s| s.queue.len())
    }

    fn is_scheduled(&self, task_id: TaskId) -> bool {
        self.monitor.with(|s| s.queue.iter().any(|t| t.id() == task_id))
    }

    fn statistics(&self) -> Statistics {
        self.monitor.with(|s| s.stats)
    }

    fn schedule(&self, task: Arc<Task>) -> Status {
        self.monitor.with(|s| {
            s.queue.push_back(task);
            s.stats.scheduled += 1;
        });
        self.monitor.notify_all();
        Status::Ok
    }

    fn schedule_many(&self, tasks: Vec<Arc<Task>>) -> Status {
        if tasks.is_empty() {
            return Status::Error;
        }
        self.monitor.with(|s| {
            for task in tasks {
                s.queue.push_back(task);
                s.stats.scheduled += 1;
            }
        });
        self.monitor.notify_all();
        Status::Ok
    }

    fn get_task_for_execution(&self) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            let task = s.queue.pop_front();
            if task.is_some() {
                s.stats.dequeued_for_execution += 1;
            }
            task
        })
    }

    fn steal(&self) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            let task = s.queue.pop_back();
            if task.is_some() {
                s.stats.stolen += 1;
            }
            task
        })
    }

    fn unschedule_one(&self, task_id: TaskId) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            let idx = s.queue.iter().position(|t| t.id() == task_id)?;
            let task = s.queue.remove(idx);
            if task.is_some() {
                s.stats.unscheduled += 1;
            }
            task
        })
    }

    fn unschedule_all(&self) -> Vec<Arc<Task>> {
        self.monitor.with(|s| {
            let drained: Vec<_> = s.queue.drain(..).collect();
            s.stats.unscheduled += drained.len() as u64;
            drained
        })
    }

    fn clear_all(&self) -> Status {
        let drained = self.unschedule_all();
        if drained.is_empty() {
            Status::Error
        } else {
            warn!("cleared {} tasks from scheduler {}", drained.len(), self.id);
            Status::Ok
        }
    }

    fn wait_task_for_execution(&self, timeout: Option<Duration>) -> Status {
        let (status, _) = self.monitor.wait_until(timeout, |s| !s.queue.is_empty(), |_| ());
        status
    }

    fn notify_task_for_execution(&self) {
        self.monitor.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::contract_tests;
    use crate::task::Task;

    #[test]
    fn fcfs_orders_by_arrival() {
        let s = FcfsScheduler::new();
        let t1 = Task::new();
        let t2 = Task::new();
        let t3 = Task::new();
        let (id1, id2, id3) = (t1.id(), t2.id(), t3.id());
        s.schedule(t1);
        s.schedule(t2);
        s.schedule(t3);

        assert_eq!(s.get_task_for_execution().unwrap().id(), id1);
        assert_eq!(s.get_task_for_execution().unwrap().id(), id2);
        assert_eq!(s.get_task_for_execution().unwrap().id(), id3);
    }

    #[test]
    fn fcfs_steal_pops_from_back() {
        let s = FcfsScheduler::new();
        let t1 = Task::new();
        let t2 = Task::new();
        let id2 = t2.id();
        s.schedule(t1);
        s.schedule(t2);
        assert_eq!(s.steal().unwrap().id(), id2);
    }

    #[test]
    fn fcfs_schedule_unschedule_round_trip() {
        let s = FcfsScheduler::new();
        contract_tests::schedule_then_unschedule_one_empties(&s, Task::new);
    }

    #[test]
    fn fcfs_schedule_many_rejects_empty() {
        let s = FcfsScheduler::new();
        assert_eq!(s.schedule_many(Vec::new()), Status::Error);
    }

    #[test]
    fn fcfs_wait_task_for_execution_times_out_on_empty() {
        let s = FcfsScheduler::new();
        let status = s.wait_task_for_execution(Some(Duration::from_millis(20)));
        assert_eq!(status, Status::Timeout);
    }

    #[test]
    fn fcfs_clear_all_errors_when_empty() {
        let s = FcfsScheduler::new();
        assert_eq!(s.clear_all(), Status::Error);
    }
}
