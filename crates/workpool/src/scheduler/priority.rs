// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Priority scheduling policy: one arrival-ordered bucket per priority
//! level. `get_task_for_execution` scans High to Low; `steal` scans Low to
//! High. Within a bucket, strict FIFO.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use super::{Scheduler, Statistics};
use crate::id::{SchedulerId, TaskId};
use crate::status::Status;
use crate::sync::Monitor;
use crate::task::{Priority, Tag, Task};

/// Scan order for dequeue: High, Normal, Low.
const DEQUEUE_ORDER: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];
/// Scan order for steal: Low, Normal, High.
const STEAL_ORDER: [Priority; 3] = [Priority::Low, Priority::Normal, Priority::High];

struct Buckets {
    high: VecDeque<Arc<Task>>,
    normal: VecDeque<Arc<Task>>,
    low: VecDeque<Arc<Task>>,
}

impl Buckets {
    fn bucket_mut(&mut self, p: Priority) -> &mut VecDeque<Arc<Task>> {
        match p {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    fn contains(&self, task_id: TaskId) -> bool {
        [&self.high, &self.normal, &self.low]
            .iter()
            .any(|b| b.iter().any(|t| t.id() == task_id))
    }
}

struct State {
    buckets: Buckets,
    stats: Statistics,
}

pub struct PriorityScheduler {
    id: SchedulerId,
    monitor: Monitor<State>,
}

impl PriorityScheduler {
    pub fn new() -> Self {
        Self {
            id: SchedulerId::new(),
            monitor: Monitor::new(State {
                buckets: Buckets {
                    high: VecDeque::new(),
                    normal: VecDeque::new(),
                    low: VecDeque::new(),
                },
                stats: Statistics::default(),
            }),
        }
    }

    fn priority_of(task: &Task) -> Option<Priority> {
        match task.tag() {
            Tag::Priority(p) => Some(p),
            _ => None,
        }
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for PriorityScheduler {
    fn id(&self) -> SchedulerId {
        self.id
    }

    fn size(&self) -> usize {
        self.monitor.with(|s| s.buckets.len())
    }

    fn is_scheduled(&self, task_id: TaskId) -> bool {
        self.monitor.with(|s| s.buckets.contains(task_id))
    }

    fn statistics(&self) -> Statistics {
        self.monitor.with(|s| s.stats)
    }

    fn schedule(&self, task: Arc<Task>) -> Status {
        let Some(priority) = Self::priority_of(&task) else {
            warn!("rejecting task {} without a priority tag", task.id());
            return Status::Error;
        };
        self.monitor.with(|s| {
            s.buckets.bucket_mut(priority).push_back(task);
            s.stats.scheduled += 1;
        });
        self.monitor.notify_all();
        Status::Ok
    }

    fn schedule_many(&self, tasks: Vec<Arc<Task>>) -> Status {
        if tasks.is_empty() {
            return Status::Error;
        }
        let mut accepted = 0u64;
        self.monitor.with(|s| {
            for task in tasks {
                match Self::priority_of(&task) {
                    Some(priority) => {
                        s.buckets.bucket_mut(priority).push_back(task);
                        accepted += 1;
                    }
                    None => warn!("skipping task {} without a priority tag", task.id()),
                }
            }
            s.stats.scheduled += accepted;
        });
        if accepted == 0 {
            Status::Error
        } else {
            self.monitor.notify_all();
            Status::Ok
        }
    }

    fn get_task_for_execution(&self) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            for p in DEQUEUE_ORDER {
                if let Some(task) = s.buckets.bucket_mut(p).pop_front() {
                    s.stats.dequeued_for_execution += 1;
                    return Some(task);
                }
            }
            None
        })
    }

    fn steal(&self) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            for p in STEAL_ORDER {
                if let Some(task) = s.buckets.bucket_mut(p).pop_back() {
                    s.stats.stolen += 1;
                    return Some(task);
                }
            }
            None
        })
    }

    fn unschedule_one(&self, task_id: TaskId) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            for p in DEQUEUE_ORDER {
                let bucket = s.buckets.bucket_mut(p);
                if let Some(idx) = bucket.iter().position(|t| t.id() == task_id) {
                    let task = bucket.remove(idx);
                    s.stats.unscheduled += 1;
                    return task;
                }
            }
            None
        })
    }

    fn unschedule_all(&self) -> Vec<Arc<Task>> {
        self.monitor.with(|s| {
            let mut drained = Vec::new();
            for p in DEQUEUE_ORDER {
                drained.extend(s.buckets.bucket_mut(p).drain(..));
            }
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
        let (status, _) = self
            .monitor
            .wait_until(timeout, |s| s.buckets.len() != 0, |_| ());
        status
    }

    fn notify_task_for_execution(&self) {
        self.monitor.notify_all();
    }
}
