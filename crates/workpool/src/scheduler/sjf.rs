// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shortest-Job-First scheduling policy: structurally identical to
//! Priority, keyed by burst time instead. `Undefined` is normalized to
//! `Long` for bucket selection at schedule time — the task's own burst-time
//! tag is never mutated, only the bucket choice is affected.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use super::{Scheduler, Statistics};
use crate::id::{SchedulerId, TaskId};
use crate::status::Status;
use crate::sync::Monitor;
use crate::task::{BurstTime, Tag, Task};

/// Scan order for dequeue: shortest to longest.
const DEQUEUE_ORDER: [BurstTime; 3] = [BurstTime::Short, BurstTime::Medium, BurstTime::Long];
/// Scan order for steal: longest to shortest.
const STEAL_ORDER: [BurstTime; 3] = [BurstTime::Long, BurstTime::Medium, BurstTime::Short];

struct Buckets {
    short: VecDeque<Arc<Task>>,
    medium: VecDeque<Arc<Task>>,
    long: VecDeque<Arc<Task>>,
}

impl Buckets {
    fn bucket_mut(&mut self, b: BurstTime) -> &mut VecDeque<Arc<Task>> {
        match b {
            BurstTime::Short => &mut self.short,
            BurstTime::Medium => &mut self.medium,
            // Undefined never reaches here: normalized before bucket choice.
            BurstTime::Long | BurstTime::Undefined => &mut self.long,
        }
    }

    fn len(&self) -> usize {
        self.short.len() + self.medium.len() + self.long.len()
    }

    fn contains(&self, task_id: TaskId) -> bool {
        [&self.short, &self.medium, &self.long]
            .iter()
            .any(|b| b.iter().any(|t| t.id() == task_id))
    }
}

struct State {
    buckets: Buckets,
    stats: Statistics,
}

pub struct SjfScheduler {
    id: SchedulerId,
    monitor: Monitor<State>,
}

impl SjfScheduler {
    pub fn new() -> Self {
        Self {
            id: SchedulerId::new(),
            monitor: Monitor::new(State {
                buckets: Buckets {
                    short: VecDeque::new(),
                    medium: VecDeque::new(),
                    long: VecDeque::new(),
                },
                stats: Statistics::default(),
            }),
        }
    }

    fn burst_time_of(task: &Task) -> Option<BurstTime> {
        match task.tag() {
            Tag::BurstTime(b) => Some(b),
            _ => None,
        }
    }
}

impl Default for SjfScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SjfScheduler {
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
        let Some(burst) = Self::burst_time_of(&task) else {
            warn!("rejecting task {} without a burst-time tag", task.id());
            return Status::Error;
        };
        // Undefined is the conservative, worst-case assumption for a
        // shortest-first policy: treat it as Long for bucket selection
        // only.
        let bucket_key = if burst == BurstTime::Undefined {
            BurstTime::Long
        } else {
            burst
        };
        self.monitor.with(|s| {
            s.buckets.bucket_mut(bucket_key).push_back(task);
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
                match Self::burst_time_of(&task) {
                    Some(burst) => {
                        let bucket_key = if burst == BurstTime::Undefined {
                            BurstTime::Long
                        } else {
                            burst
                        };
                        s.buckets.bucket_mut(bucket_key).push_back(task);
                        accepted += 1;
                    }
                    None => warn!("skipping task {} without a burst-time tag", task.id()),
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
            for b in DEQUEUE_ORDER {
                if let Some(task) = s.buckets.bucket_mut(b).pop_front() {
                    s.stats.dequeued_for_execution += 1;
                    return Some(task);
                }
            }
            None
        })
    }

    fn steal(&self) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            for b in STEAL_ORDER {
                if let Some(task) = s.buckets.bucket_mut(b).pop_back() {
                    s.stats.stolen += 1;
                    return Some(task);
                }
            }
            None
        })
    }

    fn unschedule_one(&self, task_id: TaskId) -> Option<Arc<Task>> {
        self.monitor.with(|s| {
            for b in DEQUEUE_ORDER {
                let bucket = s.buckets.bucket_mut(b);
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
            for b in DEQUEUE_ORDER {
                drained.extend(s.buckets.bucket_mut(b).drain(..));
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
