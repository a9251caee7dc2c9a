// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pool configuration: `PoolOptions` plus a builder that clamps every
//! invariant on construction, matching `ThreadPoolOptions`/
//! `ThreadPoolOptionsBuilder` in the source.

use std::str::FromStr;

/// Selects which scheduling policy the pool's central scheduler and every
/// worker's private scheduler use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerKind {
    #[default]
    Fcfs,
    Priority,
    Sjf,
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerKind::Fcfs => "FCFS",
            SchedulerKind::Priority => "PRIORITY",
            SchedulerKind::Sjf => "SJF",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SchedulerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FCFS" => Ok(SchedulerKind::Fcfs),
            "PRIORITY" => Ok(SchedulerKind::Priority),
            "SJF" => Ok(SchedulerKind::Sjf),
            _ => Err(()),
        }
    }
}

/// Pool configuration. Construct via [`PoolOptionsBuilder`]; every
/// invariant is enforced there, so there is nothing left to validate once
/// an instance exists.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub scheduler_type: SchedulerKind,
    pub initial_workers: u32,
    pub min_workers: u32,
    pub max_workers: u32,
    pub postpone_execution: bool,
    pub wait_all_tasks_execution_finished: bool,
}

impl std::fmt::Display for PoolOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scheduler type: {}\ninitial workers: {}\nmin workers: {}\nmax workers: {}\n\
             postpone execution: {}\nwait all tasks execution finished: {}",
            self.scheduler_type,
            self.initial_workers,
            self.min_workers,
            self.max_workers,
            self.postpone_execution,
            self.wait_all_tasks_execution_finished
        )
    }
}

fn default_hardware_concurrency() -> u32 {
    std::thread::available_parallelism()
        .map(|p| p.get() as u32)
        .unwrap_or(1)
}

/// Builds a [`PoolOptions`], clamping every cross-field invariant so
/// `build()` cannot fail.
pub struct PoolOptionsBuilder {
    scheduler_type: SchedulerKind,
    initial_workers: Option<u32>,
    min_workers: u32,
    max_workers: u32,
    postpone_execution: bool,
    wait_all_tasks_execution_finished: bool,
}

impl PoolOptionsBuilder {
    pub fn new() -> Self {
        Self {
            scheduler_type: SchedulerKind::default(),
            initial_workers: None,
            min_workers: 1,
            max_workers: u32::MAX,
            postpone_execution: false,
            wait_all_tasks_execution_finished: false,
        }
    }

    pub fn scheduler_type(mut self, kind: SchedulerKind) -> Self {
        self.scheduler_type = kind;
        self
    }

    pub fn initial_workers(mut self, n: u32) -> Self {
        self.initial_workers = Some(n);
        self
    }

    /// Ignored if greater than the (eventual) initial worker count.
    pub fn min_workers(mut self, n: u32) -> Self {
        self.min_workers = n;
        self
    }

    /// Ignored if less than the (eventual) initial worker count.
    pub fn max_workers(mut self, n: u32) -> Self {
        self.max_workers = n;
        self
    }

    pub fn postpone_execution(mut self, v: bool) -> Self {
        self.postpone_execution = v;
        self
    }

    pub fn wait_all_tasks_execution_finished(mut self, v: bool) -> Self {
        self.wait_all_tasks_execution_finished = v;
        self
    }

    pub fn build(self) -> PoolOptions {
        let initial_workers = self.initial_workers.unwrap_or_else(default_hardware_concurrency).max(1);

        let min_workers = if self.min_workers > initial_workers {
            1
        } else {
            self.min_workers.max(1)
        };
        let max_workers = if self.max_workers < initial_workers {
            initial_workers
        } else {
            self.max_workers
        };
        let initial_workers = initial_workers.clamp(min_workers, max_workers);

        PoolOptions {
            scheduler_type: self.scheduler_type,
            initial_workers,
            min_workers,
            max_workers,
            postpone_execution: self.postpone_execution,
            wait_all_tasks_execution_finished: self.wait_all_tasks_execution_finished,
        }
    }
}

impl Default for PoolOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_greater_than_initial_is_clamped_down() {
        let opts = PoolOptionsBuilder::new()
            .initial_workers(2)
            .min_workers(5)
            .build();
        assert!(opts.min_workers <= opts.initial_workers);
    }

    #[test]
    fn max_less_than_initial_is_clamped_up() {
        let opts = PoolOptionsBuilder::new()
            .initial_workers(8)
            .max_workers(2)
            .build();
        assert!(opts.max_workers >= opts.initial_workers);
    }

    #[test]
    fn bounds_always_contain_initial() {
        let opts = PoolOptionsBuilder::new()
            .initial_workers(4)
            .min_workers(1)
            .max_workers(10)
            .build();
        assert!(opts.min_workers <= opts.initial_workers);
        assert!(opts.initial_workers <= opts.max_workers);
    }

    #[test]
    fn scheduler_kind_round_trips_through_string() {
        for kind in [SchedulerKind::Fcfs, SchedulerKind::Priority, SchedulerKind::Sjf] {
            let s = kind.to_string();
            assert_eq!(SchedulerKind::from_str(&s), Ok(kind));
        }
    }
}
