// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shared synchronization primitives: Monitor (mutex + condvar) and Timeout.

mod monitor;
mod timeout;

pub(crate) use monitor::Monitor;
pub(crate) use timeout::Timeout;

/// Convert a `-1 = infinite` microsecond timeout (as used across the public
/// API) into the `Option<Duration>` the sync primitives take.
pub(crate) fn micros_to_duration(timeout_micros: i64) -> Option<std::time::Duration> {
    if timeout_micros < 0 {
        None
    } else {
        Some(std::time::Duration::from_micros(timeout_micros as u64))
    }
}
