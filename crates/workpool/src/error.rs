// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Internal error taxonomy for situations that are programmer errors rather
//! than expected runtime outcomes (those stay encoded in [`crate::Status`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawnFailed(#[source] std::io::Error),
}
