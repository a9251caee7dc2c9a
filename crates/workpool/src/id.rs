// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Id generation (Design Note: global mutable state). Each id kind keeps
//! its own independent counter, mirroring the source's per-kind function-
//! local statics rather than sharing one process-wide sequence.

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            pub(crate) fn new() -> Self {
                use std::sync::atomic::{AtomicU64, Ordering};
                static NEXT_ID: AtomicU64 = AtomicU64::new(1);
                Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
            }

            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(TaskId);
id_type!(SchedulerId);
id_type!(WorkerId);
id_type!(PoolId);
