// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Uniform result code returned by (almost) every public operation.

/// Outcome of an operation. Getters that return domain values or optional
/// tasks are the only exception to "every public operation returns one of
/// these".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    Canceled,
    Timeout,
    Unimplemented,
    Undefined,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Ok => "Ok",
            Status::Error => "Error",
            Status::Canceled => "Canceled",
            Status::Timeout => "Timeout",
            Status::Unimplemented => "Unimplemented",
            Status::Undefined => "Undefined",
        };
        write!(f, "{s}")
    }
}
