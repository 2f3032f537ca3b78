// src/exit.rs
//! Process exit codes for `sanitizer-reports`.
//!
//! Build tooling keys off these, so the values are stable.

use std::process::Termination;

use crate::aggregator::Aggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReportExit {
    /// No sanitizer report was found.
    Success = 0,
    /// Generic error (I/O, config, rendering).
    Error = 1,
    /// Bad command line or unreadable input.
    InvalidInput = 2,
    /// At least one sanitizer report was found.
    ViolationsFound = 3,
}

impl ReportExit {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn for_aggregate(aggregate: &Aggregate) -> Self {
        if aggregate.has_violations() {
            Self::ViolationsFound
        } else {
            Self::Success
        }
    }

    pub fn exit(self) -> ! {
        std::process::exit(self.code())
    }
}

impl Termination for ReportExit {
    fn report(self) -> std::process::ExitCode {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        std::process::ExitCode::from(self.code() as u8)
    }
}
