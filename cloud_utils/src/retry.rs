//! Bounded retry of transfers.

use crate::errors::CloudError;
use crate::store::TransferStatus;
use log::{error, warn};
use std::fmt::{self, Display, Formatter};
use std::thread;
use std::time::Duration;

/// Which transfer an attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    /// Copying inputs or references onto the instance.
    StageIn,
    /// Copying results off the instance.
    StageOut,
}

impl Display for TransferOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferOp::StageIn => "stage-in",
            TransferOp::StageOut => "stage-out",
        })
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The transfer completed.
    Success,
    /// The transfer failed, or failed fatally.
    Failure,
}

/// Record of one transfer attempt, kept for the job report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAttempt {
    /// The transfer being attempted.
    pub operation: TransferOp,
    /// 1-based.
    pub attempt_number: u32,
    /// How it ended.
    pub outcome: AttemptOutcome,
}

/// Retry a failing transfer up to `max_attempts` times, sleeping `backoff` in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` attempts with no pause in between.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    /// A single attempt.
    pub fn once() -> Self {
        RetryPolicy::immediate(1)
    }

    /// Run `attempt` until it succeeds, fails fatally, or the attempts run out. Every
    /// attempt is appended to `log`. Returns the status of the last attempt.
    pub fn run<F>(
        &self,
        operation: TransferOp,
        log: &mut Vec<TransferAttempt>,
        mut attempt: F,
    ) -> Result<TransferStatus, CloudError>
    where
        F: FnMut() -> Result<TransferStatus, CloudError>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt_number = 1;
        loop {
            let result = attempt();
            let outcome = match &result {
                Ok(TransferStatus::Success) => AttemptOutcome::Success,
                _ => AttemptOutcome::Failure,
            };
            log.push(TransferAttempt {
                operation,
                attempt_number,
                outcome,
            });

            let status = result?;
            if status.is_success() {
                return Ok(status);
            }
            if attempt_number >= max_attempts {
                error!("{operation} {status} on attempt {attempt_number} of {max_attempts}, giving up");
                return Ok(status);
            }
            warn!("{operation} {status} on attempt {attempt_number} of {max_attempts}, retrying");
            if !self.backoff.is_zero() {
                thread::sleep(self.backoff);
            }
            attempt_number += 1;
        }
    }
}
