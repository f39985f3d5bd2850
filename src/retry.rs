use crate::error::{ErrorCode, OtsError};
use crate::protocol::Action;
use rand::Rng;
use std::time::{Duration, Instant};

/// How an error code relates to retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCategory {
    /// Never retry, the outcome will not change (or already may have
    /// happened, for writes).
    Unretriable,
    /// Safe to retry for every action.
    Retriable,
    /// Safe to retry only when the action is idempotent.
    Depends,
}

/// Fixed classification of the error-code table.
pub fn classify(code: ErrorCode) -> RetryCategory {
    match code {
        ErrorCode::OtsRowOperationConflict
        | ErrorCode::OtsNotEnoughCapacityUnit
        | ErrorCode::OtsTableNotReady
        | ErrorCode::OtsPartitionUnavailable
        | ErrorCode::OtsServerBusy
        | ErrorCode::NoAvailableConnection => RetryCategory::Retriable,
        ErrorCode::OtsQuotaExhausted | ErrorCode::OtsRequestTimeout => RetryCategory::Depends,
        _ => RetryCategory::Unretriable,
    }
}

/// Whether `(action, error)` may be retried at all, ignoring deadlines.
pub fn retriable(action: Action, error: &OtsError) -> bool {
    match classify(error.code) {
        RetryCategory::Retriable => true,
        RetryCategory::Unretriable => false,
        RetryCategory::Depends => action.idempotent(),
    }
}

/// Per-call retry decision maker.
///
/// The client holds a template; each call clones its own instance, so the
/// retry counter and the deadline belong to exactly one logical call.
pub trait RetryStrategy: Send + Sync {
    fn clone_for_call(&self) -> Box<dyn RetryStrategy>;

    /// Retries performed so far on this call; monotonically increasing.
    fn retries(&self) -> i64;

    fn should_retry(&self, action: Action, error: &OtsError) -> bool;

    /// The pause before the next attempt, or `None` when the strategy is
    /// done with this call.
    fn next_pause(&mut self) -> Option<Duration>;
}

impl Clone for Box<dyn RetryStrategy> {
    fn clone(&self) -> Self {
        self.clone_for_call()
    }
}

const BASE_PAUSE: Duration = Duration::from_millis(100);
const MAX_PAUSE: Duration = Duration::from_secs(2);
const MAX_JITTER: f64 = 0.25;

/// Exponential backoff bounded by a per-call deadline.
///
/// Pause `k` is `min(2 s, 100 ms * 2^k)` stretched by a uniform jitter in
/// `[0, 0.25]`. Once the next pause would overrun the remaining deadline the
/// strategy turns terminal and the call fails with the last observed error.
pub struct DeadlineRetryStrategy {
    deadline: Duration,
    expiry: Instant,
    /// Unspent pause budget; cumulative pauses never exceed the deadline.
    budget: Duration,
    retries: i64,
}

impl DeadlineRetryStrategy {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            expiry: Instant::now() + deadline,
            budget: deadline,
            retries: 0,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl RetryStrategy for DeadlineRetryStrategy {
    fn clone_for_call(&self) -> Box<dyn RetryStrategy> {
        Box::new(DeadlineRetryStrategy::new(self.deadline))
    }

    fn retries(&self) -> i64 {
        self.retries
    }

    fn should_retry(&self, action: Action, error: &OtsError) -> bool {
        retriable(action, error)
    }

    fn next_pause(&mut self) -> Option<Duration> {
        let shift = u32::try_from(self.retries).unwrap_or(u32::MAX).min(63);
        let raw = BASE_PAUSE
            .checked_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX))
            .unwrap_or(MAX_PAUSE)
            .min(MAX_PAUSE);
        let jitter = rand::thread_rng().gen_range(0.0..=MAX_JITTER);
        let pause = raw.mul_f64(1.0 + jitter);
        let until_expiry = self.expiry.saturating_duration_since(Instant::now());
        if pause >= until_expiry || pause >= self.budget {
            return None;
        }
        self.budget -= pause;
        self.retries += 1;
        Some(pause)
    }
}

/// Fail-fast strategy: every error is terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn clone_for_call(&self) -> Box<dyn RetryStrategy> {
        Box::new(NoRetry)
    }

    fn retries(&self) -> i64 {
        0
    }

    fn should_retry(&self, _action: Action, _error: &OtsError) -> bool {
        false
    }

    fn next_pause(&mut self) -> Option<Duration> {
        None
    }
}
