use std::time::Duration;
use widerow::{
    classify, retriable, Action, DeadlineRetryStrategy, ErrorCode, NoRetry, OtsError,
    RetryCategory, RetryStrategy,
};

#[test]
fn classification_table_is_fixed() {
    let retriable_codes = [
        ErrorCode::OtsRowOperationConflict,
        ErrorCode::OtsNotEnoughCapacityUnit,
        ErrorCode::OtsTableNotReady,
        ErrorCode::OtsPartitionUnavailable,
        ErrorCode::OtsServerBusy,
    ];
    for code in retriable_codes {
        assert_eq!(classify(code), RetryCategory::Retriable, "{code}");
    }
    let depends_codes = [ErrorCode::OtsQuotaExhausted, ErrorCode::OtsRequestTimeout];
    for code in depends_codes {
        assert_eq!(classify(code), RetryCategory::Depends, "{code}");
    }
    let unretriable_codes = [
        ErrorCode::OtsParameterInvalid,
        ErrorCode::OtsAuthFailed,
        ErrorCode::CorruptedResponse,
        ErrorCode::CouldntResolveHost,
        ErrorCode::RequestTimeout,
        ErrorCode::ResponseDirectlyLost,
        ErrorCode::WriteRequestFail,
        ErrorCode::SslHandshakeFail,
        ErrorCode::OtsConditionCheckFail,
        ErrorCode::OtsInternalServerError,
    ];
    for code in unretriable_codes {
        assert_eq!(classify(code), RetryCategory::Unretriable, "{code}");
    }
}

#[test]
fn depends_codes_follow_action_idempotency() {
    let err = OtsError::new(ErrorCode::OtsRequestTimeout, "ambiguous timeout");
    // reads and delete-style actions are idempotent
    for action in [
        Action::ListTable,
        Action::DescribeTable,
        Action::GetRow,
        Action::GetRange,
        Action::BatchGetRow,
        Action::DeleteRow,
        Action::DeleteTable,
    ] {
        assert!(retriable(action, &err), "{action} should retry on ambiguous timeout");
    }
    // additive updates must never be silently retried
    for action in [
        Action::UpdateRow,
        Action::PutRow,
        Action::BatchWriteRow,
        Action::CreateTable,
        Action::UpdateTable,
        Action::ComputeSplitsBySize,
    ] {
        assert!(!retriable(action, &err), "{action} must not retry on ambiguous timeout");
    }
}

#[test]
fn server_busy_retries_everywhere() {
    let err = OtsError::new(ErrorCode::OtsServerBusy, "busy");
    for action in Action::all() {
        assert!(retriable(action, &err), "{action}");
    }
}

#[test]
fn pauses_are_bounded_and_within_deadline() {
    let deadline = Duration::from_secs(10);
    let mut strategy = DeadlineRetryStrategy::new(deadline);
    let mut total = Duration::ZERO;
    let mut last_retries = 0;
    let max_single = Duration::from_secs(2).mul_f64(1.25);
    while let Some(pause) = strategy.next_pause() {
        assert!(pause <= max_single, "pause {pause:?} above cap");
        total += pause;
        assert!(strategy.retries() > last_retries, "retry counter must grow");
        last_retries = strategy.retries();
        assert!(total <= deadline, "cumulative pause {total:?} above deadline");
    }
    assert!(strategy.retries() >= 2, "a 10s deadline affords several retries");
}

#[test]
fn first_pause_has_exponential_base() {
    let mut strategy = DeadlineRetryStrategy::new(Duration::from_secs(60));
    let first = strategy.next_pause().expect("deadline is far away");
    assert!(first >= Duration::from_millis(100));
    assert!(first <= Duration::from_millis(125));
    let second = strategy.next_pause().expect("deadline is far away");
    assert!(second >= Duration::from_millis(200));
    assert!(second <= Duration::from_millis(250));
}

#[test]
fn tight_deadline_is_terminal_at_once() {
    let mut strategy = DeadlineRetryStrategy::new(Duration::from_millis(1));
    assert!(strategy.next_pause().is_none());
    assert_eq!(strategy.retries(), 0);
}

#[test]
fn clone_for_call_resets_counter_and_deadline() {
    let mut template = DeadlineRetryStrategy::new(Duration::from_secs(10));
    while template.next_pause().is_some() {}
    let mut fresh = RetryStrategy::clone_for_call(&template);
    assert_eq!(fresh.retries(), 0);
    assert!(fresh.next_pause().is_some(), "a fresh call gets a fresh budget");
}

#[test]
fn no_retry_is_always_terminal() {
    let mut strategy = NoRetry;
    let err = OtsError::new(ErrorCode::OtsServerBusy, "busy");
    assert!(!strategy.should_retry(Action::GetRow, &err));
    assert!(strategy.next_pause().is_none());
}
