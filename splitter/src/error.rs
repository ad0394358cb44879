//! Error taxonomy, spec.md §4.10/§7: classifies a splitter-side failure into
//! the policy that must follow it. Grounded in `rwsplitsession.cc`'s
//! `handleError`/`errmsg` resolution logic and spec.md §7's Protocol/
//! Storage/Transport/Logical/Policy kinds.

use common::config::router_config::MasterFailureMode;
use common::err::decode_error::ReError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterErrorKind {
    MasterDown { mid_write: bool },
    SlaveDown { read_interrupted: bool },
    IgnorableRollback,
    UnexpectedResultsetChunk,
    NoRoutableTarget,
}

/// What the session must do in response to a `SplitterErrorKind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPolicy {
    CloseSession,
    KeepReading,
    ReturnReadOnlyErrorOnNextWrite,
    RetryOnAnotherTarget,
    RetryOrReplayTransaction,
    /// Assertion-class failure: dump the session log and close.
    DumpAndClose,
    /// Re-enqueue until `delayed_retry_timeout` elapses.
    DelayedRetry,
}

pub struct ErrorContext {
    pub master_failure_mode: MasterFailureMode,
    pub retry_failed_reads: bool,
    pub delayed_retry: bool,
}

pub fn classify(kind: SplitterErrorKind, ctx: &ErrorContext) -> ErrorPolicy {
    match kind {
        SplitterErrorKind::MasterDown { mid_write } => match ctx.master_failure_mode {
            MasterFailureMode::FailInstantly => ErrorPolicy::CloseSession,
            MasterFailureMode::FailOnWrite => {
                if mid_write {
                    ErrorPolicy::CloseSession
                } else {
                    ErrorPolicy::KeepReading
                }
            }
            MasterFailureMode::ErrorOnWrite => ErrorPolicy::ReturnReadOnlyErrorOnNextWrite,
        },
        SplitterErrorKind::SlaveDown { read_interrupted } => {
            if read_interrupted && ctx.retry_failed_reads {
                ErrorPolicy::RetryOnAnotherTarget
            } else {
                ErrorPolicy::CloseSession
            }
        }
        SplitterErrorKind::IgnorableRollback => ErrorPolicy::RetryOrReplayTransaction,
        SplitterErrorKind::UnexpectedResultsetChunk => ErrorPolicy::DumpAndClose,
        SplitterErrorKind::NoRoutableTarget => {
            if ctx.delayed_retry {
                ErrorPolicy::DelayedRetry
            } else {
                ErrorPolicy::CloseSession
            }
        }
    }
}

/// 1792/25006-style terminal failure, spec.md §4.9 step 3/§4.10 "Policy".
pub fn policy_exhausted(reason: impl Into<String>) -> ReError {
    ReError::TrxReplayErr(reason.into())
}

pub fn no_routable_target(reason: impl Into<String>) -> ReError {
    ReError::NoRoutableTarget(reason.into())
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctx(mode: MasterFailureMode) -> ErrorContext {
        ErrorContext {
            master_failure_mode: mode,
            retry_failed_reads: true,
            delayed_retry: false,
        }
    }

    #[test]
    fn master_down_fail_on_write_keeps_reading_when_not_mid_write() {
        let policy = classify(
            SplitterErrorKind::MasterDown { mid_write: false },
            &ctx(MasterFailureMode::FailOnWrite),
        );
        assert_eq!(policy, ErrorPolicy::KeepReading);
    }

    #[test]
    fn master_down_fail_on_write_closes_when_mid_write() {
        let policy = classify(
            SplitterErrorKind::MasterDown { mid_write: true },
            &ctx(MasterFailureMode::FailOnWrite),
        );
        assert_eq!(policy, ErrorPolicy::CloseSession);
    }

    #[test]
    fn slave_down_without_retry_closes_session() {
        let mut c = ctx(MasterFailureMode::FailInstantly);
        c.retry_failed_reads = false;
        let policy = classify(SplitterErrorKind::SlaveDown { read_interrupted: true }, &c);
        assert_eq!(policy, ErrorPolicy::CloseSession);
    }

    #[test]
    fn unexpected_resultset_chunk_is_assertion_class() {
        let policy = classify(
            SplitterErrorKind::UnexpectedResultsetChunk,
            &ctx(MasterFailureMode::FailInstantly),
        );
        assert_eq!(policy, ErrorPolicy::DumpAndClose);
    }

    #[test]
    fn no_routable_target_honors_delayed_retry_flag() {
        let mut c = ctx(MasterFailureMode::FailInstantly);
        c.delayed_retry = true;
        assert_eq!(
            classify(SplitterErrorKind::NoRoutableTarget, &c),
            ErrorPolicy::DelayedRetry
        );
        c.delayed_retry = false;
        assert_eq!(
            classify(SplitterErrorKind::NoRoutableTarget, &c),
            ErrorPolicy::CloseSession
        );
    }
}
