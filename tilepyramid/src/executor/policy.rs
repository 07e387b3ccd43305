//! Policy types for run failure handling.
//!
//! A render engine error is never retried. [`FailurePolicy`] decides
//! whether that error ends the entire run or is recorded and skipped.

use std::fmt;
use std::str::FromStr;

// =============================================================================
// Failure Policy
// =============================================================================

/// How a run reacts when a tile fails to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run on the first failure.
    ///
    /// The producer stops enqueueing. Workers exit at their next dequeue.
    /// The run fails, with no metadata or archive written.
    #[default]
    AbortAll,

    /// Record each failure and keep rendering.
    ///
    /// The run completes and still exports. Failed tiles are listed in the
    /// report and are retried by the next run, since no file exists for them.
    ContinueOnError,
}

impl FailurePolicy {
    /// Returns true if a failure should cancel the run.
    pub fn aborts_on_failure(&self) -> bool {
        matches!(self, FailurePolicy::AbortAll)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::AbortAll => "abort",
            FailurePolicy::ContinueOnError => "continue",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicy(pub String);

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown failure policy '{}' (use abort or continue)",
            self.0
        )
    }
}

impl std::error::Error for UnknownPolicy {}

impl FromStr for FailurePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" | "abort-all" => Ok(FailurePolicy::AbortAll),
            "continue" | "continue-on-error" => Ok(FailurePolicy::ContinueOnError),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_abort_all() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::AbortAll);
        assert!(FailurePolicy::AbortAll.aborts_on_failure());
        assert!(!FailurePolicy::ContinueOnError.aborts_on_failure());
    }

    #[test]
    fn test_parse_round_trips_display() {
        for policy in [FailurePolicy::AbortAll, FailurePolicy::ContinueOnError] {
            assert_eq!(policy.to_string().parse::<FailurePolicy>(), Ok(policy));
        }
        assert_eq!(
            "Continue-On-Error".parse::<FailurePolicy>(),
            Ok(FailurePolicy::ContinueOnError)
        );
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
