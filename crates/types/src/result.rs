//! Process execution results.

use crate::ProcessId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Data flowing between processes: input to the first step, output of the
/// last. Composition nodes wrap these (a group's payload is the array of its
/// members' payloads).
pub type Payload = Value;

/// Outcome of one process (or composition node) execution.
///
/// Immutable once produced. A failed result is still a result: it propagates
/// to dependents as data and never halts the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Identifier of the process that produced this result.
    pub process_id: ProcessId,
    /// Human-readable process name.
    pub name: String,
    /// Whether the process completed successfully.
    pub success: bool,
    /// Output payload (input pass-through unless the process declares one).
    pub payload: Payload,
    /// Virtual time the process started executing.
    pub started_at: Duration,
    /// Virtual time the result was produced.
    pub finished_at: Duration,
    /// Error description for failed executions.
    pub error: Option<String>,
}

impl ProcessResult {
    /// Create a successful result.
    pub fn success(
        process_id: ProcessId,
        name: impl Into<String>,
        payload: Payload,
        started_at: Duration,
        finished_at: Duration,
    ) -> Self {
        Self {
            process_id,
            name: name.into(),
            success: true,
            payload,
            started_at,
            finished_at,
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failure(
        process_id: ProcessId,
        name: impl Into<String>,
        payload: Payload,
        started_at: Duration,
        finished_at: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            process_id,
            name: name.into(),
            success: false,
            payload,
            started_at,
            finished_at,
            error: Some(error.into()),
        }
    }

    /// Wall time the execution occupied on the virtual clock.
    pub fn duration(&self) -> Duration {
        self.finished_at.saturating_sub(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duration() {
        let r = ProcessResult::success(
            ProcessId::new("p1"),
            "p1",
            json!(null),
            Duration::from_secs(2),
            Duration::from_secs(5),
        );
        assert_eq!(r.duration(), Duration::from_secs(3));
        assert!(r.success);
        assert!(r.error.is_none());
    }

    #[test]
    fn test_failure_carries_error() {
        let r = ProcessResult::failure(
            ProcessId::new("p1"),
            "p1",
            json!(null),
            Duration::ZERO,
            Duration::ZERO,
            "missing mandatory resource",
        );
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("missing mandatory resource"));
    }
}
