//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identifier.
///
/// Scenario code picks these; the engine treats them as opaque and only
/// requires uniqueness within one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Create a process identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProcessId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Resource pool identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(String);

impl PoolId {
    /// Create a pool identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pool({})", self.0)
    }
}

impl From<&str> for PoolId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PoolId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Handle for a top-level submission (process, chain, group, or graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Submission({})", self.0)
    }
}

/// Scheduling priority in the range 1..=10.
///
/// Lower values are more urgent: two resumptions due at the same virtual
/// time resolve by ascending priority, then by submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Most urgent priority.
    pub const MIN: Self = Priority(1);

    /// Least urgent priority.
    pub const MAX: Self = Priority(10);

    /// Priority assigned when a process declares none.
    pub const DEFAULT: Self = Priority(5);

    /// Create a priority, clamping into the valid 1..=10 range.
    pub fn new(value: u8) -> Self {
        Priority(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    /// Get the raw value.
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
