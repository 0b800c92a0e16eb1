//! Actions emitted by process state machines.

use serde::{Deserialize, Serialize};
use shopfloor_types::{ProcessResult, ResourceKind, ResourceRequirement};
use std::time::Duration;

/// Declaration of an output resource produced on completion.
///
/// Produced into the matching quantity pool; the pool is created on first
/// production if no pool of that name exists yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Category of the produced resource.
    pub kind: ResourceKind,
    /// Pool name to produce into.
    pub name: String,
    /// Amount produced per completion.
    pub amount: f64,
    /// Unit of measure.
    pub unit: String,
}

impl OutputSpec {
    /// Create an output declaration.
    pub fn new(
        kind: ResourceKind,
        name: impl Into<String>,
        amount: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            amount,
            unit: unit.into(),
        }
    }
}

/// Actions a process state machine asks the runner to perform.
///
/// The runner executes these; state machines never touch pools or the
/// clock directly.
#[derive(Debug)]
pub enum Action {
    /// Acquire every declared requirement from the pools.
    ///
    /// Suspends the process until all requests are granted. Grants follow
    /// FIFO order among waiters of equal priority.
    AcquireResources { requests: Vec<ResourceRequirement> },

    /// Run the work body.
    ///
    /// The runner folds `base` through the process's behaviors and schedules
    /// completion at the resulting virtual time.
    RunBody { base: Duration },

    /// Produce declared outputs into the pools.
    ProduceOutputs { outputs: Vec<OutputSpec> },

    /// Return leased slots to their pools.
    ReleaseResources,

    /// Emit the final result to the parent composition and observers.
    EmitResult { result: ProcessResult },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::AcquireResources { .. } => "AcquireResources",
            Action::RunBody { .. } => "RunBody",
            Action::ProduceOutputs { .. } => "ProduceOutputs",
            Action::ReleaseResources => "ReleaseResources",
            Action::EmitResult { .. } => "EmitResult",
        }
    }
}
