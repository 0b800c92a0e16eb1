//! Core types for the shopfloor simulation engine.
//!
//! This crate has no scheduling logic. It defines the vocabulary shared by
//! every other crate: identifiers, the resource model, requirement
//! declarations, and process results.

mod error;
mod identifiers;
mod resource;
mod result;

pub use error::ResourceError;
pub use identifiers::{PoolId, Priority, ProcessId, SubmissionId};
pub use resource::{Resource, ResourceKind, ResourceRequirement};
pub use result::{Payload, ProcessResult};
