//! Deterministic virtual-time simulation engine.
//!
//! Given the same seed and scenario, the engine produces identical results
//! every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, SimEvent>)     │ │
//! │  │     Ordered by: time, priority, sequence           │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     instances: ProcessStateMachine per process     │ │
//! │  │     composites: chain / group / graph bookkeeping  │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → pools, timers, results, new events   │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Scheduling is single-threaded cooperative: one state machine runs to its
//! next suspension point before another resumes. "Parallelism" is
//! same-timestamp interleaving, ordered by priority then submission order.

mod composite;
mod event_queue;
mod pool;
mod runner;

pub use event_queue::EventKey;
pub use pool::{PoolStatus, ResourcePool};
pub use runner::{SimulationConfig, SimulationRunner, SimulationStats};

/// Deterministic numbering for process instances inside one runner.
///
/// This is an engine-only concept: scenario code addresses processes by
/// [`shopfloor_types::ProcessId`]; the runner numbers each spawned instance
/// so the same spec can run in several compositions.
pub type InstanceId = u64;

/// Deterministic numbering for composition nodes (chains, groups, graphs).
pub type CompositeId = u64;
