//! Error types for process composition.

use thiserror::Error;

/// Errors raised while composing groups.
///
/// These are structural errors: they abort composition immediately instead
/// of surfacing later as failed results.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The same rank was assigned to two members.
    #[error("duplicate rank {rank} in group")]
    DuplicateRank { rank: u32 },

    /// Ranks were assigned but do not cover 1..=N exactly.
    #[error("group of {total} members needs ranks 1..={total}, got {got:?}")]
    RankOutOfRange { total: usize, got: Vec<u32> },

    /// Only some members were ranked; assign all or none.
    #[error("{assigned} of {total} group members have ranks; assign all or none")]
    PartialRankAssignment { assigned: usize, total: usize },
}
