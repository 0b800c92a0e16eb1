//! Error types for resource mutation.

use crate::PoolId;
use thiserror::Error;

/// Errors from direct resource mutation.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// More was requested than is on hand.
    #[error("insufficient quantity in {id}: requested {requested}, available {available}")]
    InsufficientQuantity {
        id: PoolId,
        requested: f64,
        available: f64,
    },

    /// The resource is marked unavailable.
    #[error("resource {id} is unavailable")]
    Unavailable { id: PoolId },

    /// Negative amounts are never valid.
    #[error("negative amount {amount}")]
    NegativeAmount { amount: f64 },
}
