//! Auction engine error types.

use thiserror::Error;

use curio_types::{AuctionId, LockId};

/// Errors that can occur in the auction engine.
///
/// Validation errors are detected before any mutation; an error return
/// means no state changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Auction not found: {0}")]
    AuctionNotFound(AuctionId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(u64),

    #[error("Auction {0} is not active")]
    AuctionNotActive(AuctionId),

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Lock {0} already finalized")]
    AlreadyFinalized(LockId),

    #[error("Auction {0} already terminal")]
    AlreadyTerminal(AuctionId),

    #[error("Lock not found: {0}")]
    LockNotFound(LockId),

    #[error("Invalid timing configuration")]
    InvalidTiming,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
