use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by the chain engine and its coordinating service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("no pending transactions to mine")]
    NoPendingTransactions,

    /// Stored hash or linkage no longer matches; the chain must not be extended.
    #[error("chain integrity violation at block #{index}: {reason}")]
    IntegrityViolation { index: u64, reason: String },

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("mining was cancelled")]
    MiningCancelled,

    #[error("difficulty {requested} is outside 1..={max}")]
    InvalidDifficulty { requested: u32, max: u32 },

    /// A mined block no longer fits on top of the current head.
    #[error("stale block: {0}")]
    StaleBlock(String),
}

/// Failures of the persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store corrupt: {0}")]
    Corrupt(String),
}

/// Token ledger and marketplace errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("amount must be > 0")]
    InvalidAmount,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token already exists: {0}")]
    DuplicateToken(String),

    #[error("supply of {0} would overflow")]
    SupplyOverflow(String),

    #[error("insufficient balance for {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("listing not found: {0}")]
    ListingNotFound(String),

    #[error("listing holds {available}, requested {requested}")]
    InsufficientListing {
        requested: Decimal,
        available: Decimal,
    },
}
