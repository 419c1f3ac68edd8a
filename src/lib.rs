//! Proof-of-work value-transfer ledger: transactions, hash-chained blocks,
//! the chain controller with its balance view, and a small HTTP surface.

pub mod advisory;
pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod ledger;
pub mod service;
pub mod token;
pub mod transaction;

pub use blockchain::{Block, Chain, ChainConfig};
pub use error::{ChainError, StoreError, TokenError};
pub use service::LedgerService;
pub use transaction::Transaction;
