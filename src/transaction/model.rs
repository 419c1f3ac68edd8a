use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// Sender used for minted block rewards. It has no matching debit anywhere.
pub const NETWORK_SENDER: &str = "Network";

/// Largest amount a single transfer may carry (10^15). Keeps every running
/// balance far inside `Decimal`'s range.
pub const MAX_TRANSFER_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// A value transfer between two addresses.
///
/// Field order matters: the serialized form is part of the block hash preimage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
    #[serde(default = "now_millis")]
    pub timestamp: i64, // Unix millis (UTC)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl Transaction {
    /// Build a transaction stamped with the current time. Does not validate.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: Decimal) -> Self {
        Self::with_timestamp(sender, receiver, amount, now_millis())
    }

    pub fn with_timestamp(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Decimal,
        timestamp: i64,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
        }
    }

    /// Minted reward paid to `miner`.
    pub fn reward(miner: impl Into<String>, amount: Decimal) -> Self {
        Self::new(NETWORK_SENDER, miner, amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == NETWORK_SENDER
    }

    /// Basic shape checks: non-empty parties and an amount in
    /// `(0, MAX_TRANSFER_AMOUNT]`.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.sender.trim().is_empty() {
            return Err(ChainError::InvalidTransaction("sender is empty".into()));
        }
        if self.receiver.trim().is_empty() {
            return Err(ChainError::InvalidTransaction("receiver is empty".into()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ChainError::InvalidTransaction(format!(
                "amount must be > 0 (got {})",
                self.amount
            )));
        }
        if self.amount > MAX_TRANSFER_AMOUNT {
            return Err(ChainError::InvalidTransaction(format!(
                "amount exceeds the transfer limit of {MAX_TRANSFER_AMOUNT}"
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// True when `address` is on either side of the transfer.
    pub fn involves(&self, address: &str) -> bool {
        self.sender == address || self.receiver == address
    }
}
