use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::TokenError;

#[derive(Debug, Default)]
struct Supply {
    total: Decimal,
    balances: HashMap<String, Decimal>,
}

/// A fungible token. Supply and balances share one lock, so every operation
/// is a single all-or-nothing step.
#[derive(Debug)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    supply: Mutex<Supply>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub total_supply: Decimal,
    pub balances: HashMap<String, Decimal>,
}

impl Token {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        total_supply: Decimal,
        decimals: u32,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            supply: Mutex::new(Supply {
                total: total_supply,
                balances: HashMap::new(),
            }),
        }
    }

    /// Default token of the network.
    pub fn miznet() -> Self {
        Self::new("Miznet", "MIZ", Decimal::from(1_000_000), 18)
    }

    pub fn mint(&self, to: &str, amount: Decimal) -> Result<(), TokenError> {
        check_amount(amount)?;
        let mut supply = self.supply.lock().expect("mutex poisoned");
        // balances never exceed the total, so one check covers both
        let total = supply
            .total
            .checked_add(amount)
            .ok_or_else(|| TokenError::SupplyOverflow(self.symbol.clone()))?;
        supply.total = total;
        *supply.balances.entry(to.to_string()).or_default() += amount;
        debug!("TOKEN {} - minted {} to {}", self.symbol, amount, to);
        Ok(())
    }

    pub fn burn(&self, from: &str, amount: Decimal) -> Result<(), TokenError> {
        check_amount(amount)?;
        let mut supply = self.supply.lock().expect("mutex poisoned");
        let available = supply.balances.get(from).copied().unwrap_or_default();
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                address: from.to_string(),
                required: amount,
                available,
            });
        }
        supply.total -= amount;
        *supply.balances.entry(from.to_string()).or_default() -= amount;
        Ok(())
    }

    pub fn transfer(&self, sender: &str, receiver: &str, amount: Decimal) -> Result<(), TokenError> {
        check_amount(amount)?;
        let mut supply = self.supply.lock().expect("mutex poisoned");
        let available = supply.balances.get(sender).copied().unwrap_or_default();
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                address: sender.to_string(),
                required: amount,
                available,
            });
        }
        *supply.balances.entry(sender.to_string()).or_default() -= amount;
        *supply.balances.entry(receiver.to_string()).or_default() += amount;
        debug!(
            "TOKEN {} - {} -> {} amount={}",
            self.symbol, sender, receiver, amount
        );
        Ok(())
    }

    pub fn balance_of(&self, address: &str) -> Decimal {
        let supply = self.supply.lock().expect("mutex poisoned");
        supply.balances.get(address).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> Decimal {
        self.supply.lock().expect("mutex poisoned").total
    }

    pub fn info(&self) -> TokenInfo {
        let supply = self.supply.lock().expect("mutex poisoned");
        TokenInfo {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            total_supply: supply.total,
            balances: supply.balances.clone(),
        }
    }
}

fn check_amount(amount: Decimal) -> Result<(), TokenError> {
    if amount <= Decimal::ZERO {
        Err(TokenError::InvalidAmount)
    } else {
        Ok(())
    }
}
