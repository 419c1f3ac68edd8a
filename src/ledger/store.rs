use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::balance::HistoryEntry;
use crate::blockchain::Block;
use crate::error::StoreError;

/// Durable side of the ledger: blocks by hash, confirmed transactions and
/// balances by address. The chain stays authoritative; this is a cache.
pub trait LedgerStore: Send + Sync {
    /// Record a freshly appended block and apply its transfers to balances.
    /// Must be all-or-nothing.
    fn commit_block(&self, block: &Block) -> Result<(), StoreError>;

    fn block(&self, hash: &str) -> Result<Option<Block>, StoreError>;

    /// Cached balance, `None` when the address was never seen.
    fn balance(&self, address: &str) -> Result<Option<Decimal>, StoreError>;

    fn transactions_of(&self, address: &str) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Drop everything (used before a full resync).
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Default, Debug)]
struct Data {
    blocks: HashMap<String, Block>,
    balances: HashMap<String, Decimal>,
    transactions: HashMap<String, Vec<HistoryEntry>>,
}

/// In-process store. `set_online(false)` simulates an outage: every call
/// then fails with `StoreError::Unavailable`.
#[derive(Debug)]
pub struct MemoryStore {
    data: Mutex<Data>,
    online: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(Data::default()),
            online: AtomicBool::new(true),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".into()))
        }
    }

    /// Overwrite a cached balance. Lets tests put the cache out of sync.
    #[cfg(test)]
    pub(crate) fn force_balance(&self, address: &str, amount: Decimal) {
        let mut data = self.data.lock().expect("mutex poisoned");
        data.balances.insert(address.to_string(), amount);
    }
}

impl LedgerStore for MemoryStore {
    fn commit_block(&self, block: &Block) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut data = self.data.lock().expect("mutex poisoned");
        if data.blocks.contains_key(&block.hash) {
            return Err(StoreError::Corrupt(format!(
                "block {} already stored",
                block.hash
            )));
        }

        // Stage balance changes first so an overflow leaves the store untouched.
        let mut staged: HashMap<String, Decimal> = HashMap::new();
        for tx in &block.transactions {
            for (address, delta) in [(&tx.sender, -tx.amount), (&tx.receiver, tx.amount)] {
                let current = match staged.get(address) {
                    Some(balance) => *balance,
                    None => data.balances.get(address).copied().unwrap_or_default(),
                };
                let next = current.checked_add(delta).ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "balance overflow for {address} in block {}",
                        block.hash
                    ))
                })?;
                staged.insert(address.clone(), next);
            }
        }
        data.balances.extend(staged);

        for tx in &block.transactions {
            let entry = HistoryEntry {
                block_hash: block.hash.clone(),
                block_timestamp: block.timestamp,
                transaction: tx.clone(),
            };
            data.transactions
                .entry(tx.sender.clone())
                .or_default()
                .push(entry.clone());
            if tx.receiver != tx.sender {
                data.transactions
                    .entry(tx.receiver.clone())
                    .or_default()
                    .push(entry);
            }
        }
        data.blocks.insert(block.hash.clone(), block.clone());
        Ok(())
    }

    fn block(&self, hash: &str) -> Result<Option<Block>, StoreError> {
        self.ensure_online()?;
        let data = self.data.lock().expect("mutex poisoned");
        Ok(data.blocks.get(hash).cloned())
    }

    fn balance(&self, address: &str) -> Result<Option<Decimal>, StoreError> {
        self.ensure_online()?;
        let data = self.data.lock().expect("mutex poisoned");
        Ok(data.balances.get(address).copied())
    }

    fn transactions_of(&self, address: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        self.ensure_online()?;
        let data = self.data.lock().expect("mutex poisoned");
        Ok(data.transactions.get(address).cloned().unwrap_or_default())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut data = self.data.lock().expect("mutex poisoned");
        *data = Data::default();
        Ok(())
    }
}
