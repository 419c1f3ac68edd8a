use log::{debug, error, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::store::LedgerStore;
use crate::blockchain::Block;
use crate::error::StoreError;
use crate::transaction::Transaction;

/// One confirmed transaction together with the block that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub block_hash: String,
    pub block_timestamp: i64,
    #[serde(flatten)]
    pub transaction: Transaction,
}

/// Net balance of `address` over every confirmed transaction.
/// This full scan is the authoritative definition. Totals saturate at the
/// `Decimal` bounds instead of overflowing.
pub fn scan_balance(blocks: &[Block], address: &str) -> Decimal {
    let mut balance = Decimal::ZERO;
    for tx in blocks.iter().flat_map(|b| b.transactions.iter()) {
        if tx.sender == address {
            balance = balance.saturating_sub(tx.amount);
        }
        if tx.receiver == address {
            balance = balance.saturating_add(tx.amount);
        }
    }
    balance
}

/// Every transaction touching `address`, in chain order.
pub fn scan_history(blocks: &[Block], address: &str) -> Vec<HistoryEntry> {
    blocks
        .iter()
        .flat_map(move |block| {
            block
                .transactions
                .iter()
                .filter(move |tx| tx.involves(address))
                .map(move |tx| HistoryEntry {
                    block_hash: block.hash.clone(),
                    block_timestamp: block.timestamp,
                    transaction: tx.clone(),
                })
        })
        .collect()
}

/// Balance view over confirmed blocks, served from the store when it is in
/// sync and recomputed from the chain otherwise.
pub struct BalanceLedger {
    store: Arc<dyn LedgerStore>,
    synced: bool,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            synced: true,
        }
    }

    /// Whether cached reads may be trusted.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Push a confirmed block to the store. A failure is reported and the
    /// cache is marked stale; chain state is unaffected.
    pub fn commit(&mut self, block: &Block) {
        if !self.synced {
            debug!("LEDGER - cache stale, skipping store write for block #{}", block.index);
            return;
        }
        if let Err(e) = self.store.commit_block(block) {
            error!(
                "LEDGER - store write failed for block #{} ({}): {}; serving balances from chain scan",
                block.index, block.hash, e
            );
            self.synced = false;
        }
    }

    pub fn balance_of(&self, blocks: &[Block], address: &str) -> Decimal {
        if self.synced {
            match self.store.balance(address) {
                Ok(Some(balance)) => return balance,
                Ok(None) => debug!("LEDGER - cache miss for {address}"),
                Err(e) => warn!("LEDGER - cache read failed for {address}: {e}"),
            }
        }
        scan_balance(blocks, address)
    }

    pub fn history_of(&self, blocks: &[Block], address: &str) -> Vec<HistoryEntry> {
        if self.synced {
            match self.store.transactions_of(address) {
                Ok(history) => return history,
                Err(e) => warn!("LEDGER - history read failed for {address}: {e}"),
            }
        }
        scan_history(blocks, address)
    }

    /// Block by hash, from the store's index when in sync.
    pub fn block(&self, blocks: &[Block], hash: &str) -> Option<Block> {
        if self.synced {
            match self.store.block(hash) {
                Ok(Some(block)) => return Some(block),
                Ok(None) => debug!("LEDGER - block {hash} not in store"),
                Err(e) => warn!("LEDGER - block read failed for {hash}: {e}"),
            }
        }
        blocks.iter().find(|b| b.hash == hash).cloned()
    }

    /// Rebuild the store from scratch out of `blocks`.
    pub fn resync(&mut self, blocks: &[Block]) -> Result<(), StoreError> {
        self.synced = false;
        self.store.clear()?;
        for block in blocks {
            self.store.commit_block(block)?;
        }
        self.synced = true;
        debug!("LEDGER - store resynced with {} blocks", blocks.len());
        Ok(())
    }
}
