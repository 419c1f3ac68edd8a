use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::transaction::Transaction;

/// How many nonces are tried between two looks at the cancel flag.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// A single block in the chain holding an ordered list of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64, // Unix millis (UTC), fixed before mining
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub nonce: u64,   // Proof-of-Work nonce
    pub hash: String, // Cached hash of the block
}

impl Block {
    /// Create the genesis block (index 0, no transactions, previous hash "0").
    /// Not mined yet.
    pub fn genesis() -> Self {
        Self::new(0, Vec::new(), String::from("0"))
    }

    /// Create a new block (not mined yet). Call `mine()` to perform PoW.
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: String) -> Self {
        Self::new_with_timestamp(
            index,
            transactions,
            previous_hash,
            Utc::now().timestamp_millis(),
        )
    }

    pub fn new_with_timestamp(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        timestamp: i64,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// SHA-256 over `index ‖ timestamp ‖ transactions ‖ previous_hash ‖ nonce`
    /// (no separators). Transactions are serialized as JSON.
    pub fn calculate_hash(&self) -> String {
        let txs_json =
            serde_json::to_string(&self.transactions).expect("transactions serialize to json");
        let preimage = format!(
            "{}{}{}{}{}",
            self.index, self.timestamp, txs_json, self.previous_hash, self.nonce
        );
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Perform Proof-of-Work by finding a nonce that yields a hash
    /// starting with `difficulty` leading zeros (in hex).
    pub fn mine(&mut self, difficulty: u32) {
        let never = AtomicBool::new(false);
        self.mine_cancellable(difficulty, &never);
    }

    /// Same search as [`Block::mine`], giving up when `cancel` is raised.
    /// Returns `false` if the search was aborted; the block is then unsealed.
    pub fn mine_cancellable(&mut self, difficulty: u32, cancel: &AtomicBool) -> bool {
        self.hash = self.calculate_hash();
        while !meets_difficulty(&self.hash, difficulty) {
            if self.nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return false;
            }
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.calculate_hash();
        }
        true
    }

    /// The cached `hash` matches the content.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Validate that the block's cached `hash` matches its content and
    /// satisfies the PoW difficulty. (Does NOT validate chain linkage.)
    pub fn is_valid(&self, difficulty: u32) -> bool {
        self.has_valid_hash() && meets_difficulty(&self.hash, difficulty)
    }
}

/// First `difficulty` hex characters of `hash` are all `0`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let want = difficulty as usize;
    hash.len() >= want && hash.bytes().take(want).all(|c| c == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn transfer(amount: i64) -> Transaction {
        Transaction::with_timestamp("alice", "bob", Decimal::from(amount), 1_700_000_000_000)
    }

    #[test]
    fn genesis_has_valid_hash() {
        let b = Block::genesis();
        assert_eq!(b.index, 0);
        assert_eq!(b.previous_hash, "0");
        assert_eq!(b.hash, b.calculate_hash());
        assert_eq!(b.hash.len(), 64);
    }

    #[test]
    fn hash_is_reproducible() {
        let a = Block::new_with_timestamp(3, vec![transfer(1)], "prev".into(), 1000);
        let b = Block::new_with_timestamp(3, vec![transfer(1)], "prev".into(), 1000);
        assert_eq!(a.hash, b.hash);

        let txs_json = serde_json::to_string(&a.transactions).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(format!("31000{txs_json}prev0").as_bytes());
        assert_eq!(a.hash, hex::encode(hasher.finalize()));
    }

    #[test]
    fn mining_produces_leading_zeros() {
        for difficulty in 1..=4 {
            let mut b = Block::new(1, vec![transfer(1)], "prev".into());
            let timestamp = b.timestamp;
            b.mine(difficulty);
            assert!(b.hash.starts_with(&"0".repeat(difficulty as usize)));
            assert!(b.is_valid(difficulty));
            assert_eq!(b.timestamp, timestamp, "mining must not touch the timestamp");
        }
    }

    #[test]
    fn cancelled_search_stops() {
        let cancel = AtomicBool::new(true);
        let mut b = Block::new(1, vec![transfer(1)], "prev".into());
        // difficulty 64 is unreachable; only the cancel flag ends the loop
        assert!(!b.mine_cancellable(64, &cancel));
    }

    #[test]
    fn invalid_when_mutated() {
        let mut b = Block::new(2, vec![transfer(1)], "prev".into());
        b.mine(2);
        let old_hash = b.hash.clone();

        b.transactions[0].amount = Decimal::from(1_000);

        assert_ne!(old_hash, b.calculate_hash());
        assert!(!b.is_valid(2));
    }

    #[test]
    fn difficulty_prefix() {
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("0a0b", 2));
        assert!(meets_difficulty("abc", 0));
        assert!(!meets_difficulty("00", 3));
    }
}
