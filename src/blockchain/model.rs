use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::{Block, DEFAULT_DIFFICULTY, DIFF_MAX, DIFF_MIN, MINING_REWARD, difficulty};
use crate::error::{ChainError, StoreError};
use crate::ledger::{BalanceLedger, HistoryEntry, LedgerStore};
use crate::transaction::{NETWORK_SENDER, Transaction};

/// Knobs for a chain instance.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub difficulty: u32,
    pub mining_reward: Decimal,
    pub max_difficulty: u32,
    /// Run the retarget rule after every mined block.
    pub auto_adjust: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: Decimal::from(MINING_REWARD),
            max_difficulty: DIFF_MAX,
            auto_adjust: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub total_blocks: usize,
    pub avg_block_time: f64, // seconds
    pub difficulty: u32,
    pub total_transactions: usize,
}

/// A block under construction: built from a snapshot of the pending pool,
/// mined without holding any chain lock, then handed to [`Chain::commit`].
#[derive(Debug, Clone)]
pub struct MiningJob {
    block: Block,
    difficulty: u32,
    /// Length of the pool prefix included in `block` (reward excluded).
    consumed: usize,
    sealed: bool,
}

impl MiningJob {
    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Nonce search. An aborted search leaves the job unusable for commit.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<(), ChainError> {
        self.sealed = self.block.mine_cancellable(self.difficulty, cancel);
        if self.sealed {
            Ok(())
        } else {
            Err(ChainError::MiningCancelled)
        }
    }
}

/// Append-only proof-of-work chain with its pending pool and balance view.
pub struct Chain {
    blocks: Vec<Block>,
    /// Difficulty each block was mined at, parallel to `blocks`.
    mined_at: Vec<u32>,
    pending: Vec<Transaction>,
    difficulty: u32,
    config: ChainConfig,
    ledger: BalanceLedger,
}

impl Chain {
    /// Chain with its genesis block already mined and appended. The starting
    /// difficulty is clamped to `[DIFF_MIN, max_difficulty]`.
    pub fn new(config: ChainConfig, store: Arc<dyn LedgerStore>) -> Self {
        let mut chain = Self {
            blocks: Vec::new(),
            mined_at: Vec::new(),
            pending: Vec::new(),
            difficulty: clamp_difficulty(config.difficulty, config.max_difficulty),
            config,
            ledger: BalanceLedger::new(store),
        };
        chain.create_genesis();
        chain
    }

    /// Mine and append block #0. Does nothing once the chain has blocks.
    fn create_genesis(&mut self) {
        if !self.blocks.is_empty() {
            return;
        }
        let mut genesis = Block::genesis();
        genesis.mine(self.difficulty);
        info!("CHAIN - genesis mined (hash={})", genesis.hash);
        self.append(genesis, self.difficulty);
    }

    /// Return the last block in the chain.
    pub fn latest(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always holds the genesis block")
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Never 0: the genesis block is always present.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mining_reward(&self) -> Decimal {
        self.config.mining_reward
    }

    pub fn max_difficulty(&self) -> u32 {
        self.config.max_difficulty.max(DIFF_MIN)
    }

    /// Operator override, clamped to `[DIFF_MIN, max_difficulty]`. Affects
    /// future blocks only.
    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = clamp_difficulty(difficulty, self.config.max_difficulty);
    }

    pub fn mined_at(&self) -> &[u32] {
        &self.mined_at
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    /// Validate and enqueue a transfer. The reserved reward sender is refused.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        tx.validate()?;
        if tx.is_reward() {
            return Err(ChainError::InvalidTransaction(format!(
                "sender \"{NETWORK_SENDER}\" is reserved for block rewards"
            )));
        }
        self.pending.push(tx);
        debug!("CHAIN - tx accepted (pending={})", self.pending.len());
        Ok(())
    }

    /// Snapshot the pending pool plus a reward for `miner` into an unmined block
    /// on top of the current head.
    pub fn prepare_mining(&self, miner: &str) -> Result<MiningJob, ChainError> {
        if self.pending.is_empty() {
            return Err(ChainError::NoPendingTransactions);
        }
        self.ensure_valid()?;

        let reward = Transaction::reward(miner, self.config.mining_reward);
        reward.validate()?;

        let mut transactions = Vec::with_capacity(self.pending.len() + 1);
        transactions.extend(self.pending.iter().cloned());
        transactions.push(reward);

        let block = Block::new(
            self.blocks.len() as u64,
            transactions,
            self.latest().hash.clone(),
        );
        debug!(
            "CHAIN - job for block #{} ({} pending + reward, diff={})",
            block.index,
            self.pending.len(),
            self.difficulty
        );
        Ok(MiningJob {
            block,
            difficulty: self.difficulty,
            consumed: self.pending.len(),
            sealed: false,
        })
    }

    /// Append a mined job: push the block, drop the included pool prefix and
    /// update the balance view in one step. Refuses jobs that no longer fit.
    pub fn commit(&mut self, job: MiningJob) -> Result<&Block, ChainError> {
        let MiningJob {
            block,
            difficulty,
            consumed,
            sealed,
        } = job;

        if !sealed || !block.is_valid(difficulty) {
            return Err(ChainError::StaleBlock(format!(
                "block #{} is not sealed at difficulty {}",
                block.index, difficulty
            )));
        }
        if block.index != self.blocks.len() as u64 || block.previous_hash != self.latest().hash {
            return Err(ChainError::StaleBlock(format!(
                "block #{} does not extend head #{}",
                block.index,
                self.latest().index
            )));
        }
        if consumed > self.pending.len() {
            return Err(ChainError::StaleBlock(
                "pending pool changed under the job".into(),
            ));
        }

        self.pending.drain(..consumed);
        self.append(block, difficulty);
        info!(
            "CHAIN - sealed block #{} (hash={}, nonce={}, txs={})",
            self.latest().index,
            self.latest().hash,
            self.latest().nonce,
            self.latest().transactions.len()
        );

        if self.config.auto_adjust {
            self.adjust_difficulty();
        }
        Ok(self.latest())
    }

    fn append(&mut self, block: Block, difficulty: u32) {
        self.ledger.commit(&block);
        self.blocks.push(block);
        self.mined_at.push(difficulty);
    }

    /// Single-threaded mining: prepare, search, commit.
    pub fn mine_pending(&mut self, miner: &str) -> Result<&Block, ChainError> {
        let mut job = self.prepare_mining(miner)?;
        job.run(&AtomicBool::new(false))?;
        self.commit(job)
    }

    /// Retune difficulty from the timing of the last blocks.
    pub fn adjust_difficulty(&mut self) {
        let next =
            difficulty::next_difficulty(&self.blocks, self.difficulty, self.config.max_difficulty);
        if next != self.difficulty {
            info!("CHAIN - difficulty {} -> {}", self.difficulty, next);
            self.difficulty = next;
        }
    }

    /// Check genesis shape, every stored hash and every back-link. Stops at
    /// the first mismatch.
    pub fn ensure_valid(&self) -> Result<(), ChainError> {
        let Some(genesis) = self.blocks.first() else {
            return Err(ChainError::IntegrityViolation {
                index: 0,
                reason: "missing genesis block".into(),
            });
        };
        if genesis.index != 0 || genesis.previous_hash != "0" || !genesis.has_valid_hash() {
            return Err(ChainError::IntegrityViolation {
                index: 0,
                reason: "genesis block was altered".into(),
            });
        }

        for pair in self.blocks.windows(2) {
            let (prev, current) = (&pair[0], &pair[1]);
            if !current.has_valid_hash() {
                return Err(ChainError::IntegrityViolation {
                    index: current.index,
                    reason: "stored hash does not match content".into(),
                });
            }
            if current.previous_hash != prev.hash {
                return Err(ChainError::IntegrityViolation {
                    index: current.index,
                    reason: "previous_hash does not match predecessor".into(),
                });
            }
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        self.ensure_valid().is_ok()
    }

    pub fn get_balance(&self, address: &str) -> Decimal {
        self.ledger.balance_of(&self.blocks, address)
    }

    pub fn get_transaction_history(&self, address: &str) -> Vec<HistoryEntry> {
        self.ledger.history_of(&self.blocks, address)
    }

    pub fn get_block_by_hash(&self, hash: &str) -> Option<Block> {
        self.ledger.block(&self.blocks, hash)
    }

    pub fn get_chain_data(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    /// Timestamp gaps between consecutive blocks, in seconds.
    pub fn block_times(&self) -> Vec<f64> {
        self.blocks
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp) as f64 / 1000.0)
            .collect()
    }

    pub fn get_analytics(&self) -> Analytics {
        let times = self.block_times();
        let avg_block_time = if times.is_empty() {
            0.0
        } else {
            times.iter().sum::<f64>() / times.len() as f64
        };
        Analytics {
            total_blocks: self.blocks.len(),
            avg_block_time,
            difficulty: self.difficulty,
            total_transactions: self.blocks.iter().map(|b| b.transactions.len()).sum(),
        }
    }

    /// Rebuild the balance cache from the chain.
    pub fn resync_ledger(&mut self) -> Result<(), StoreError> {
        self.ledger.resync(&self.blocks)
    }
}

fn clamp_difficulty(difficulty: u32, max: u32) -> u32 {
    difficulty.clamp(DIFF_MIN, max.max(DIFF_MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MemoryStore, scan_balance};
    use std::collections::HashSet;

    fn config(difficulty: u32) -> ChainConfig {
        ChainConfig {
            difficulty,
            mining_reward: Decimal::from(MINING_REWARD),
            max_difficulty: DIFF_MAX,
            auto_adjust: false,
        }
    }

    fn new_chain() -> (Chain, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Chain::new(config(1), store.clone()), store)
    }

    fn submit(chain: &mut Chain, from: &str, to: &str, amount: i64) {
        chain
            .submit_transaction(Transaction::new(from, to, Decimal::from(amount)))
            .unwrap();
    }

    #[test]
    fn starts_with_valid_genesis() {
        let (chain, _) = new_chain();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.latest().previous_hash, "0");
        assert!(chain.latest().hash.starts_with('0'));
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn difficulty_stays_within_configured_max() {
        let store = Arc::new(MemoryStore::new());
        let mut chain = Chain::new(
            ChainConfig {
                difficulty: 20,
                max_difficulty: 2,
                ..config(1)
            },
            store,
        );
        assert_eq!(chain.difficulty(), 2);
        assert_eq!(chain.max_difficulty(), 2);
        assert!(chain.latest().hash.starts_with("00"));

        chain.set_difficulty(9);
        assert_eq!(chain.difficulty(), 2);
        chain.set_difficulty(0);
        assert_eq!(chain.difficulty(), DIFF_MIN);
    }

    #[test]
    fn end_to_end_transfer() {
        let (mut chain, _) = new_chain();
        let genesis = chain.latest().clone();

        submit(&mut chain, "A", "B", 10);
        let block = chain.mine_pending("M").unwrap().clone();

        assert_eq!(chain.len(), 2);
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis.hash);
        assert!(chain.pending().is_empty());
        assert_eq!(chain.get_balance("B"), Decimal::from(10));
        assert_eq!(chain.get_balance("A"), Decimal::from(-10));
        assert_eq!(chain.get_balance("M"), chain.mining_reward());
        assert_eq!(chain.get_block_by_hash(&genesis.hash), Some(genesis));
        assert_eq!(chain.get_block_by_hash("missing"), None);
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn empty_pool_cannot_be_mined() {
        let (mut chain, _) = new_chain();
        assert_eq!(
            chain.mine_pending("M").map(|b| b.index),
            Err(ChainError::NoPendingTransactions)
        );
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn rejected_submission_leaves_pool_alone() {
        let (mut chain, _) = new_chain();
        for tx in [
            Transaction::new("A", "B", Decimal::ZERO),
            Transaction::new("A", "B", Decimal::from(-5)),
            Transaction::new("", "B", Decimal::from(10)),
            Transaction::new("A", "", Decimal::from(10)),
            Transaction::new(NETWORK_SENDER, "B", Decimal::from(10)),
        ] {
            assert!(matches!(
                chain.submit_transaction(tx),
                Err(ChainError::InvalidTransaction(_))
            ));
        }
        assert!(chain.pending().is_empty());

        submit(&mut chain, "A", "B", 10);
        assert_eq!(chain.pending().len(), 1);
    }

    #[test]
    fn empty_miner_address_is_refused() {
        let (mut chain, _) = new_chain();
        submit(&mut chain, "A", "B", 10);
        assert!(matches!(
            chain.mine_pending(" "),
            Err(ChainError::InvalidTransaction(_))
        ));
        assert_eq!(chain.pending().len(), 1);
    }

    #[test]
    fn mined_chains_stay_valid_and_conserve_supply() {
        let (mut chain, store) = new_chain();
        let parties = ["A", "B", "C", "D"];
        for round in 0..6 {
            let from = parties[round % parties.len()];
            let to = parties[(round + 1) % parties.len()];
            submit(&mut chain, from, to, round as i64 + 1);
            submit(&mut chain, to, "E", 2);
            let miner = if round % 2 == 0 { "M1" } else { "M2" };
            chain.mine_pending(miner).unwrap();
            assert!(chain.is_chain_valid());
        }

        let addresses: HashSet<&str> = chain
            .blocks()
            .iter()
            .flat_map(|b| b.transactions.iter())
            .flat_map(|tx| [tx.sender.as_str(), tx.receiver.as_str()])
            .filter(|a| *a != NETWORK_SENDER)
            .collect();
        let total: Decimal = addresses.iter().map(|a| chain.get_balance(a)).sum();
        let mined = Decimal::from(chain.len() as i64 - 1);
        assert_eq!(total, chain.mining_reward() * mined);

        for addr in addresses {
            assert_eq!(store.balance(addr).unwrap(), Some(chain.get_balance(addr)));
            assert_eq!(chain.get_balance(addr), scan_balance(chain.blocks(), addr));
        }
    }

    #[test]
    fn tampering_breaks_validity() {
        let (mut chain, _) = new_chain();
        submit(&mut chain, "A", "B", 10);
        chain.mine_pending("M").unwrap();
        submit(&mut chain, "B", "C", 5);
        chain.mine_pending("M").unwrap();
        assert!(chain.is_chain_valid());

        chain.blocks[1].transactions[0].amount = Decimal::from(1_000);
        assert!(!chain.is_chain_valid());
        assert!(matches!(
            chain.ensure_valid(),
            Err(ChainError::IntegrityViolation { index: 1, .. })
        ));

        // further mining is refused
        submit(&mut chain, "C", "D", 1);
        assert!(matches!(
            chain.mine_pending("M"),
            Err(ChainError::IntegrityViolation { .. })
        ));
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn rehashed_tamper_breaks_linkage() {
        let (mut chain, _) = new_chain();
        submit(&mut chain, "A", "B", 10);
        chain.mine_pending("M").unwrap();
        submit(&mut chain, "B", "C", 5);
        chain.mine_pending("M").unwrap();

        chain.blocks[1].transactions[0].amount = Decimal::from(1_000);
        chain.blocks[1].hash = chain.blocks[1].calculate_hash();
        assert!(matches!(
            chain.ensure_valid(),
            Err(ChainError::IntegrityViolation { index: 2, .. })
        ));
    }

    #[test]
    fn genesis_tamper_is_detected() {
        let (mut chain, _) = new_chain();
        chain.blocks[0].nonce += 1;
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn transactions_submitted_while_mining_stay_pending() {
        let (mut chain, _) = new_chain();
        submit(&mut chain, "A", "B", 10);
        let mut job = chain.prepare_mining("M").unwrap();

        submit(&mut chain, "B", "C", 3);
        job.run(&AtomicBool::new(false)).unwrap();
        chain.commit(job).unwrap();

        assert_eq!(chain.pending().len(), 1);
        assert_eq!(chain.pending()[0].receiver, "C");
        assert_eq!(chain.latest().transactions.len(), 2);

        chain.mine_pending("M").unwrap();
        assert!(chain.pending().is_empty());
        assert_eq!(chain.get_balance("C"), Decimal::from(3));
    }

    #[test]
    fn stale_and_cancelled_jobs_are_refused() {
        let (mut chain, _) = new_chain();
        submit(&mut chain, "A", "B", 10);
        let mut first = chain.prepare_mining("M").unwrap();
        let mut second = chain.prepare_mining("N").unwrap();

        first.run(&AtomicBool::new(false)).unwrap();
        chain.commit(first).unwrap();

        second.run(&AtomicBool::new(false)).unwrap();
        assert!(matches!(chain.commit(second), Err(ChainError::StaleBlock(_))));

        submit(&mut chain, "B", "C", 1);
        let mut cancelled = chain.prepare_mining("M").unwrap();
        cancelled.difficulty = 64;
        assert_eq!(
            cancelled.run(&AtomicBool::new(true)),
            Err(ChainError::MiningCancelled)
        );
        assert!(matches!(chain.commit(cancelled), Err(ChainError::StaleBlock(_))));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.pending().len(), 1);
    }

    fn push_spaced(chain: &mut Chain, count: usize, gap_ms: i64) {
        let start = chain.latest().timestamp;
        for i in 1..=count {
            let b = Block::new_with_timestamp(
                chain.len() as u64,
                Vec::new(),
                chain.latest().hash.clone(),
                start + i as i64 * gap_ms,
            );
            chain.blocks.push(b);
            chain.mined_at.push(chain.difficulty);
        }
    }

    #[test]
    fn adjust_difficulty_follows_block_timing() {
        let (mut chain, _) = new_chain();
        chain.set_difficulty(3);

        push_spaced(&mut chain, 8, 5_000);
        chain.adjust_difficulty();
        assert_eq!(chain.difficulty(), 3, "no-op below 10 blocks");

        push_spaced(&mut chain, 1, 5_000);
        assert_eq!(chain.len(), 10);
        chain.adjust_difficulty();
        assert_eq!(chain.difficulty(), 4);

        let (mut slow, _) = new_chain();
        slow.set_difficulty(3);
        push_spaced(&mut slow, 9, 15_000);
        slow.adjust_difficulty();
        assert_eq!(slow.difficulty(), 2);

        let (mut floor, _) = new_chain();
        push_spaced(&mut floor, 9, 15_000);
        floor.adjust_difficulty();
        assert_eq!(floor.difficulty(), 1);

        let (mut steady, _) = new_chain();
        steady.set_difficulty(3);
        push_spaced(&mut steady, 9, 10_000);
        steady.adjust_difficulty();
        assert_eq!(steady.difficulty(), 3);
    }

    #[test]
    fn analytics_counts_blocks_and_transactions() {
        let (mut chain, _) = new_chain();
        push_spaced(&mut chain, 2, 4_000);
        let stats = chain.get_analytics();
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.total_transactions, 0);
        assert!((stats.avg_block_time - 4.0).abs() < f64::EPSILON);

        submit(&mut chain, "A", "B", 1);
        chain.mine_pending("M").unwrap();
        assert_eq!(chain.get_analytics().total_transactions, 2);
    }

    #[test]
    fn history_lists_both_sides_in_order() {
        let (mut chain, _) = new_chain();
        submit(&mut chain, "A", "B", 10);
        chain.mine_pending("M").unwrap();
        submit(&mut chain, "B", "A", 4);
        chain.mine_pending("M").unwrap();

        let history = chain.get_transaction_history("A");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].transaction.receiver, "B");
        assert_eq!(history[0].block_hash, chain.blocks()[1].hash);
        assert_eq!(history[1].transaction.sender, "B");
        assert_eq!(history[1].block_timestamp, chain.blocks()[2].timestamp);
        assert!(chain.get_transaction_history("nobody").is_empty());
    }

    #[test]
    fn cache_outage_falls_back_to_scan() {
        let (mut chain, store) = new_chain();
        store.set_online(false);
        submit(&mut chain, "A", "B", 10);
        chain.mine_pending("M").unwrap();
        assert!(!chain.ledger().is_synced());
        assert_eq!(chain.get_balance("B"), Decimal::from(10));

        store.set_online(true);
        chain.resync_ledger().unwrap();
        assert_eq!(store.balance("B").unwrap(), Some(Decimal::from(10)));
    }

    #[test]
    fn cache_is_preferred_when_synced() {
        let (mut chain, store) = new_chain();
        submit(&mut chain, "A", "B", 10);
        chain.mine_pending("M").unwrap();
        store.force_balance("B", Decimal::from(99));
        assert_eq!(chain.get_balance("B"), Decimal::from(99));
        assert_eq!(scan_balance(chain.blocks(), "B"), Decimal::from(10));
    }
}
