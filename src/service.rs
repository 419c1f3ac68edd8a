use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::advisory::{AlertLog, AnomalyScorer, DifficultyPredictor, FraudAlert};
use crate::blockchain::{Analytics, Block, Chain, ChainConfig, DIFF_MIN};
use crate::error::{ChainError, StoreError};
use crate::ledger::{HistoryEntry, LedgerStore};
use crate::transaction::Transaction;

/// Owns the chain and serialises writers.
///
/// Readers share the chain lock. Only one `mine` runs at a time (mining
/// lock); the nonce search itself holds no chain lock, so submissions and
/// reads keep flowing while a block is being mined.
pub struct LedgerService {
    chain: RwLock<Chain>,
    mining: Mutex<()>,
    cancel: AtomicBool,
    scorer: Box<dyn AnomalyScorer>,
    alerts: AlertLog,
}

/// Blocks and current difficulty read under one lock.
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    pub blocks: Vec<Block>,
    pub difficulty: u32,
}

/// Outcome of a full validation plus the chain state it ran against.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub result: Result<(), ChainError>,
    pub length: usize,
    pub difficulty: u32,
}

impl LedgerService {
    pub fn new(
        config: ChainConfig,
        store: Arc<dyn LedgerStore>,
        scorer: Box<dyn AnomalyScorer>,
    ) -> Self {
        Self {
            chain: RwLock::new(Chain::new(config, store)),
            mining: Mutex::new(()),
            cancel: AtomicBool::new(false),
            scorer,
            alerts: AlertLog::new(),
        }
    }

    /// Validate and enqueue a transfer. A transfer the anomaly scorer flags
    /// is still accepted; it is logged and recorded as a fraud alert.
    pub fn submit_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: Decimal,
    ) -> Result<Transaction, ChainError> {
        let tx = Transaction::new(sender, receiver, amount);
        let flag = self
            .scorer
            .assess(std::slice::from_ref(&tx))
            .into_iter()
            .next()
            .flatten();

        {
            let mut chain = self.chain.write().expect("rwlock poisoned");
            if let Err(e) = chain.submit_transaction(tx.clone()) {
                warn!("SUBMIT - rejected: {e}");
                return Err(e);
            }
        }

        if let Some(flag) = flag {
            let alert = self.alerts.record(tx.clone(), flag);
            warn!(
                "ANOMALY - transfer {} -> {} amount={} flagged: {} (alert={})",
                tx.sender, tx.receiver, tx.amount, alert.reason, alert.id
            );
        }
        Ok(tx)
    }

    /// Mine the pending pool into a new block paying `miner`.
    pub fn mine(&self, miner: &str) -> Result<Block, ChainError> {
        let _mining = self.mining.lock().expect("mutex poisoned");
        self.cancel.store(false, Ordering::SeqCst);

        let mut job = {
            let chain = self.chain.read().expect("rwlock poisoned");
            chain.prepare_mining(miner).inspect_err(|e| {
                if matches!(e, ChainError::IntegrityViolation { .. }) {
                    error!("INTEGRITY - refusing to mine: {e}");
                }
            })?
        };

        debug!(
            "MINER - searching nonce for block #{} (diff={})",
            job.block().index,
            job.difficulty()
        );
        if let Err(e) = job.run(&self.cancel) {
            info!("MINER - block #{} abandoned: {e}", job.block().index);
            return Err(e);
        }

        let mut chain = self.chain.write().expect("rwlock poisoned");
        chain.commit(job).cloned()
    }

    /// Abort the nonce search in flight, if any. Nothing gets appended.
    pub fn cancel_mining(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        let chain = self.chain.read().expect("rwlock poisoned");
        ChainSnapshot {
            blocks: chain.get_chain_data(),
            difficulty: chain.difficulty(),
        }
    }

    pub fn get_block(&self, hash: &str) -> Result<Block, ChainError> {
        let chain = self.chain.read().expect("rwlock poisoned");
        chain
            .get_block_by_hash(hash)
            .ok_or_else(|| ChainError::BlockNotFound(hash.to_string()))
    }

    pub fn get_balance(&self, address: &str) -> Decimal {
        self.chain.read().expect("rwlock poisoned").get_balance(address)
    }

    pub fn get_transaction_history(&self, address: &str) -> Vec<HistoryEntry> {
        self.chain
            .read()
            .expect("rwlock poisoned")
            .get_transaction_history(address)
    }

    pub fn get_analytics(&self) -> Analytics {
        self.chain.read().expect("rwlock poisoned").get_analytics()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.chain.read().expect("rwlock poisoned").pending().to_vec()
    }

    pub fn difficulty(&self) -> u32 {
        self.chain.read().expect("rwlock poisoned").difficulty()
    }

    /// Operator override, refused outside `1..=max_difficulty`.
    pub fn set_difficulty(&self, difficulty: u32) -> Result<u32, ChainError> {
        let mut chain = self.chain.write().expect("rwlock poisoned");
        let max = chain.max_difficulty();
        if !(DIFF_MIN..=max).contains(&difficulty) {
            return Err(ChainError::InvalidDifficulty {
                requested: difficulty,
                max,
            });
        }
        chain.set_difficulty(difficulty);
        info!("CHAIN - difficulty set to {}", chain.difficulty());
        Ok(chain.difficulty())
    }

    /// Full integrity check. A failure is logged as an alarm.
    pub fn verify_integrity(&self) -> Result<(), ChainError> {
        self.integrity_report().result
    }

    pub fn integrity_report(&self) -> IntegrityReport {
        let chain = self.chain.read().expect("rwlock poisoned");
        let result = chain.ensure_valid().inspect_err(|e| {
            error!("INTEGRITY - chain failed validation: {e}");
        });
        IntegrityReport {
            result,
            length: chain.len(),
            difficulty: chain.difficulty(),
        }
    }

    /// Rebuild the balance cache from the chain.
    pub fn resync_cache(&self) -> Result<(), StoreError> {
        let mut chain = self.chain.write().expect("rwlock poisoned");
        chain.resync_ledger().inspect_err(|e| {
            error!("LEDGER - resync failed: {e}");
        })
    }

    pub fn detect_anomalies(&self, transactions: &[Transaction]) -> Vec<bool> {
        self.scorer.score(transactions)
    }

    /// Alerts raised on accepted submissions, oldest first.
    pub fn fraud_alerts(&self) -> Vec<FraudAlert> {
        self.alerts.all()
    }

    /// Current difficulty and the advisory next difficulty from historical
    /// block times; the prediction is `None` while history is too short.
    pub fn predict_difficulty(&self) -> (u32, Option<u32>) {
        let chain = self.chain.read().expect("rwlock poisoned");
        let times = chain.block_times();
        let predicted = chain
            .mined_at()
            .get(1..)
            .and_then(|diffs| DifficultyPredictor::fit(&times, diffs))
            .and_then(|model| times.last().map(|t| model.predict(*t)));
        (chain.difficulty(), predicted)
    }
}
