use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::transaction::Transaction;

/// Batches smaller than this skip the statistical check.
const MIN_BATCH_FOR_STATS: usize = 3;

/// How many standard deviations above the batch mean counts as an outlier.
const Z_SCORE_LIMIT: f64 = 3.0;

/// Why a transfer was flagged and how strongly.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyFlag {
    pub reason: String,
    pub score: f64,
}

/// Maps a batch of transfers to a parallel list of flags. Advisory only.
pub trait AnomalyScorer: Send + Sync {
    fn assess(&self, transactions: &[Transaction]) -> Vec<Option<AnomalyFlag>>;

    fn score(&self, transactions: &[Transaction]) -> Vec<bool> {
        self.assess(transactions)
            .iter()
            .map(Option::is_some)
            .collect()
    }
}

/// Flags transfers above a fixed amount, or far above the rest of the batch.
#[derive(Debug, Clone)]
pub struct AmountScorer {
    threshold: Decimal,
}

impl AmountScorer {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }
}

impl AnomalyScorer for AmountScorer {
    fn assess(&self, transactions: &[Transaction]) -> Vec<Option<AnomalyFlag>> {
        let amounts: Vec<f64> = transactions
            .iter()
            .map(|tx| tx.amount.to_f64().unwrap_or(f64::MAX))
            .collect();

        // (mean, std) of the batch when it is big enough and not uniform
        let stats = if amounts.len() >= MIN_BATCH_FOR_STATS {
            let n = amounts.len() as f64;
            let mean = amounts.iter().sum::<f64>() / n;
            let var = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            (std > 0.0).then_some((mean, std))
        } else {
            None
        };
        let threshold = self.threshold.to_f64().unwrap_or(f64::MAX);

        transactions
            .iter()
            .zip(&amounts)
            .map(|(tx, amount)| {
                if tx.amount > self.threshold {
                    return Some(AnomalyFlag {
                        reason: format!("amount {} above threshold {}", tx.amount, self.threshold),
                        score: if threshold > 0.0 { amount / threshold } else { *amount },
                    });
                }
                let (mean, std) = stats?;
                let z = (amount - mean) / std;
                (z > Z_SCORE_LIMIT).then(|| AnomalyFlag {
                    reason: format!("amount {} is {z:.1} std devs above the batch mean", tx.amount),
                    score: z,
                })
            })
            .collect()
    }
}
