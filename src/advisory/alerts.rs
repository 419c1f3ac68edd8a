use chrono::Utc;
use serde::Serialize;
use std::sync::Mutex;
use uuid::Uuid;

use super::AnomalyFlag;
use crate::transaction::Transaction;

/// A submitted transfer the anomaly scorer flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FraudAlert {
    pub id: Uuid,
    pub transaction: Transaction,
    pub reason: String,
    pub score: f64,
    pub raised_at: i64, // Unix millis
}

/// Append-only record of fraud alerts, oldest first.
#[derive(Debug, Default)]
pub struct AlertLog {
    alerts: Mutex<Vec<FraudAlert>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, transaction: Transaction, flag: AnomalyFlag) -> FraudAlert {
        let alert = FraudAlert {
            id: Uuid::new_v4(),
            transaction,
            reason: flag.reason,
            score: flag.score,
            raised_at: Utc::now().timestamp_millis(),
        };
        self.alerts
            .lock()
            .expect("mutex poisoned")
            .push(alert.clone());
        alert
    }

    pub fn all(&self) -> Vec<FraudAlert> {
        self.alerts.lock().expect("mutex poisoned").clone()
    }
}
