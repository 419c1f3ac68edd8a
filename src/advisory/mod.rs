//! Advisory models. Neither is ever authoritative over chain state.

pub mod alerts;
pub mod anomaly;
pub mod predictor;

pub use alerts::{AlertLog, FraudAlert};
pub use anomaly::{AmountScorer, AnomalyFlag, AnomalyScorer};
pub use predictor::DifficultyPredictor;
