use actix_web::HttpResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::advisory::{AmountScorer, FraudAlert};
use crate::blockchain::Block;
use crate::config::Config;
use crate::error::{ChainError, TokenError};
use crate::ledger::{HistoryEntry, LedgerStore, MemoryStore};
use crate::service::LedgerService;
use crate::token::Marketplace;
use crate::transaction::Transaction;

/// Shared application state: the ledger service and the token marketplace.
pub struct AppState {
    pub ledger: LedgerService,
    pub market: Marketplace,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger: LedgerService::new(
                config.chain.clone(),
                store,
                Box::new(AmountScorer::new(config.anomaly_threshold)),
            ),
            market: Marketplace::default(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&Config::default(), Arc::new(MemoryStore::new()))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map an engine error to its HTTP status.
pub fn chain_error_response(err: &ChainError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        ChainError::InvalidTransaction(_)
        | ChainError::NoPendingTransactions
        | ChainError::InvalidDifficulty { .. } => HttpResponse::BadRequest().json(body),
        ChainError::BlockNotFound(_) => HttpResponse::NotFound().json(body),
        ChainError::IntegrityViolation { .. } | ChainError::StaleBlock(_) => {
            HttpResponse::Conflict().json(body)
        }
        ChainError::MiningCancelled => HttpResponse::ServiceUnavailable().json(body),
    }
}

pub fn token_error_response(err: &TokenError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        TokenError::UnknownToken(_) | TokenError::ListingNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        TokenError::DuplicateToken(_) => HttpResponse::Conflict().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub difficulty: u32,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Serialize, Deserialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty: u32,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub current: u32,
    pub predicted: Option<u32>,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub accepted: bool,
    pub transaction: Transaction,
}

#[derive(Serialize)]
pub struct MempoolResponse {
    pub size: usize,
    pub transactions: Vec<Transaction>,
}

#[derive(Serialize)]
pub struct FraudResponse {
    pub fraud_flags: Vec<bool>,
}

#[derive(Serialize)]
pub struct FraudAlertsResponse {
    pub count: usize,
    pub alerts: Vec<FraudAlert>,
}

/* ---------- Balance API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: Decimal,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub address: String,
    pub transactions: Vec<HistoryEntry>,
}

/* ---------- Token / Market API Models ---------- */

#[derive(Deserialize)]
pub struct NewTokenRequest {
    pub name: String,
    pub symbol: String,
    pub total_supply: Decimal,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_decimals() -> u32 {
    18
}

#[derive(Deserialize)]
pub struct MintRequest {
    pub to: String,
    pub amount: Decimal,
}

#[derive(Deserialize)]
pub struct TokenTransferRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
}

#[derive(Deserialize)]
pub struct NewListingRequest {
    pub seller: String,
    pub symbol: String,
    pub amount: Decimal,
    pub price_per_token: Decimal,
}

#[derive(Serialize)]
pub struct NewListingResponse {
    pub listing_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListingsQuery {
    pub symbol: Option<String>,
}

#[derive(Deserialize)]
pub struct BuyRequest {
    pub buyer: String,
    pub listing_id: Uuid,
    pub amount: Decimal,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
