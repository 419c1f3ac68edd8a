use actix_web::{HttpResponse, Responder, get, post, web};
use log::debug;

use super::models::{
    AppState, FraudAlertsResponse, FraudResponse, MempoolResponse, NewTxRequest, NewTxResponse, chain_error_response,
};
use crate::transaction::Transaction;

/// Submit a new transaction into the pending pool.
#[post("/transactions/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    debug!(
        "POST /transactions/ - {} -> {} amount={}",
        body.sender, body.receiver, body.amount
    );
    match state
        .ledger
        .submit_transaction(&body.sender, &body.receiver, body.amount)
    {
        Ok(transaction) => HttpResponse::Ok().json(NewTxResponse {
            accepted: true,
            transaction,
        }),
        Err(e) => chain_error_response(&e),
    }
}

/// List the pending pool.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> impl Responder {
    let transactions = state.ledger.pending();
    HttpResponse::Ok().json(MempoolResponse {
        size: transactions.len(),
        transactions,
    })
}

/// Score a batch of transfers. Advisory only, nothing is stored.
#[post("/detect_fraud/")]
pub async fn detect_fraud(
    state: web::Data<AppState>,
    body: web::Json<Vec<Transaction>>,
) -> impl Responder {
    HttpResponse::Ok().json(FraudResponse {
        fraud_flags: state.ledger.detect_anomalies(&body),
    })
}

/// Alerts recorded for flagged submissions.
#[get("/fraud/alerts/")]
pub async fn get_fraud_alerts(state: web::Data<AppState>) -> impl Responder {
    let alerts = state.ledger.fraud_alerts();
    HttpResponse::Ok().json(FraudAlertsResponse {
        count: alerts.len(),
        alerts,
    })
}
