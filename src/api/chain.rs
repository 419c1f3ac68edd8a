use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, info};

use super::models::{
    AppState, CancelResponse, ChainResponse, DifficultyResponse, MineRequest, PredictResponse,
    SetDifficultyRequest, ValidateResponse, chain_error_response,
};

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.ledger.snapshot();
    HttpResponse::Ok().json(ChainResponse {
        length: snapshot.blocks.len(),
        difficulty: snapshot.difficulty,
        chain: snapshot.blocks,
    })
}

/// Get a single block by its hash.
#[get("/blocks/{hash}/")]
pub async fn get_block(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let hash = path.into_inner().0;
    match state.ledger.get_block(&hash) {
        Ok(block) => HttpResponse::Ok().json(block),
        Err(e) => chain_error_response(&e),
    }
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let report = state.ledger.integrity_report();
    HttpResponse::Ok().json(ValidateResponse {
        valid: report.result.is_ok(),
        length: report.length,
        difficulty: report.difficulty,
        error: report.result.err().map(|e| e.to_string()),
    })
}

/// Mine the pending pool into a new block. The nonce search runs on the
/// blocking pool so other requests are served meanwhile.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let miner_address = req.into_inner().miner_address.trim().to_string();
    let worker = state.clone();
    match web::block(move || worker.ledger.mine(&miner_address)).await {
        Ok(Ok(block)) => {
            info!(
                "MINER - block #{} accepted (hash={}, nonce={})",
                block.index, block.hash, block.nonce
            );
            HttpResponse::Ok().json(block)
        }
        Ok(Err(e)) => chain_error_response(&e),
        Err(e) => {
            error!("MINER - worker failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Abort the block currently being mined, if any.
#[post("/mine/cancel/")]
pub async fn cancel_mining(state: web::Data<AppState>) -> impl Responder {
    state.ledger.cancel_mining();
    HttpResponse::Ok().json(CancelResponse { cancelled: true })
}

/// Get current PoW difficulty.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: state.ledger.difficulty(),
    })
}

/// Update PoW difficulty (affects future blocks only). Bounded by the
/// configured MAX_DIFFICULTY.
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetDifficultyRequest>,
) -> impl Responder {
    match state.ledger.set_difficulty(body.difficulty) {
        Ok(difficulty) => HttpResponse::Ok().json(DifficultyResponse { difficulty }),
        Err(e) => chain_error_response(&e),
    }
}

/// Advisory difficulty estimate from past block times.
#[get("/difficulty/predict/")]
pub async fn predict_difficulty(state: web::Data<AppState>) -> impl Responder {
    let (current, predicted) = state.ledger.predict_difficulty();
    HttpResponse::Ok().json(PredictResponse { current, predicted })
}
