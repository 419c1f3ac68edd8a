mod balance;
mod chain;
mod health;
pub mod models;
mod stats;
mod token;
mod tx;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::get_block)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::cancel_mining)
            .service(chain::get_difficulty)
            .service(chain::set_difficulty)
            .service(chain::predict_difficulty)
            .service(tx::post_transaction)
            .service(tx::get_mempool)
            .service(tx::detect_fraud)
            .service(tx::get_fraud_alerts)
            .service(balance::get_balance)
            .service(balance::get_history)
            .service(stats::get_analytics)
            .service(token::list_tokens)
            .service(token::create_token)
            .service(token::get_token)
            .service(token::get_token_balance)
            .service(token::mint_token)
            .service(token::transfer_token)
            .service(token::create_listing)
            .service(token::get_listings)
            .service(token::buy_listing),
    );
}
