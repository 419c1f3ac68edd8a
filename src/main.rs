use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;

use smartchain::api::{self, AppState};
use smartchain::config::Config;
use smartchain::ledger::MemoryStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    info!(
        "config: difficulty={} reward={} auto_adjust={} anomaly_threshold={}",
        config.chain.difficulty,
        config.chain.mining_reward,
        config.chain.auto_adjust,
        config.anomaly_threshold
    );

    println!(
        "⛓️ Starting ledger API at http://{}:{}",
        config.host, config.port
    );

    let state = web::Data::new(AppState::new(&config, Arc::new(MemoryStore::new())));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
