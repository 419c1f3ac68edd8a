use actix_web::{HttpResponse, Responder, get, web};

use super::models::AppState;

#[get("/analytics/")]
pub async fn get_analytics(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.ledger.get_analytics())
}
