use actix_web::{HttpResponse, Responder, get, post, web};

use super::models::{
    AppState, BalanceResponse, BuyRequest, ListingsQuery, MintRequest, NewListingRequest,
    NewListingResponse, NewTokenRequest, OkResponse, TokenTransferRequest, token_error_response,
};

#[get("/tokens/")]
pub async fn list_tokens(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.market.tokens())
}

/// Register a new token; the symbol must be unused.
#[post("/tokens/")]
pub async fn create_token(
    state: web::Data<AppState>,
    body: web::Json<NewTokenRequest>,
) -> impl Responder {
    match state
        .market
        .create_token(&body.name, &body.symbol, body.total_supply, body.decimals)
    {
        Ok(info) => HttpResponse::Created().json(info),
        Err(e) => token_error_response(&e),
    }
}

#[get("/tokens/{symbol}/")]
pub async fn get_token(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let symbol = path.into_inner().0;
    match state.market.token(&symbol) {
        Ok(token) => HttpResponse::Ok().json(token.info()),
        Err(e) => token_error_response(&e),
    }
}

#[get("/tokens/{symbol}/balance/{address}/")]
pub async fn get_token_balance(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (symbol, address) = path.into_inner();
    match state.market.token(&symbol) {
        Ok(token) => HttpResponse::Ok().json(BalanceResponse {
            balance: token.balance_of(&address),
            address,
        }),
        Err(e) => token_error_response(&e),
    }
}

#[post("/tokens/{symbol}/mint/")]
pub async fn mint_token(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
    body: web::Json<MintRequest>,
) -> impl Responder {
    let symbol = path.into_inner().0;
    let result = state
        .market
        .token(&symbol)
        .and_then(|token| token.mint(&body.to, body.amount));
    match result {
        Ok(()) => HttpResponse::Ok().json(OkResponse { ok: true }),
        Err(e) => token_error_response(&e),
    }
}

#[post("/tokens/{symbol}/transfer/")]
pub async fn transfer_token(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
    body: web::Json<TokenTransferRequest>,
) -> impl Responder {
    let symbol = path.into_inner().0;
    let result = state
        .market
        .token(&symbol)
        .and_then(|token| token.transfer(&body.sender, &body.receiver, body.amount));
    match result {
        Ok(()) => HttpResponse::Ok().json(OkResponse { ok: true }),
        Err(e) => token_error_response(&e),
    }
}

#[post("/market/listings/")]
pub async fn create_listing(
    state: web::Data<AppState>,
    body: web::Json<NewListingRequest>,
) -> impl Responder {
    match state
        .market
        .list_for_sale(&body.seller, &body.symbol, body.amount, body.price_per_token)
    {
        Ok(listing_id) => HttpResponse::Ok().json(NewListingResponse { listing_id }),
        Err(e) => token_error_response(&e),
    }
}

#[get("/market/listings/")]
pub async fn get_listings(
    state: web::Data<AppState>,
    query: web::Query<ListingsQuery>,
) -> impl Responder {
    HttpResponse::Ok().json(state.market.listings(query.symbol.as_deref()))
}

#[post("/market/buy/")]
pub async fn buy_listing(state: web::Data<AppState>, body: web::Json<BuyRequest>) -> impl Responder {
    match state.market.buy(&body.buyer, body.listing_id, body.amount) {
        Ok(()) => HttpResponse::Ok().json(OkResponse { ok: true }),
        Err(e) => token_error_response(&e),
    }
}
