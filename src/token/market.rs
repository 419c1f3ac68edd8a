use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use super::{Token, TokenInfo};
use crate::error::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub id: Uuid,
    pub seller: String,
    pub symbol: String,
    pub amount: Decimal,
    pub price_per_token: Decimal,
    pub status: ListingStatus,
}

/// Token registry plus sell orders over the registered tokens.
pub struct Marketplace {
    tokens: RwLock<HashMap<String, Arc<Token>>>,
    listings: Mutex<HashMap<Uuid, Listing>>,
}

impl Marketplace {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: RwLock::new(
                tokens
                    .into_iter()
                    .map(|t| (t.symbol.clone(), Arc::new(t)))
                    .collect(),
            ),
            listings: Mutex::new(HashMap::new()),
        }
    }

    pub fn token(&self, symbol: &str) -> Result<Arc<Token>, TokenError> {
        self.tokens
            .read()
            .expect("rwlock poisoned")
            .get(symbol)
            .cloned()
            .ok_or_else(|| TokenError::UnknownToken(symbol.to_string()))
    }

    /// Register a new token. Symbols are unique.
    pub fn create_token(
        &self,
        name: &str,
        symbol: &str,
        total_supply: Decimal,
        decimals: u32,
    ) -> Result<TokenInfo, TokenError> {
        let (name, symbol) = (name.trim(), symbol.trim());
        if name.is_empty() || symbol.is_empty() {
            return Err(TokenError::InvalidToken(
                "name and symbol must not be empty".into(),
            ));
        }
        if total_supply < Decimal::ZERO {
            return Err(TokenError::InvalidAmount);
        }

        let mut tokens = self.tokens.write().expect("rwlock poisoned");
        if tokens.contains_key(symbol) {
            return Err(TokenError::DuplicateToken(symbol.to_string()));
        }
        let token = Token::new(name, symbol, total_supply, decimals);
        let info = token.info();
        tokens.insert(symbol.to_string(), Arc::new(token));
        info!("MARKET - token {symbol} ({name}) created, supply={total_supply}");
        Ok(info)
    }

    /// Every registered token, ordered by symbol.
    pub fn tokens(&self) -> Vec<TokenInfo> {
        let tokens = self.tokens.read().expect("rwlock poisoned");
        let mut infos: Vec<TokenInfo> = tokens.values().map(|t| t.info()).collect();
        infos.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        infos
    }

    pub fn list_for_sale(
        &self,
        seller: &str,
        symbol: &str,
        amount: Decimal,
        price_per_token: Decimal,
    ) -> Result<Uuid, TokenError> {
        self.token(symbol)?;
        if amount <= Decimal::ZERO || price_per_token < Decimal::ZERO {
            return Err(TokenError::InvalidAmount);
        }
        let listing = Listing {
            id: Uuid::new_v4(),
            seller: seller.to_string(),
            symbol: symbol.to_string(),
            amount,
            price_per_token,
            status: ListingStatus::Open,
        };
        let id = listing.id;
        self.listings
            .lock()
            .expect("mutex poisoned")
            .insert(id, listing);
        info!("MARKET - listed {amount} {symbol} by {seller} (id={id})");
        Ok(id)
    }

    /// Open listings, optionally for one token only.
    pub fn listings(&self, symbol: Option<&str>) -> Vec<Listing> {
        let listings = self.listings.lock().expect("mutex poisoned");
        let mut open: Vec<Listing> = listings
            .values()
            .filter(|l| l.status == ListingStatus::Open)
            .filter(|l| symbol.is_none_or(|s| l.symbol == s))
            .cloned()
            .collect();
        open.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.id.cmp(&b.id)));
        open
    }

    /// Buy part or all of a listing. The token transfer and the listing
    /// update happen under the listings lock, so either both apply or neither.
    pub fn buy(&self, buyer: &str, listing_id: Uuid, amount: Decimal) -> Result<(), TokenError> {
        if amount <= Decimal::ZERO {
            return Err(TokenError::InvalidAmount);
        }
        let mut listings = self.listings.lock().expect("mutex poisoned");
        let listing = listings
            .get_mut(&listing_id)
            .filter(|l| l.status == ListingStatus::Open)
            .ok_or_else(|| TokenError::ListingNotFound(listing_id.to_string()))?;
        if listing.amount < amount {
            return Err(TokenError::InsufficientListing {
                requested: amount,
                available: listing.amount,
            });
        }

        self.token(&listing.symbol)?
            .transfer(&listing.seller, buyer, amount)?;

        listing.amount -= amount;
        if listing.amount <= Decimal::ZERO {
            listing.amount = Decimal::ZERO;
            listing.status = ListingStatus::Closed;
        }
        info!(
            "MARKET - {buyer} bought {amount} {} from {} (listing={listing_id})",
            listing.symbol, listing.seller
        );
        Ok(())
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new([Token::miznet()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market_with_seller(balance: i64) -> Marketplace {
        let market = Marketplace::default();
        market
            .token("MIZ")
            .unwrap()
            .mint("seller", Decimal::from(balance))
            .unwrap();
        market
    }

    #[test]
    fn partial_then_full_purchase_closes_listing() {
        let market = market_with_seller(100);
        let id = market
            .list_for_sale("seller", "MIZ", Decimal::from(10), Decimal::ONE)
            .unwrap();

        market.buy("buyer", id, Decimal::from(4)).unwrap();
        assert_eq!(market.listings(Some("MIZ"))[0].amount, Decimal::from(6));

        market.buy("buyer", id, Decimal::from(6)).unwrap();
        assert!(market.listings(None).is_empty());

        let miz = market.token("MIZ").unwrap();
        assert_eq!(miz.balance_of("buyer"), Decimal::from(10));
        assert_eq!(miz.balance_of("seller"), Decimal::from(90));
        assert!(matches!(
            market.buy("buyer", id, Decimal::ONE),
            Err(TokenError::ListingNotFound(_))
        ));
    }

    #[test]
    fn failed_transfer_keeps_listing_intact() {
        let market = market_with_seller(3);
        let id = market
            .list_for_sale("seller", "MIZ", Decimal::from(10), Decimal::ONE)
            .unwrap();

        assert!(matches!(
            market.buy("buyer", id, Decimal::from(5)),
            Err(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(market.listings(None)[0].amount, Decimal::from(10));
        assert!(matches!(
            market.buy("buyer", id, Decimal::from(11)),
            Err(TokenError::InsufficientListing { .. })
        ));
    }

    #[test]
    fn created_token_can_be_traded() {
        let market = Marketplace::default();
        let info = market
            .create_token("Gold", "GLD", Decimal::from(500), 8)
            .unwrap();
        assert_eq!(info.symbol, "GLD");
        assert_eq!(info.total_supply, Decimal::from(500));
        assert_eq!(
            market.create_token("Other gold", "GLD", Decimal::ONE, 8),
            Err(TokenError::DuplicateToken("GLD".into()))
        );
        assert!(matches!(
            market.create_token(" ", "X", Decimal::ONE, 8),
            Err(TokenError::InvalidToken(_))
        ));
        let symbols: Vec<String> = market.tokens().into_iter().map(|t| t.symbol).collect();
        assert_eq!(symbols, ["GLD", "MIZ"]);

        market
            .token("GLD")
            .unwrap()
            .mint("seller", Decimal::from(5))
            .unwrap();
        let id = market
            .list_for_sale("seller", "GLD", Decimal::from(5), Decimal::TEN)
            .unwrap();
        market.buy("buyer", id, Decimal::from(2)).unwrap();
        assert_eq!(
            market.token("GLD").unwrap().balance_of("buyer"),
            Decimal::from(2)
        );
    }

    #[test]
    fn unknown_token_cannot_be_listed() {
        let market = Marketplace::default();
        assert_eq!(
            market.list_for_sale("s", "NOPE", Decimal::ONE, Decimal::ONE),
            Err(TokenError::UnknownToken("NOPE".into()))
        );
        assert!(market.listings(Some("NOPE")).is_empty());
    }
}
