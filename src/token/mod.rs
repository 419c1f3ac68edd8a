pub mod market;
pub mod model;

pub use market::{Listing, ListingStatus, Marketplace};
pub use model::{Token, TokenInfo};
