pub mod model;

pub use model::{MAX_TRANSFER_AMOUNT, NETWORK_SENDER, Transaction};
