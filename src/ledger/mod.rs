pub mod balance;
pub mod store;

pub use balance::{BalanceLedger, HistoryEntry, scan_balance, scan_history};
pub use store::{LedgerStore, MemoryStore};
