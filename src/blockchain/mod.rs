pub mod block;
pub mod difficulty;
pub mod model;

pub use block::Block;
pub use model::{Analytics, Chain, ChainConfig, MiningJob};

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Reward paid to the miner of each block.
pub const MINING_REWARD: i64 = 10;

/// How many recent blocks are looked at when adjusting difficulty
pub const DIFF_ADJUST_WINDOW: usize = 10;

/// Mean inter-block time below this raises difficulty (millis)
pub const TARGET_BLOCK_TIME_MIN_MS: f64 = 8_000.0;

/// Mean inter-block time above this lowers difficulty (millis)
pub const TARGET_BLOCK_TIME_MAX_MS: f64 = 12_000.0;

/// Difficulty bounds (keep low in dev to avoid long waits)
pub const DIFF_MIN: u32 = 1;
pub const DIFF_MAX: u32 = 6;
