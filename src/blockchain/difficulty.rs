use super::{
    Block, DIFF_ADJUST_WINDOW, DIFF_MIN, TARGET_BLOCK_TIME_MAX_MS, TARGET_BLOCK_TIME_MIN_MS,
};

/// Mean gap between consecutive blocks of the last `DIFF_ADJUST_WINDOW` blocks,
/// in millis. That is `DIFF_ADJUST_WINDOW - 1` deltas, the newest one included.
pub fn window_mean_ms(blocks: &[Block]) -> Option<f64> {
    if blocks.len() < DIFF_ADJUST_WINDOW {
        return None;
    }
    let window = &blocks[blocks.len() - DIFF_ADJUST_WINDOW..];
    let total: i64 = window
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .sum();
    Some(total as f64 / (DIFF_ADJUST_WINDOW - 1) as f64)
}

/// Deterministic retarget rule: +1 when blocks come too fast, -1 (floored at
/// `DIFF_MIN`) when too slow, unchanged otherwise or with a short chain.
/// Increases stop at `max`.
pub fn next_difficulty(blocks: &[Block], current: u32, max: u32) -> u32 {
    let Some(mean) = window_mean_ms(blocks) else {
        return current;
    };
    if mean < TARGET_BLOCK_TIME_MIN_MS {
        if current < max { current + 1 } else { current }
    } else if mean > TARGET_BLOCK_TIME_MAX_MS {
        current.saturating_sub(1).max(DIFF_MIN)
    } else {
        current
    }
}
