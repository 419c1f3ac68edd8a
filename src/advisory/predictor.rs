use crate::blockchain::DIFF_MIN;

/// Least-squares line of next-block difficulty against the previous block
/// time. Advisory only; the chain keeps its own retarget rule.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyPredictor {
    slope: f64,
    intercept: f64,
}

impl DifficultyPredictor {
    /// Fit on `block_times[..n-1]` against `difficulties[1..]`.
    /// `None` when there are fewer than two usable samples.
    pub fn fit(block_times: &[f64], difficulties: &[u32]) -> Option<Self> {
        let n = block_times.len().min(difficulties.len());
        if n < 3 {
            return None;
        }
        let xs = &block_times[..n - 1];
        let ys: Vec<f64> = difficulties[1..n].iter().map(|d| f64::from(*d)).collect();

        let count = xs.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / count;
        let mean_y = ys.iter().sum::<f64>() / count;
        let cov: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        let var: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();

        let slope = if var > 0.0 { cov / var } else { 0.0 };
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn predict(&self, current_block_time: f64) -> u32 {
        let raw = (self.intercept + self.slope * current_block_time).round();
        if raw.is_finite() && raw > f64::from(DIFF_MIN) {
            raw as u32
        } else {
            DIFF_MIN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_samples() {
        assert_eq!(DifficultyPredictor::fit(&[], &[]), None);
        assert_eq!(DifficultyPredictor::fit(&[1.0, 2.0], &[1, 2]), None);
    }

    #[test]
    fn fits_a_line() {
        // difficulty of block i+1 = 2 * time of block i
        let times = [1.0, 2.0, 3.0, 4.0];
        let diffs = [9, 2, 4, 6];
        let model = DifficultyPredictor::fit(&times, &diffs).unwrap();
        assert_eq!(model.predict(5.0), 10);
    }

    #[test]
    fn flat_history_predicts_mean_and_floors_at_min() {
        let model = DifficultyPredictor::fit(&[3.0, 3.0, 3.0], &[4, 4, 4]).unwrap();
        assert_eq!(model.predict(100.0), 4);

        let falling = DifficultyPredictor::fit(&[1.0, 2.0, 3.0], &[5, 3, 1]).unwrap();
        assert_eq!(falling.predict(50.0), DIFF_MIN);
    }
}
