pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Unbiased sample variance (n − 1 denominator).
    pub fn variance(samples: &[f64]) -> f64 {
        if samples.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(samples);
        let sum_sq: f64 = samples.iter().map(|&v| (v - mean) * (v - mean)).sum();
        sum_sq / (samples.len() - 1) as f64
    }

    pub fn std_dev(samples: &[f64]) -> f64 {
        Self::variance(samples).sqrt()
    }

    /// Linear-interpolated quantile, `q` in [0, 1]. NaN-free input assumed.
    pub fn quantile(samples: &[f64], q: f64) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * weight
    }

    pub fn min_max(samples: &[f64]) -> Option<(f64, f64)> {
        if samples.is_empty() {
            return None;
        }
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}
