use crate::math::stats::StatsHelper;
use crate::prelude::{TrialError, TrialResult};
use statrs::distribution::{Continuous, Normal};

/// Bandwidth used when every sample is identical.
const DEGENERATE_BANDWIDTH: f64 = 1.0e-3;

/// Gaussian kernel density estimate over a fixed sample.
#[derive(Debug, Clone)]
pub struct KernelDensity {
    samples: Vec<f64>,
    bandwidth: f64,
    kernel: Normal,
}

impl KernelDensity {
    /// Fits with Scott's rule, `σ̂ · n^(−1/5)`.
    pub fn fit(samples: &[f64]) -> TrialResult<Self> {
        if samples.is_empty() {
            return Err(TrialError::InvalidParameter(
                "density estimate needs at least one sample".into(),
            ));
        }
        let scott = StatsHelper::std_dev(samples) * (samples.len() as f64).powf(-0.2);
        let bandwidth = if scott > 0.0 {
            scott
        } else {
            DEGENERATE_BANDWIDTH
        };
        Self::with_bandwidth(samples, bandwidth)
    }

    pub fn with_bandwidth(samples: &[f64], bandwidth: f64) -> TrialResult<Self> {
        if samples.is_empty() {
            return Err(TrialError::InvalidParameter(
                "density estimate needs at least one sample".into(),
            ));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(TrialError::InvalidParameter(
                "density samples must be finite".into(),
            ));
        }
        if !(bandwidth > 0.0) || !bandwidth.is_finite() {
            return Err(TrialError::InvalidParameter(format!(
                "bandwidth must be positive, got {}",
                bandwidth
            )));
        }
        let kernel =
            Normal::new(0.0, 1.0).map_err(|err| TrialError::Internal(err.to_string()))?;
        Ok(Self {
            samples: samples.to_vec(),
            bandwidth,
            kernel,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let total: f64 = self
            .samples
            .iter()
            .map(|&s| self.kernel.pdf((x - s) / self.bandwidth))
            .sum();
        total / (self.samples.len() as f64 * self.bandwidth)
    }

    /// Sample range widened by `cut` bandwidths on each side.
    pub fn support(&self, cut: f64) -> (f64, f64) {
        let (min, max) = StatsHelper::min_max(&self.samples).unwrap_or((0.0, 0.0));
        (min - cut * self.bandwidth, max + cut * self.bandwidth)
    }

    /// Evaluates on `points` evenly spaced abscissae spanning `[lower, upper]`.
    pub fn evaluate_grid(
        &self,
        lower: f64,
        upper: f64,
        points: usize,
    ) -> TrialResult<Vec<(f64, f64)>> {
        if points < 2 {
            return Err(TrialError::InvalidParameter(
                "density grid needs at least two points".into(),
            ));
        }
        if !(upper > lower) {
            return Err(TrialError::InvalidParameter(format!(
                "grid bounds must satisfy lower < upper, got [{}, {}]",
                lower, upper
            )));
        }
        let step = (upper - lower) / (points - 1) as f64;
        Ok((0..points)
            .map(|i| {
                let x = lower + step * i as f64;
                (x, self.evaluate(x))
            })
            .collect())
    }
}
