use serde::{Deserialize, Serialize};

/// Population utilization rate used by the canonical study.
pub const TRUE_UTILIZATION: f64 = 0.20;
/// Sample size of the small, carefully abstracted cohort.
pub const SMALL_SAMPLE_SIZE: usize = 500;
/// Sample size of the large claims-style cohort.
pub const LARGE_SAMPLE_SIZE: usize = 5000;
/// Nominal misclassification rate of the accurate source.
pub const LOW_ERROR_RATE: f64 = 0.05;
/// Nominal misclassification rate of the error-prone source.
pub const HIGH_ERROR_RATE: f64 = 0.40;
pub const HIGH_ACCURACY: f64 = 1.0 - LOW_ERROR_RATE;
pub const LOW_ACCURACY: f64 = 1.0 - HIGH_ERROR_RATE;
pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Common error type for every core operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrialError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("no solution: {0}")]
    NoSolution(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type TrialResult<T> = Result<T, TrialError>;

/// Fails with `InvalidParameter` unless `value` is a probability in [0, 1].
pub fn ensure_probability(name: &str, value: f64) -> TrialResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TrialError::InvalidParameter(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )))
    }
}

/// Data-quality regime for one simulated cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub true_utilization: f64,
    pub sample_size: usize,
    pub accuracy: f64,
}

impl ScenarioParams {
    pub fn new(true_utilization: f64, sample_size: usize, accuracy: f64) -> TrialResult<Self> {
        let params = Self {
            true_utilization,
            sample_size,
            accuracy,
        };
        params.validate()?;
        Ok(params)
    }

    /// Small cohort with accurate labels (n = 500, accuracy = 0.95).
    pub fn small_accurate() -> Self {
        Self {
            true_utilization: TRUE_UTILIZATION,
            sample_size: SMALL_SAMPLE_SIZE,
            accuracy: HIGH_ACCURACY,
        }
    }

    /// Large cohort with noisy labels (n = 5000, accuracy = 0.60).
    pub fn large_error_prone() -> Self {
        Self {
            true_utilization: TRUE_UTILIZATION,
            sample_size: LARGE_SAMPLE_SIZE,
            accuracy: LOW_ACCURACY,
        }
    }

    pub fn validate(&self) -> TrialResult<()> {
        ensure_probability("true_utilization", self.true_utilization)?;
        ensure_probability("accuracy", self.accuracy)?;
        if self.sample_size < 1 {
            return Err(TrialError::InvalidParameter(
                "sample_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn error_rate(&self) -> f64 {
        1.0 - self.accuracy
    }

    /// Mean of the observed labels in expectation: `p·a + (1 − p)·(1 − a)`.
    pub fn expected_observed_rate(&self) -> f64 {
        let p = self.true_utilization;
        let a = self.accuracy;
        p * a + (1.0 - p) * (1.0 - a)
    }
}
