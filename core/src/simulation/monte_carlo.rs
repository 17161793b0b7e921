use crate::generator::generate_dataset;
use crate::math::stats::StatsHelper;
use crate::prelude::{ScenarioParams, TrialError, TrialResult, DEFAULT_ITERATIONS};
use crate::telemetry::{LogManager, MetricsRecorder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

/// Replicates the generate-then-average cycle for one scenario.
pub struct MonteCarloSampler {
    label: String,
    params: ScenarioParams,
    iterations: usize,
    metrics: Option<Arc<MetricsRecorder>>,
    logger: LogManager,
}

impl MonteCarloSampler {
    pub fn new(
        label: impl Into<String>,
        params: ScenarioParams,
        iterations: usize,
    ) -> TrialResult<Self> {
        params.validate()?;
        if iterations < 1 {
            return Err(TrialError::InvalidParameter(
                "iterations must be at least 1".into(),
            ));
        }
        Ok(Self {
            label: label.into(),
            params,
            iterations,
            metrics: None,
            logger: LogManager::new("monte_carlo"),
        })
    }

    pub fn with_default_iterations(
        label: impl Into<String>,
        params: ScenarioParams,
    ) -> TrialResult<Self> {
        Self::new(label, params, DEFAULT_ITERATIONS)
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Draws `iterations` fresh datasets from `rng` and keeps each observed mean.
    pub fn run<R: Rng>(&self, rng: &mut R) -> TrialResult<SamplingDistribution> {
        let mut means = Vec::with_capacity(self.iterations);
        for iteration in 0..self.iterations {
            let dataset = generate_dataset(rng, &self.params)?;
            if let Some(metrics) = &self.metrics {
                metrics.record_dataset(dataset.len());
            }
            means.push(dataset.observed_mean());
            if iteration % 250 == 0 {
                self.logger.trace_step(&format!(
                    "{} iteration {} of {}",
                    self.label, iteration, self.iterations
                ));
            }
        }

        let distribution = SamplingDistribution {
            label: self.label.clone(),
            params: self.params,
            means,
        };
        let summary = distribution.summary();
        self.logger.record(&format!(
            "{}: n={} accuracy={:.2} mean={:.4} sd={:.4}",
            self.label, self.params.sample_size, self.params.accuracy, summary.mean, summary.std_dev
        ));
        Ok(distribution)
    }

    /// Runs against a freshly seeded `StdRng`, so equal seeds give equal output.
    pub fn run_seeded(&self, seed: u64) -> TrialResult<SamplingDistribution> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.run(&mut rng)
    }
}

/// Empirical sampling distribution of the observed utilization estimate.
#[derive(Debug, Clone, Serialize)]
pub struct SamplingDistribution {
    pub label: String,
    pub params: ScenarioParams,
    pub means: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingSummary {
    pub iterations: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub lower_95: f64,
    pub upper_95: f64,
    /// Mean estimate minus the true utilization.
    pub bias: f64,
    pub mean_squared_error: f64,
    pub expected_observed_rate: f64,
}

impl SamplingDistribution {
    pub fn summary(&self) -> SamplingSummary {
        let mean = StatsHelper::mean(&self.means);
        let variance = StatsHelper::variance(&self.means);
        let bias = mean - self.params.true_utilization;
        let mean_squared_error = StatsHelper::mean(
            &self
                .means
                .iter()
                .map(|m| (m - self.params.true_utilization).powi(2))
                .collect::<Vec<_>>(),
        );
        SamplingSummary {
            iterations: self.means.len(),
            mean,
            variance,
            std_dev: variance.sqrt(),
            lower_95: StatsHelper::quantile(&self.means, 0.025),
            upper_95: StatsHelper::quantile(&self.means, 0.975),
            bias,
            mean_squared_error,
            expected_observed_rate: self.params.expected_observed_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_returns_one_mean_per_iteration() {
        let params = ScenarioParams::new(0.2, 40, 0.9).unwrap();
        let sampler = MonteCarloSampler::new("tiny", params, 37).unwrap();
        let distribution = sampler.run_seeded(3).unwrap();
        assert_eq!(distribution.means.len(), 37);
        assert!(distribution.means.iter().all(|m| (0.0..=1.0).contains(m)));
        assert_eq!(distribution.label, "tiny");
    }

    #[test]
    fn sampler_rejects_zero_iterations_and_bad_params() {
        let params = ScenarioParams::small_accurate();
        assert!(matches!(
            MonteCarloSampler::new("none", params, 0),
            Err(TrialError::InvalidParameter(_))
        ));
        let bad = ScenarioParams {
            accuracy: -0.2,
            ..params
        };
        assert!(matches!(
            MonteCarloSampler::new("bad", bad, 10),
            Err(TrialError::InvalidParameter(_))
        ));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let sampler =
            MonteCarloSampler::new("repeat", ScenarioParams::small_accurate(), 50).unwrap();
        let first = sampler.run_seeded(2024).unwrap();
        let second = sampler.run_seeded(2024).unwrap();
        let other = sampler.run_seeded(2025).unwrap();
        assert_eq!(first.means, second.means);
        assert_ne!(first.means, other.means);
    }

    #[test]
    fn metrics_count_every_generated_dataset() {
        let metrics = Arc::new(MetricsRecorder::new());
        let params = ScenarioParams::new(0.2, 25, 0.8).unwrap();
        let sampler = MonteCarloSampler::new("counted", params, 12)
            .unwrap()
            .with_metrics(metrics.clone());
        sampler.run_seeded(9).unwrap();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.datasets, 12);
        assert_eq!(snapshot.observations, 12 * 25);
    }

    #[test]
    fn small_accurate_scenario_is_tight_around_the_true_rate() {
        let sampler = MonteCarloSampler::with_default_iterations(
            "Small & Accurate",
            ScenarioParams::small_accurate(),
        )
        .unwrap();
        let summary = sampler.run_seeded(42).unwrap().summary();
        assert_eq!(summary.iterations, 1000);
        assert!((summary.mean - summary.expected_observed_rate).abs() < 0.005);
        assert!(summary.bias.abs() < 0.05);
        assert!(summary.std_dev < 0.025);
        assert!(summary.lower_95 < summary.mean && summary.mean < summary.upper_95);
    }

    #[test]
    fn large_error_prone_scenario_is_biased_towards_one_half() {
        let accurate = MonteCarloSampler::with_default_iterations(
            "Small & Accurate",
            ScenarioParams::small_accurate(),
        )
        .unwrap()
        .run_seeded(42)
        .unwrap()
        .summary();
        let noisy = MonteCarloSampler::with_default_iterations(
            "Large & Error-Prone",
            ScenarioParams::large_error_prone(),
        )
        .unwrap()
        .run_seeded(42)
        .unwrap()
        .summary();

        assert!((noisy.mean - 0.44).abs() < 0.005);
        assert!(noisy.bias > 0.2);
        assert!(noisy.bias > accurate.bias);
        // The 95% band of the noisy estimator never covers the true rate.
        assert!(noisy.lower_95 > 0.2);
        assert!(noisy.mean_squared_error > accurate.mean_squared_error);
    }
}
