use crate::workflow::config::{EffectReference, WorkflowConfig};
use anyhow::Context;
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use trialcore::generator::generate_dataset;
use trialcore::math::{proportion_effect_size, Alternative, PowerAnalysis, PowerQuery};
use trialcore::simulation::{MonteCarloSampler, SamplingDistribution};
use trialcore::telemetry::{Metrics, MetricsRecorder};
use trialcore::visual::chart::{DensityChart, DEFAULT_TITLE};
use trialcore::TrialError;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PowerAtSize {
    pub sample_size: usize,
    pub power: f64,
    /// Smallest |h| reaching the target power at this sample size.
    pub detectable_effect: Option<f64>,
}

/// Effect of one scenario's observed rate against the reference rate.
#[derive(Debug, Clone, Serialize)]
pub struct EffectComparison {
    pub label: String,
    pub observed_rate: f64,
    pub effect_size: f64,
    pub power: Vec<PowerAtSize>,
    pub required_sample_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerReport {
    pub alpha: f64,
    pub alternative: Alternative,
    pub target_power: f64,
    pub reference: EffectReference,
    pub reference_rate: f64,
    pub comparisons: Vec<EffectComparison>,
}

pub struct WorkflowResult {
    pub power: PowerReport,
    pub distributions: Vec<SamplingDistribution>,
    pub chart: DensityChart,
    pub metrics: Metrics,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let power = self.power_analysis().context("running power analysis")?;
        let distributions = self.sample_distributions()?;
        let chart = DensityChart::from_distributions(
            DEFAULT_TITLE,
            &distributions,
            self.config.grid_points,
        )
        .context("building density chart")?;

        Ok(WorkflowResult {
            power,
            distributions,
            chart,
            metrics: self.metrics.snapshot(),
        })
    }

    /// Draws one dataset per scenario and sizes the test on the resulting
    /// effect against the configured reference.
    pub fn power_analysis(&self) -> anyhow::Result<PowerReport> {
        let scenarios = self.config.to_scenarios()?;
        let analysis = PowerAnalysis::new(self.config.alpha, self.config.alternative)
            .context("configuring power analysis")?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut observed = Vec::with_capacity(scenarios.len());
        for (label, params) in &scenarios {
            let dataset = generate_dataset(&mut rng, params)
                .with_context(|| format!("generating dataset for {}", label))?;
            observed.push(dataset.observed_mean());
        }

        let (reference_rate, first_compared) = match self.config.effect_reference {
            EffectReference::SmallAccurateObserved => (observed[0], 1),
            EffectReference::TruePopulation => (self.config.true_utilization, 0),
        };

        let mut sample_sizes: Vec<usize> = scenarios.iter().map(|(_, p)| p.sample_size).collect();
        sample_sizes.sort_unstable();
        sample_sizes.dedup();

        let mut comparisons = Vec::new();
        for ((label, _), &observed_rate) in scenarios.iter().zip(&observed).skip(first_compared) {
            let effect_size = proportion_effect_size(reference_rate, observed_rate)
                .with_context(|| format!("effect size for {}", label))?;

            let mut power = Vec::with_capacity(sample_sizes.len());
            for &sample_size in &sample_sizes {
                let nobs = sample_size as f64;
                let achieved = analysis
                    .power(effect_size, nobs)
                    .with_context(|| format!("power for {} at n = {}", label, sample_size))?;
                let query = PowerQuery::EffectSize {
                    nobs,
                    power: self.config.target_power,
                };
                let detectable_effect = match analysis.solve(query).map(|h| h.value().abs()) {
                    Ok(h) => Some(h),
                    Err(TrialError::NoSolution(reason)) => {
                        warn!(
                            "{}: no detectable effect at n = {} ({})",
                            label, sample_size, reason
                        );
                        None
                    }
                    Err(err) => return Err(err).context("solving detectable effect"),
                };
                power.push(PowerAtSize {
                    sample_size,
                    power: achieved,
                    detectable_effect,
                });
            }

            let required_sample_size =
                match analysis.required_sample_size(effect_size, self.config.target_power) {
                    Ok(n) => Some(n),
                    Err(TrialError::NoSolution(reason)) => {
                        warn!("{}: no required sample size ({})", label, reason);
                        None
                    }
                    Err(err) => return Err(err).context("solving required sample size"),
                };

            info!(
                "{}: observed {:.4} vs reference {:.4}, h = {:.4}",
                label, observed_rate, reference_rate, effect_size
            );
            comparisons.push(EffectComparison {
                label: label.clone(),
                observed_rate,
                effect_size,
                power,
                required_sample_size,
            });
        }

        Ok(PowerReport {
            alpha: analysis.alpha(),
            alternative: analysis.alternative(),
            target_power: self.config.target_power,
            reference: self.config.effect_reference,
            reference_rate,
            comparisons,
        })
    }

    /// Monte Carlo replication per scenario, reseeding before each run.
    pub fn sample_distributions(&self) -> anyhow::Result<Vec<SamplingDistribution>> {
        let scenarios = self.config.to_scenarios()?;
        let mut distributions = Vec::with_capacity(scenarios.len());
        for (label, params) in scenarios {
            let sampler = MonteCarloSampler::new(label.as_str(), params, self.config.iterations)
                .with_context(|| format!("configuring sampler for {}", label))?
                .with_metrics(self.metrics.clone());
            let distribution = sampler
                .run_seeded(self.config.seed)
                .with_context(|| format!("sampling {}", label))?;
            distributions.push(distribution);
        }
        Ok(distributions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::ScenarioConfig;

    fn quick_config() -> WorkflowConfig {
        let mut cfg = WorkflowConfig::default().with_overrides(Some(42), Some(20), None, None);
        cfg.scenarios = vec![
            ScenarioConfig {
                label: "Small & Accurate".into(),
                sample_size: 200,
                accuracy: 0.95,
            },
            ScenarioConfig {
                label: "Large & Error-Prone".into(),
                sample_size: 800,
                accuracy: 0.6,
            },
        ];
        cfg.grid_points = 50;
        cfg
    }

    #[test]
    fn runner_executes_workflow() {
        let runner = Runner::new(quick_config());
        let result = runner.execute().unwrap();

        assert_eq!(result.distributions.len(), 2);
        assert!(result.distributions.iter().all(|d| d.means.len() == 20));
        assert_eq!(result.chart.series.len(), 2);
        assert_eq!(result.chart.series[0].points.len(), 50);
        assert_eq!(result.metrics.datasets, 40);
        assert_eq!(result.metrics.observations, 20 * 200 + 20 * 800);

        let comparisons = &result.power.comparisons;
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].label, "Large & Error-Prone");
        assert_eq!(comparisons[0].power.len(), 2);
        assert!(comparisons[0].power[1].power >= comparisons[0].power[0].power);

        // Larger samples detect smaller effects.
        let small_n = comparisons[0].power[0].detectable_effect.unwrap();
        let large_n = comparisons[0].power[1].detectable_effect.unwrap();
        assert!(small_n > large_n && large_n > 0.0);
        // ((1.96 + 0.8416) / √800)^2 ≈ 0.0990 in h
        assert!((large_n - 0.0990).abs() < 1e-3, "h {large_n}");
    }

    #[test]
    fn wrong_direction_alternative_leaves_sample_size_unsolved() {
        let mut cfg = quick_config();
        cfg.alternative = Alternative::Larger;
        let report = Runner::new(cfg).power_analysis().unwrap();

        let comparison = &report.comparisons[0];
        // The error-prone rate exceeds the accurate one, so h < 0.
        assert!(comparison.effect_size < 0.0);
        assert!(comparison.required_sample_size.is_none());
        assert!(comparison.power.iter().all(|entry| entry.power < report.alpha));
        assert!(comparison
            .power
            .iter()
            .all(|entry| entry.detectable_effect.is_some()));
    }

    #[test]
    fn true_population_reference_compares_every_scenario() {
        let mut cfg = quick_config();
        cfg.effect_reference = EffectReference::TruePopulation;
        let report = Runner::new(cfg).power_analysis().unwrap();
        assert_eq!(report.reference_rate, 0.2);
        assert_eq!(report.comparisons.len(), 2);
        // Misclassification inflates the observed rate, so h is negative.
        assert!(report.comparisons[1].effect_size < 0.0);
        assert!(report.comparisons[1].required_sample_size.is_some());
    }

    #[test]
    fn reruns_with_the_same_seed_are_identical() {
        let first = Runner::new(quick_config()).sample_distributions().unwrap();
        let second = Runner::new(quick_config()).sample_distributions().unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.means, b.means);
        }
    }
}
