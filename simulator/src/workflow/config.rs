use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trialcore::math::Alternative;
use trialcore::prelude::{
    ScenarioParams, DEFAULT_ALPHA, DEFAULT_ITERATIONS, HIGH_ACCURACY, LARGE_SAMPLE_SIZE,
    LOW_ACCURACY, SMALL_SAMPLE_SIZE, TRUE_UTILIZATION,
};
use trialcore::visual::chart::DEFAULT_GRID_POINTS;

/// Which proportion the effect size is measured against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectReference {
    /// Observed rate of one dataset drawn for the first scenario.
    #[default]
    SmallAccurateObserved,
    /// The configured population utilization.
    TruePopulation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub label: String,
    pub sample_size: usize,
    pub accuracy: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub true_utilization: f64,
    pub iterations: usize,
    pub seed: u64,
    pub alpha: f64,
    pub target_power: f64,
    pub alternative: Alternative,
    pub effect_reference: EffectReference,
    pub grid_points: usize,
    pub scenarios: Vec<ScenarioConfig>,
    pub output: PathBuf,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            true_utilization: TRUE_UTILIZATION,
            iterations: DEFAULT_ITERATIONS,
            seed: 42,
            alpha: DEFAULT_ALPHA,
            target_power: 0.8,
            alternative: Alternative::TwoSided,
            effect_reference: EffectReference::SmallAccurateObserved,
            grid_points: DEFAULT_GRID_POINTS,
            scenarios: vec![
                ScenarioConfig {
                    label: "Small & Accurate".into(),
                    sample_size: SMALL_SAMPLE_SIZE,
                    accuracy: HIGH_ACCURACY,
                },
                ScenarioConfig {
                    label: "Large & Error-Prone".into(),
                    sample_size: LARGE_SAMPLE_SIZE,
                    accuracy: LOW_ACCURACY,
                },
            ],
            output: PathBuf::from("plots/sampling_bias.png"),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Applies command-line overrides on top of a loaded or default config.
    pub fn with_overrides(
        mut self,
        seed: Option<u64>,
        iterations: Option<usize>,
        alpha: Option<f64>,
        output: Option<PathBuf>,
    ) -> Self {
        if let Some(seed) = seed {
            self.seed = seed;
        }
        if let Some(iterations) = iterations {
            self.iterations = iterations;
        }
        if let Some(alpha) = alpha {
            self.alpha = alpha;
        }
        if let Some(output) = output {
            self.output = output;
        }
        self
    }

    pub fn to_scenarios(&self) -> anyhow::Result<Vec<(String, ScenarioParams)>> {
        if self.scenarios.is_empty() {
            anyhow::bail!("workflow config lists no scenarios");
        }
        self.scenarios
            .iter()
            .map(|scenario| {
                let params = ScenarioParams::new(
                    self.true_utilization,
                    scenario.sample_size,
                    scenario.accuracy,
                )
                .with_context(|| format!("scenario {}", scenario.label))?;
                Ok((scenario.label.clone(), params))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_describes_the_two_canonical_cohorts() {
        let cfg = WorkflowConfig::default();
        let scenarios = cfg.to_scenarios().unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].1, ScenarioParams::small_accurate());
        assert_eq!(scenarios[1].1, ScenarioParams::large_error_prone());
        assert_eq!(cfg.effect_reference, EffectReference::SmallAccurateObserved);
    }

    #[test]
    fn overrides_replace_only_provided_fields() {
        let cfg = WorkflowConfig::default().with_overrides(None, Some(250), Some(0.01), None);
        assert_eq!(cfg.iterations, 250);
        assert_eq!(cfg.alpha, 0.01);
        assert_eq!(cfg.scenarios.len(), 2);

        let cfg = WorkflowConfig::default().with_overrides(
            Some(9),
            None,
            None,
            Some("out.svg".into()),
        );
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.iterations, DEFAULT_ITERATIONS);
        assert_eq!(cfg.output, PathBuf::from("out.svg"));
    }

    #[test]
    fn config_load_reads_partial_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        let yaml = "iterations: 200
seed: 11
effect_reference: true-population
alternative: larger
scenarios:
  - label: Registry
    sample_size: 800
    accuracy: 0.9
";
        temp.write_all(yaml.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.iterations, 200);
        assert_eq!(cfg.seed, 11);
        assert_eq!(cfg.alpha, DEFAULT_ALPHA);
        assert_eq!(cfg.alternative, Alternative::Larger);
        assert_eq!(cfg.effect_reference, EffectReference::TruePopulation);
        assert_eq!(cfg.scenarios[0].label, "Registry");
    }

    #[test]
    fn bundled_workflow_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("workflows/canonical.yaml");
        let cfg = WorkflowConfig::load(path).unwrap();
        let defaults = WorkflowConfig::default();
        assert_eq!(cfg.scenarios, defaults.scenarios);
        assert_eq!(cfg.iterations, defaults.iterations);
        assert_eq!(cfg.output, defaults.output);
    }

    #[test]
    fn invalid_scenarios_are_reported_by_label() {
        let mut cfg = WorkflowConfig::default();
        cfg.scenarios[1].accuracy = 1.4;
        let err = cfg.to_scenarios().unwrap_err();
        assert!(format!("{:#}", err).contains("Large & Error-Prone"));

        cfg.scenarios.clear();
        assert!(cfg.to_scenarios().is_err());
    }
}
