use crate::workflow::runner::{PowerReport, WorkflowResult};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use trialcore::prelude::ScenarioParams;
use trialcore::simulation::SamplingSummary;
use trialcore::telemetry::Metrics;

#[derive(Debug, Serialize)]
pub struct ScenarioReport<'a> {
    pub label: &'a str,
    pub params: ScenarioParams,
    pub summary: SamplingSummary,
}

/// Serializable view over one workflow run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub power: &'a PowerReport,
    pub scenarios: Vec<ScenarioReport<'a>>,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<&'a Path>,
}

impl<'a> RunSummary<'a> {
    pub fn new(result: &'a WorkflowResult, chart_path: Option<&'a Path>) -> Self {
        let scenarios = result
            .distributions
            .iter()
            .map(|distribution| ScenarioReport {
                label: distribution.label.as_str(),
                params: distribution.params,
                summary: distribution.summary(),
            })
            .collect();
        Self {
            power: &result.power,
            scenarios,
            metrics: result.metrics,
            chart_path,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let power = self.power;

        let _ = writeln!(
            out,
            "Power analysis (alpha {:.3}, {:?}, reference {:?} = {:.4})",
            power.alpha, power.alternative, power.reference, power.reference_rate
        );
        if power.comparisons.is_empty() {
            let _ = writeln!(out, "  no scenarios to compare against the reference");
        }
        for comparison in &power.comparisons {
            let _ = writeln!(
                out,
                "  {}: observed {:.4}, h = {:.4}",
                comparison.label, comparison.observed_rate, comparison.effect_size
            );
            for entry in &comparison.power {
                let detectable = entry
                    .detectable_effect
                    .map(|h| format!("{:.4}", h))
                    .unwrap_or_else(|| "unreachable".to_string());
                let _ = writeln!(
                    out,
                    "    n = {:>6}: power {:.4}, detectable |h| {}",
                    entry.sample_size, entry.power, detectable
                );
            }
            match comparison.required_sample_size {
                Some(n) => {
                    let _ = writeln!(
                        out,
                        "    n for power {:.2}: {}",
                        power.target_power,
                        n.ceil() as u64
                    );
                }
                None => {
                    let _ = writeln!(out, "    n for power {:.2}: unreachable", power.target_power);
                }
            }
        }

        let _ = writeln!(out, "Sampling distributions");
        for scenario in &self.scenarios {
            let s = &scenario.summary;
            let _ = writeln!(
                out,
                "  {} (n = {}, accuracy {:.2}): mean {:.4} sd {:.4} 95% [{:.4}, {:.4}] bias {:+.4} expected {:.4}",
                scenario.label,
                scenario.params.sample_size,
                scenario.params.accuracy,
                s.mean,
                s.std_dev,
                s.lower_95,
                s.upper_95,
                s.bias,
                s.expected_observed_rate
            );
        }

        let _ = writeln!(
            out,
            "Generated {} datasets / {} observations",
            self.metrics.datasets, self.metrics.observations
        );
        if let Some(path) = self.chart_path {
            let _ = writeln!(out, "Density chart: {}", path.display());
        }
        out
    }
}
