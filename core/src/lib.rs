//! Simulation and power-analysis core for the drug-utilization bias study.
//!
//! Synthetic cohorts pair each subject's true exposure with a possibly
//! misclassified record. The crate replicates those cohorts to expose the
//! sampling distribution of the utilization estimate, sizes a one-proportion
//! test on Cohen's h, and builds renderer-neutral density charts.

pub mod generator;
pub mod math;
pub mod prelude;
pub mod simulation;
pub mod telemetry;
pub mod visual;

pub use prelude::{ScenarioParams, TrialError, TrialResult};
