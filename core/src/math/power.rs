use crate::prelude::{TrialError, TrialResult, DEFAULT_ALPHA};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const BISECTION_STEPS: usize = 200;
const RELATIVE_TOLERANCE: f64 = 1.0e-12;

/// Direction of the alternative hypothesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    #[default]
    TwoSided,
    Larger,
    Smaller,
}

/// Exactly one unknown of the (effect size, sample size, power) triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerQuery {
    Power { effect_size: f64, nobs: f64 },
    SampleSize { effect_size: f64, power: f64 },
    EffectSize { nobs: f64, power: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "solved_for", content = "value", rename_all = "snake_case")]
pub enum PowerSolution {
    Power(f64),
    SampleSize(f64),
    EffectSize(f64),
}

impl PowerSolution {
    pub fn value(&self) -> f64 {
        match *self {
            PowerSolution::Power(v)
            | PowerSolution::SampleSize(v)
            | PowerSolution::EffectSize(v) => v,
        }
    }
}

/// Normal-approximation power for a one-sample proportion test on Cohen's h.
///
/// Under the alternative the test statistic is N(h·√n, 1), so the two-sided
/// power is `Φ(h√n − z) + Φ(−h√n − z)` with `z = z_{1−α/2}`. One-sided
/// variants use `z_{1−α}` and keep only the matching tail.
#[derive(Debug, Clone)]
pub struct PowerAnalysis {
    alpha: f64,
    alternative: Alternative,
    normal: Normal,
}

impl PowerAnalysis {
    pub fn new(alpha: f64, alternative: Alternative) -> TrialResult<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(TrialError::InvalidParameter(format!(
                "alpha must lie in (0, 1), got {}",
                alpha
            )));
        }
        let normal =
            Normal::new(0.0, 1.0).map_err(|err| TrialError::Internal(err.to_string()))?;
        Ok(Self {
            alpha,
            alternative,
            normal,
        })
    }

    pub fn two_sided(alpha: f64) -> TrialResult<Self> {
        Self::new(alpha, Alternative::TwoSided)
    }

    /// Two-sided test at the conventional 5% level.
    pub fn standard() -> TrialResult<Self> {
        Self::two_sided(DEFAULT_ALPHA)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alternative(&self) -> Alternative {
        self.alternative
    }

    /// Critical value of the standard normal for the configured test.
    pub fn critical_value(&self) -> f64 {
        match self.alternative {
            Alternative::TwoSided => self.normal.inverse_cdf(1.0 - self.alpha / 2.0),
            Alternative::Larger | Alternative::Smaller => {
                self.normal.inverse_cdf(1.0 - self.alpha)
            }
        }
    }

    /// Achieved power for effect size `h` at sample size `nobs`.
    pub fn power(&self, effect_size: f64, nobs: f64) -> TrialResult<f64> {
        ensure_finite("effect_size", effect_size)?;
        if !(nobs > 0.0) || !nobs.is_finite() {
            return Err(TrialError::InvalidParameter(format!(
                "sample size must be positive, got {}",
                nobs
            )));
        }
        Ok(self.power_at(effect_size, nobs))
    }

    /// Smallest (fractional) sample size reaching `target_power`.
    pub fn required_sample_size(&self, effect_size: f64, target_power: f64) -> TrialResult<f64> {
        ensure_finite("effect_size", effect_size)?;
        self.ensure_reachable_target(target_power)?;
        if effect_size == 0.0 {
            return Err(TrialError::NoSolution(
                "zero effect size never exceeds the false-positive rate".into(),
            ));
        }

        let wrong_direction = match self.alternative {
            Alternative::TwoSided => false,
            Alternative::Larger => effect_size < 0.0,
            Alternative::Smaller => effect_size > 0.0,
        };
        if wrong_direction {
            return Err(TrialError::NoSolution(format!(
                "effect size {} points away from the {:?} alternative",
                effect_size, self.alternative
            )));
        }

        // Single-tail closed form; power there is at least the target up to rounding.
        let z_target = self.normal.inverse_cdf(target_power);
        let estimate = ((self.critical_value() + z_target) / effect_size.abs()).powi(2);
        let mut lower = 0.0;
        let mut upper = if estimate.is_finite() && estimate > 0.0 {
            estimate
        } else {
            1.0
        };
        while self.power_at(effect_size, upper) < target_power {
            lower = upper;
            upper *= 2.0;
            if !upper.is_finite() {
                return Err(TrialError::NoSolution(format!(
                    "power {} is not reachable for effect size {} with {:?}",
                    target_power, effect_size, self.alternative
                )));
            }
        }

        Ok(bisect(lower, upper, |n| {
            self.power_at(effect_size, n) >= target_power
        }))
    }

    /// Smallest effect magnitude detectable with `target_power` at `nobs`.
    /// Negative for the `Smaller` alternative.
    pub fn minimum_effect_size(&self, nobs: f64, target_power: f64) -> TrialResult<f64> {
        if !(nobs > 0.0) || !nobs.is_finite() {
            return Err(TrialError::InvalidParameter(format!(
                "sample size must be positive, got {}",
                nobs
            )));
        }
        self.ensure_reachable_target(target_power)?;

        let sign = match self.alternative {
            Alternative::Smaller => -1.0,
            Alternative::TwoSided | Alternative::Larger => 1.0,
        };
        if self.power_at(sign * PI, nobs) < target_power {
            return Err(TrialError::NoSolution(format!(
                "power {} is not reachable with {} observations",
                target_power, nobs
            )));
        }

        let magnitude = bisect(0.0, PI, |h| self.power_at(sign * h, nobs) >= target_power);
        Ok(sign * magnitude)
    }

    pub fn solve(&self, query: PowerQuery) -> TrialResult<PowerSolution> {
        match query {
            PowerQuery::Power { effect_size, nobs } => {
                self.power(effect_size, nobs).map(PowerSolution::Power)
            }
            PowerQuery::SampleSize { effect_size, power } => self
                .required_sample_size(effect_size, power)
                .map(PowerSolution::SampleSize),
            PowerQuery::EffectSize { nobs, power } => self
                .minimum_effect_size(nobs, power)
                .map(PowerSolution::EffectSize),
        }
    }

    fn power_at(&self, effect_size: f64, nobs: f64) -> f64 {
        let shift = effect_size * nobs.sqrt();
        let crit = self.critical_value();
        match self.alternative {
            Alternative::TwoSided => {
                self.normal.cdf(shift - crit) + self.normal.cdf(-shift - crit)
            }
            Alternative::Larger => self.normal.cdf(shift - crit),
            Alternative::Smaller => self.normal.cdf(-shift - crit),
        }
    }

    fn ensure_reachable_target(&self, target_power: f64) -> TrialResult<()> {
        if !(target_power > 0.0 && target_power < 1.0) {
            return Err(TrialError::InvalidParameter(format!(
                "target power must lie in (0, 1), got {}",
                target_power
            )));
        }
        if target_power <= self.alpha {
            return Err(TrialError::NoSolution(format!(
                "target power {} does not exceed alpha {}",
                target_power, self.alpha
            )));
        }
        Ok(())
    }
}

fn ensure_finite(name: &str, value: f64) -> TrialResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TrialError::InvalidParameter(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}

/// Narrows `[lower, upper]` to the boundary where `reached` flips to true.
/// `reached(upper)` must hold on entry.
fn bisect<F>(mut lower: f64, mut upper: f64, reached: F) -> f64
where
    F: Fn(f64) -> bool,
{
    for _ in 0..BISECTION_STEPS {
        if upper - lower <= RELATIVE_TOLERANCE * upper.abs().max(1.0) {
            break;
        }
        let mid = 0.5 * (lower + upper);
        if reached(mid) {
            upper = mid;
        } else {
            lower = mid;
        }
    }
    0.5 * (lower + upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::effect::proportion_effect_size;

    fn analysis() -> PowerAnalysis {
        PowerAnalysis::standard().unwrap()
    }

    #[test]
    fn critical_value_matches_standard_table() {
        assert!((analysis().critical_value() - 1.959_963_984_540_054).abs() < 1e-9);
        let one_sided = PowerAnalysis::new(0.05, Alternative::Larger).unwrap();
        assert!((one_sided.critical_value() - 1.644_853_626_951_472_2).abs() < 1e-9);
    }

    #[test]
    fn zero_effect_power_equals_alpha() {
        for &alpha in &[0.01, 0.05, 0.2] {
            for &alternative in &[
                Alternative::TwoSided,
                Alternative::Larger,
                Alternative::Smaller,
            ] {
                let analysis = PowerAnalysis::new(alpha, alternative).unwrap();
                for &n in &[1.0, 37.0, 500.0, 5000.0] {
                    let power = analysis.power(0.0, n).unwrap();
                    assert!((power - alpha).abs() < 1e-9, "alpha {alpha} n {n} power {power}");
                }
            }
        }
    }

    #[test]
    fn power_is_non_decreasing_in_sample_size() {
        let analysis = analysis();
        for &h in &[-0.3, 0.05, 0.2] {
            let mut previous = 0.0;
            for n in (1..=3000).step_by(7) {
                let power = analysis.power(h, n as f64).unwrap();
                assert!(power + 1e-15 >= previous, "h {h} n {n}");
                previous = power;
            }
        }
    }

    #[test]
    fn power_matches_closed_form_value() {
        // h·√n = 0.1·√500 ≈ 2.2361; Φ(0.2761) + Φ(−4.1961) ≈ 0.6088
        let power = analysis().power(0.1, 500.0).unwrap();
        assert!((power - 0.6088).abs() < 1e-3, "power {power}");
    }

    #[test]
    fn sample_size_round_trips_through_power() {
        let analysis = analysis();
        let h = 0.1;
        let power = analysis.power(h, 500.0).unwrap();
        let n = analysis.required_sample_size(h, power).unwrap();
        assert!((n - 500.0).abs() < 1e-6, "recovered {n}");

        let negative = analysis.required_sample_size(-h, power).unwrap();
        assert!((negative - 500.0).abs() < 1e-6);
    }

    #[test]
    fn effect_size_round_trips_through_power() {
        let analysis = analysis();
        let power = analysis.power(0.15, 400.0).unwrap();
        let h = analysis.minimum_effect_size(400.0, power).unwrap();
        assert!((h - 0.15).abs() < 1e-9, "recovered {h}");
    }

    #[test]
    fn solve_dispatches_on_the_unknown() {
        let analysis = analysis();
        let power = analysis
            .solve(PowerQuery::Power {
                effect_size: 0.2,
                nobs: 200.0,
            })
            .unwrap();
        assert!(matches!(power, PowerSolution::Power(_)));

        let nobs = analysis
            .solve(PowerQuery::SampleSize {
                effect_size: 0.2,
                power: power.value(),
            })
            .unwrap();
        assert!((nobs.value() - 200.0).abs() < 1e-6);
    }

    #[test]
    fn canonical_study_effect_size_is_well_powered_at_large_n() {
        let h = proportion_effect_size(0.23, 0.44).unwrap();
        let analysis = analysis();
        let small = analysis.power(h, 500.0).unwrap();
        let large = analysis.power(h, 5000.0).unwrap();
        assert!(small > 0.99);
        assert!(large >= small);
    }

    #[test]
    fn tiny_effect_still_has_a_sample_size() {
        let analysis = analysis();
        let h = 1e-6;
        let n = analysis.required_sample_size(h, 0.8).unwrap();
        // ((1.96 + 0.8416) / 1e-6)^2 ≈ 7.85e12
        assert!((n / 7.849e12 - 1.0).abs() < 1e-3, "n {n}");
        let achieved = analysis.power(h, n).unwrap();
        assert!((achieved - 0.8).abs() < 1e-6, "power {achieved}");

        let larger = PowerAnalysis::new(0.05, Alternative::Larger).unwrap();
        assert!(larger.required_sample_size(1e-7, 0.95).unwrap() > 1e14);
    }

    #[test]
    fn one_sided_wrong_direction_has_no_solution() {
        let larger = PowerAnalysis::new(0.05, Alternative::Larger).unwrap();
        assert!(matches!(
            larger.required_sample_size(-0.2, 0.8),
            Err(TrialError::NoSolution(_))
        ));
        let n = larger.required_sample_size(0.2, 0.8).unwrap();
        // ((1.6449 + 0.8416) / 0.2)^2 ≈ 154.6
        assert!((n - 154.56).abs() < 0.1, "n {n}");

        let smaller = PowerAnalysis::new(0.05, Alternative::Smaller).unwrap();
        assert!(smaller.minimum_effect_size(100.0, 0.8).unwrap() < 0.0);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            PowerAnalysis::two_sided(0.0),
            Err(TrialError::InvalidParameter(_))
        ));
        assert!(matches!(
            PowerAnalysis::two_sided(1.0),
            Err(TrialError::InvalidParameter(_))
        ));
        let analysis = analysis();
        assert!(matches!(
            analysis.power(0.2, 0.0),
            Err(TrialError::InvalidParameter(_))
        ));
        assert!(matches!(
            analysis.power(0.2, -5.0),
            Err(TrialError::InvalidParameter(_))
        ));
        assert!(matches!(
            analysis.required_sample_size(0.2, 1.0),
            Err(TrialError::InvalidParameter(_))
        ));
        assert!(matches!(
            analysis.required_sample_size(0.0, 0.8),
            Err(TrialError::NoSolution(_))
        ));
        assert!(matches!(
            analysis.required_sample_size(0.2, 0.03),
            Err(TrialError::NoSolution(_))
        ));
    }
}
