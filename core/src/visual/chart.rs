use crate::prelude::{TrialError, TrialResult};
use crate::simulation::SamplingDistribution;
use crate::visual::density::KernelDensity;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Sampling Distribution of Estimated Utilization";
pub const X_LABEL: &str = "Estimated utilization rate";
pub const Y_LABEL: &str = "Density";
pub const DEFAULT_GRID_POINTS: usize = 200;
/// Bandwidths added beyond the extreme samples on each side of the x-range.
const KDE_CUT: f64 = 3.0;

/// One smoothed series on the chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityCurve {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub bandwidth: f64,
    pub sample_count: usize,
}

impl DensityCurve {
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .copied()
            .fold(None, |best: Option<(f64, f64)>, point| match best {
                Some(current) if current.1 >= point.1 => Some(current),
                _ => Some(point),
            })
    }
}

/// Renderer-neutral overlay of density curves sharing one x-range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_max: f64,
    pub series: Vec<DensityCurve>,
}

impl DensityChart {
    pub fn from_samples(
        title: &str,
        series: &[(&str, &[f64])],
        grid_points: usize,
    ) -> TrialResult<Self> {
        if series.is_empty() {
            return Err(TrialError::InvalidParameter(
                "chart needs at least one series".into(),
            ));
        }

        let estimates = series
            .iter()
            .map(|(label, samples)| KernelDensity::fit(samples).map(|kde| (*label, kde)))
            .collect::<TrialResult<Vec<_>>>()?;

        let (lower, upper) = estimates.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), (_, kde)| {
                let (s_lo, s_hi) = kde.support(KDE_CUT);
                (lo.min(s_lo), hi.max(s_hi))
            },
        );

        let mut curves = Vec::with_capacity(estimates.len());
        for (label, kde) in &estimates {
            curves.push(DensityCurve {
                label: label.to_string(),
                points: kde.evaluate_grid(lower, upper, grid_points)?,
                bandwidth: kde.bandwidth(),
                sample_count: kde.sample_count(),
            });
        }

        let y_max = curves
            .iter()
            .flat_map(|curve| curve.points.iter().map(|&(_, y)| y))
            .fold(0.0, f64::max);

        Ok(Self {
            title: title.to_string(),
            x_label: X_LABEL.to_string(),
            y_label: Y_LABEL.to_string(),
            x_range: (lower, upper),
            y_max,
            series: curves,
        })
    }

    pub fn from_distributions(
        title: &str,
        distributions: &[SamplingDistribution],
        grid_points: usize,
    ) -> TrialResult<Self> {
        let series: Vec<(&str, &[f64])> = distributions
            .iter()
            .map(|d| (d.label.as_str(), d.means.as_slice()))
            .collect();
        Self::from_samples(title, &series, grid_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_shares_one_grid_across_series() {
        let left: Vec<f64> = (0..100).map(|i| 0.2 + 0.001 * (i % 10) as f64).collect();
        let right: Vec<f64> = (0..100).map(|i| 0.44 + 0.0005 * (i % 10) as f64).collect();
        let chart = DensityChart::from_samples(
            DEFAULT_TITLE,
            &[
                ("Small & Accurate", left.as_slice()),
                ("Large & Error-Prone", right.as_slice()),
            ],
            64,
        )
        .unwrap();

        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.x_label, X_LABEL);
        assert_eq!(chart.y_label, Y_LABEL);
        assert!(chart.x_range.0 < 0.2 && chart.x_range.1 > 0.4445);
        for curve in &chart.series {
            assert_eq!(curve.points.len(), 64);
            assert_eq!(curve.points[0].0, chart.x_range.0);
        }
        assert_eq!(chart.series[0].points[10].0, chart.series[1].points[10].0);
    }

    #[test]
    fn peaks_sit_near_each_series_centre_and_bound_y_max() {
        let left: Vec<f64> = (0..200)
            .map(|i| 0.23 + 0.0002 * ((i % 21) as f64 - 10.0))
            .collect();
        let right: Vec<f64> = (0..200)
            .map(|i| 0.44 + 0.0001 * ((i % 21) as f64 - 10.0))
            .collect();
        let chart = DensityChart::from_samples(
            "overlay",
            &[("a", left.as_slice()), ("b", right.as_slice())],
            400,
        )
        .unwrap();

        let (left_x, left_y) = chart.series[0].peak().unwrap();
        let (right_x, right_y) = chart.series[1].peak().unwrap();
        assert!((left_x - 0.23).abs() < 0.005);
        assert!((right_x - 0.44).abs() < 0.005);
        assert!(chart.y_max >= left_y && chart.y_max >= right_y);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(DensityChart::from_samples("none", &[], 10).is_err());
        let hollow: Vec<f64> = Vec::new();
        assert!(DensityChart::from_samples("hollow", &[("a", hollow.as_slice())], 10).is_err());
    }
}
