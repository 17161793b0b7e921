use crate::prelude::{ensure_probability, TrialResult};

/// Cohen's h between two proportions: `2·asin(√p1) − 2·asin(√p2)`.
pub fn proportion_effect_size(p1: f64, p2: f64) -> TrialResult<f64> {
    ensure_probability("p1", p1)?;
    ensure_probability("p2", p2)?;
    Ok(arcsine_transform(p1) - arcsine_transform(p2))
}

fn arcsine_transform(p: f64) -> f64 {
    2.0 * p.sqrt().asin()
}
