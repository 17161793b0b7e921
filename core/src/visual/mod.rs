pub mod chart;
pub mod density;

pub use chart::{DensityChart, DensityCurve};
pub use density::KernelDensity;
