pub mod monte_carlo;

pub use monte_carlo::{MonteCarloSampler, SamplingDistribution, SamplingSummary};
