pub mod effect;
pub mod power;
pub mod stats;

pub use effect::proportion_effect_size;
pub use power::{Alternative, PowerAnalysis, PowerQuery, PowerSolution};
pub use stats::StatsHelper;
