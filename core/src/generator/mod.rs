pub mod observation;

pub use observation::{generate_dataset, Dataset, ObservationRecord};
