use crate::prelude::{ScenarioParams, TrialError, TrialResult};
use rand::distributions::{Bernoulli, Distribution};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One simulated subject: the true exposure and what the record says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub true_label: u8,
    pub observed_label: u8,
}

impl ObservationRecord {
    pub fn is_misclassified(&self) -> bool {
        self.true_label != self.observed_label
    }
}

/// Ordered collection of observation records for one cohort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<ObservationRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Utilization estimate from the recorded labels.
    pub fn observed_mean(&self) -> f64 {
        self.label_mean(|record| record.observed_label)
    }

    pub fn true_mean(&self) -> f64 {
        self.label_mean(|record| record.true_label)
    }

    pub fn mismatch_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let flipped = self
            .records
            .iter()
            .filter(|record| record.is_misclassified())
            .count();
        flipped as f64 / self.records.len() as f64
    }

    fn label_mean<F>(&self, label: F) -> f64
    where
        F: Fn(&ObservationRecord) -> u8,
    {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: u64 = self.records.iter().map(|r| u64::from(label(r))).sum();
        total as f64 / self.records.len() as f64
    }
}

/// Draws `sample_size` subjects: the true label is Bernoulli(true_utilization)
/// and the observed label keeps it when `u < accuracy`, otherwise flips it.
pub fn generate_dataset<R: Rng>(
    rng: &mut R,
    params: &ScenarioParams,
) -> TrialResult<Dataset> {
    params.validate()?;

    let exposure = Bernoulli::new(params.true_utilization)
        .map_err(|err| TrialError::InvalidParameter(format!("true_utilization: {}", err)))?;

    let mut records = Vec::with_capacity(params.sample_size);
    for _ in 0..params.sample_size {
        let true_label = u8::from(exposure.sample(rng));
        let u: f64 = rng.gen();
        let observed_label = if u < params.accuracy {
            true_label
        } else {
            1 - true_label
        };
        records.push(ObservationRecord {
            true_label,
            observed_label,
        });
    }

    Ok(Dataset { records })
}
