use serde::Serialize;
use std::sync::Mutex;

/// Counts the synthetic data drawn by the sampler.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub datasets: usize,
    pub observations: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_dataset(&self, observations: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.datasets += 1;
            metrics.observations += observations;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_accumulates_datasets_and_observations() {
        let recorder = MetricsRecorder::new();
        recorder.record_dataset(500);
        recorder.record_dataset(250);
        assert_eq!(
            recorder.snapshot(),
            Metrics {
                datasets: 2,
                observations: 750
            }
        );
    }
}
