use log::{debug, info};

/// Component-scoped wrapper around the `log` facade.
#[derive(Debug, Clone)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn trace_step(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }
}
