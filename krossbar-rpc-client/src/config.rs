use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of call slots allocated upfront
    pub initial_capacity: usize,
    /// Deadline for calls which context doesn't have one
    pub default_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            default_timeout: None,
        }
    }
}
