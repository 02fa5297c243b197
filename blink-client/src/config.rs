use std::time::Duration;

/// Metadata is refetched this often unless configured otherwise.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Settings of an [`crate::executor::ActionExecutor`].
///
/// `ExecutorConfig::default()` is used whenever no configuration is supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    refresh_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { refresh_interval: DEFAULT_REFRESH_INTERVAL }
    }
}

impl ExecutorConfig {
    pub fn new(refresh_interval: Duration) -> Self {
        Self { refresh_interval }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}
