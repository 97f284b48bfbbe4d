//! Configuration for the sync driver.

use std::time::Duration;

/// Default period between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(50);

/// Default extra wait after a cycle that found nothing subscribed.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(10);

/// Configuration for [`crate::SyncDriver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Sleep before each poll cycle.
    pub poll_interval: Duration,
    /// Additional sleep after a cycle with an empty registry.
    pub idle_delay: Duration,
    /// Name of the background poller thread.
    pub thread_name: String,
}

impl DriverConfig {
    /// Creates a configuration with the default timings.
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            idle_delay: DEFAULT_IDLE_DELAY,
            thread_name: "sona-poller".into(),
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the idle delay.
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Sets the poller thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings() {
        let config = DriverConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(50));
        assert_eq!(config.idle_delay, Duration::from_secs(10));
    }

    #[test]
    fn config_builder() {
        let config = DriverConfig::new()
            .with_poll_interval(Duration::from_millis(5))
            .with_idle_delay(Duration::from_millis(1))
            .with_thread_name("poller-test");

        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.idle_delay, Duration::from_millis(1));
        assert_eq!(config.thread_name, "poller-test");
    }
}
