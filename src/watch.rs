//! Watch windows for the polling loops.
//!
//! Every loop in the core is a bounded retry parameterized by an (interval,
//! window) pair. The defaults mirror how long the service is contractually
//! allowed to take at each stage; tests construct much shorter windows and
//! run under a paused tokio clock, so no test ever sleeps for real.

use std::time::Duration;

/// Queue-signal poll: how often to re-read the status list right after a
/// trigger (5 seconds), and how long the service has to register its first
/// check runs (1 minute).
const DEFAULT_QUEUE_INTERVAL_SECS: u64 = 5;
const DEFAULT_QUEUE_WINDOW_SECS: u64 = 60;

/// Build submission poll: how often to re-read the Copr build list
/// (30 seconds), and how long the service has to submit a build (15 minutes,
/// measured from the trigger).
const DEFAULT_SUBMIT_INTERVAL_SECS: u64 = 30;
const DEFAULT_SUBMIT_WINDOW_SECS: u64 = 15 * 60;

/// Build completion poll: 20 seconds / 15 minutes.
const DEFAULT_BUILD_INTERVAL_SECS: u64 = 20;
const DEFAULT_BUILD_WINDOW_SECS: u64 = 15 * 60;

/// Status propagation poll: 20 seconds / 20 minutes.
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 20;
const DEFAULT_STATUS_WINDOW_SECS: u64 = 20 * 60;

/// The (interval, window) pairs for the four polling loops of a test case.
#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub queue_interval: Duration,
    pub queue_window: Duration,
    pub submit_interval: Duration,
    pub submit_window: Duration,
    pub build_interval: Duration,
    pub build_window: Duration,
    pub status_interval: Duration,
    pub status_window: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchConfig {
    pub fn new() -> Self {
        WatchConfig {
            queue_interval: Duration::from_secs(DEFAULT_QUEUE_INTERVAL_SECS),
            queue_window: Duration::from_secs(DEFAULT_QUEUE_WINDOW_SECS),
            submit_interval: Duration::from_secs(DEFAULT_SUBMIT_INTERVAL_SECS),
            submit_window: Duration::from_secs(DEFAULT_SUBMIT_WINDOW_SECS),
            build_interval: Duration::from_secs(DEFAULT_BUILD_INTERVAL_SECS),
            build_window: Duration::from_secs(DEFAULT_BUILD_WINDOW_SECS),
            status_interval: Duration::from_secs(DEFAULT_STATUS_INTERVAL_SECS),
            status_window: Duration::from_secs(DEFAULT_STATUS_WINDOW_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_windows_match_service_contract() {
        let config = WatchConfig::new();

        assert_eq!(config.queue_window, Duration::from_secs(60));
        assert_eq!(config.submit_window, Duration::from_secs(900));
        assert_eq!(config.build_window, Duration::from_secs(900));
        assert_eq!(config.status_window, Duration::from_secs(1200));
    }

    #[test]
    fn intervals_divide_windows() {
        let config = WatchConfig::new();

        for (interval, window) in [
            (config.queue_interval, config.queue_window),
            (config.submit_interval, config.submit_window),
            (config.build_interval, config.build_window),
            (config.status_interval, config.status_window),
        ] {
            assert!(interval < window);
            assert_eq!(window.as_secs() % interval.as_secs(), 0);
        }
    }
}
