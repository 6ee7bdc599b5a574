//! Retry pacing for workers whose listener stops handing out connections.

use std::time::Duration;

/// How long an accept worker waits after the listener fails.
///
/// Accept errors are usually transient (descriptor exhaustion while many
/// uploads are open, or an aborted handshake), so workers retry instead of
/// exiting. Each consecutive failure doubles the wait up to `max_delay`; the
/// next accepted upload resets it to `initial_delay`.
///
/// Defaults: 10 milliseconds initial, 1 second maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Wait after the first failed accept.
    pub initial_delay: Duration,
    /// Longest wait between retries.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Repair a hand-built configuration: both waits become at least 1ms and
    /// are swapped if `initial_delay` exceeds `max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use spoolhttp::server::BackoffConfig;
    ///
    /// let cfg = BackoffConfig {
    ///     initial_delay: Duration::from_millis(5),
    ///     max_delay: Duration::ZERO,
    /// }
    /// .normalized();
    /// assert_eq!(cfg.initial_delay, Duration::from_millis(1));
    /// assert_eq!(cfg.max_delay, Duration::from_millis(5));
    /// ```
    #[must_use]
    pub fn normalized(self) -> Self {
        let floor = Duration::from_millis(1);
        let (a, b) = (self.initial_delay.max(floor), self.max_delay.max(floor));
        Self {
            initial_delay: a.min(b),
            max_delay: a.max(b),
        }
    }

    /// Wait to use after another failure following a wait of `current`.
    #[must_use]
    pub fn after_failure(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(10, 20)]
    #[case(600, 1000)]
    #[case(1000, 1000)]
    fn failures_double_the_wait_up_to_the_cap(#[case] current_ms: u64, #[case] next_ms: u64) {
        let cfg = BackoffConfig::default();
        assert_eq!(
            cfg.after_failure(Duration::from_millis(current_ms)),
            Duration::from_millis(next_ms)
        );
    }

    #[test]
    fn ordered_configuration_is_left_alone() {
        let cfg = BackoffConfig::default();
        assert_eq!(cfg.normalized(), cfg);
    }
}
