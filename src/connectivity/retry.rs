//! Retry policy for link and session establishment

use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (None = unlimited)
    pub max_attempts: Option<u32>,
    /// Pause between attempts in milliseconds
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Same delay between every attempt
    pub fn fixed(delay_ms: u64, max_attempts: Option<u32>) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// Pause before the next attempt
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Whether another attempt is allowed after `attempts` failures
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Wireless link default: check every 500 ms
impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(500, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::fixed(1000, None);
        assert_eq!(policy.delay(), Duration::from_millis(1000));
        assert_eq!(RetryPolicy::default().delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_allows() {
        let bounded = RetryPolicy::fixed(500, Some(3));
        assert!(bounded.allows(0));
        assert!(bounded.allows(2));
        assert!(!bounded.allows(3));

        let unlimited = RetryPolicy::default();
        assert!(unlimited.allows(u32::MAX - 1));
    }
}
