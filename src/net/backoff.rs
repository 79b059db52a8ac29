use std::time::Duration;

/// Timeout schedule for the attempts of a single exchange: the first attempt waits for
///  `initial_timeout`, and every further attempt waits twice as long as the previous one. After
///  `max_attempts` the schedule is exhausted.
///
/// A fresh instance is created per exchange, so backoff never carries over from one request to
///  the next.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    attempts: u32,
    current_timeout: Duration,

    config_max_attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(initial_timeout: Duration, max_attempts: u32) -> Self {
        ExponentialBackoff {
            attempts: 0,
            current_timeout: initial_timeout,
            config_max_attempts: max_attempts,
        }
    }

    /// Registers the start of another attempt and returns how long to wait for its reply, or
    ///  `None` if all attempts are used up.
    #[must_use]
    pub fn next_timeout(&mut self) -> Option<Duration> {
        if self.attempts >= self.config_max_attempts {
            return None;
        }

        if self.attempts > 0 {
            self.current_timeout = self.current_timeout.saturating_mul(2);
        }
        self.attempts += 1;
        Some(self.current_timeout)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
