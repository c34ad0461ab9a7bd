//! Retry policy and the sleep seam used by the control loop.

use std::time::Duration;

/// Delay between connect attempts at startup.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Blocking sleep, injectable so the loop can be driven without waiting.
pub trait Sleep {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded-backoff retry.
///
/// The delay starts at `initial_delay` and is multiplied by `multiplier` after each failure, never
/// exceeding `max_delay`. With a multiplier of `1.0` the delay is fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f32,
    pub max_delay: Duration,
    /// `None` retries until the operation succeeds.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Unlimited attempts with a constant delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            max_attempts: None,
        }
    }

    /// Delay to wait after the `failures`th consecutive failure (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..failures {
            if delay >= self.max_delay {
                break;
            }
            let grown = delay.as_secs_f32() * self.multiplier.max(1.0);
            delay = Duration::try_from_secs_f32(grown)
                .map_or(self.max_delay, |d| d.min(self.max_delay));
        }
        delay
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// Sleeps between attempts, never after the last one. Returns the last error when the
    /// attempts run out.
    pub fn run<T, E: core::fmt::Display>(
        &self,
        sleeper: &mut impl Sleep,
        what: &str,
        mut operation: impl FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut failures = 0u32;
        loop {
            match operation() {
                Ok(value) => {
                    if failures > 0 {
                        log::info!("{what} succeeded after {failures} failed attempts");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    failures += 1;
                    if self.max_attempts.is_some_and(|max| failures >= max) {
                        log::error!("{what} failed, giving up after {failures} attempts: {e}");
                        return Err(e);
                    }
                    let delay = self.delay_after(failures);
                    log::warn!("{what} failed (attempt {failures}): {e}, retrying in {delay:?}");
                    sleeper.sleep(delay);
                }
            }
        }
    }
}
