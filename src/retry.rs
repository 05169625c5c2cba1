use std::fmt::Display;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, warn};

/// Exponential backoff settings for connection establishment.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts after the first failure.
    pub retries: u32,
    /// Seconds to wait before the first retry.
    pub delay: f64,
    /// Multiplier applied to the wait after every retry.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 60,
            delay: 1.0,
            backoff: 1.05,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(retries: u32, delay: f64, backoff: f64) -> Self {
        Self {
            retries,
            delay,
            backoff,
        }
    }

    /// Never retry.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0.0, 1.0)
    }
}

/// Call `operation`, retrying failures accepted by `is_transient` with exponential backoff.
///
/// Waits are handed to `sleep` rather than slept here, starting at `policy.delay` and
/// multiplied by `policy.backoff` after every retry. When every retry fails, the error from
/// the *first* attempt is returned. An error rejected by `is_transient` is returned at once.
///
/// # Errors
/// Returns the first error if all attempts fail, or the first non-transient error.
pub fn retry<T, E, F, P, S>(
    policy: &RetryPolicy,
    is_transient: P,
    mut sleep: S,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
    S: FnMut(Duration),
    E: Display,
{
    let outer = match operation() {
        Ok(value) => return Ok(value),
        Err(e) if is_transient(&e) => e,
        Err(e) => return Err(e),
    };
    error!(key = "retry.error", error = %outer);

    let mut wait = policy.delay;
    for attempt in 1..=policy.retries {
        warn!(key = "retry.wait", attempt, "Retrying in {wait:.2} seconds...");
        // Waits past what `Duration` can hold saturate.
        sleep(Duration::try_from_secs_f64(wait.max(0.0)).unwrap_or(Duration::MAX));
        wait *= policy.backoff;
        match operation() {
            Ok(value) => return Ok(value),
            Err(inner) if is_transient(&inner) => {
                error!(key = "retry.error", attempt, error = %inner);
            }
            Err(inner) => return Err(inner),
        }
    }
    Err(outer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_without_sleeping() {
        let mut sleeps = Vec::new();
        let result: Result<u8, String> =
            retry(&RetryPolicy::default(), |_| true, |d| sleeps.push(d), || Ok(7));
        assert_eq!(result, Ok(7));
        assert!(sleeps.is_empty());
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), String> = retry(
            &RetryPolicy::default(),
            |e: &String| e == "transient",
            |_| {},
            || {
                calls += 1;
                Err("fatal".to_string())
            },
        );
        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_retries_returns_first_error() {
        let mut calls = 0;
        let result: Result<(), String> = retry(&RetryPolicy::none(), |_| true, |_| {}, || {
            calls += 1;
            Err(format!("attempt {calls}"))
        });
        assert_eq!(result, Err("attempt 1".to_string()));
        assert_eq!(calls, 1);
    }

    #[test]
    fn huge_backoff_saturates_instead_of_panicking() {
        let mut sleeps = Vec::new();
        let result: Result<(), &str> = retry(
            &RetryPolicy::new(5, 1.0, 1e6),
            |_| true,
            |d| sleeps.push(d),
            || Err("refused"),
        );
        assert_eq!(result, Err("refused"));
        assert_eq!(sleeps.len(), 5);
        assert_eq!(sleeps[1], Duration::from_secs(1_000_000));
        assert_eq!(sleeps[4], Duration::MAX);
    }
}
