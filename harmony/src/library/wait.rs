//! Blocking waits and polling for `within N seconds` directives.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::driver::Driver;
use crate::error::Failure;
use crate::library::seconds_arg;
use crate::registry::directives::{Args, HandlerResult};

/// Retry `attempt` until it succeeds or `timeout` elapses.
///
/// `attempt` always runs at least once. On timeout the last failure is
/// returned.
pub fn wait_for_result<T, F>(timeout: Duration, interval: Duration, mut attempt: F) -> Result<T, Failure>
where
    F: FnMut() -> Result<T, Failure>,
{
    let start = Instant::now();
    let mut tries = 0u32;
    loop {
        tries += 1;
        let failure = match attempt() {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            debug!(tries, error = %failure, "gave up waiting");
            return Err(failure);
        }
        thread::sleep(interval.min(timeout - elapsed));
    }
}

/// Block for `duration`, sleeping in `interval` slices.
pub fn block_for(duration: Duration, interval: Duration) {
    let start = Instant::now();
    while let Some(remaining) = duration.checked_sub(start.elapsed()) {
        if remaining.is_zero() {
            break;
        }
        thread::sleep(interval.min(remaining));
    }
}

/// `Wait N seconds`.
pub fn wait_handler(interval: Duration) -> impl Fn(&Args, &mut dyn Driver) -> HandlerResult {
    move |args, _driver| {
        block_for(seconds_arg(args)?, interval);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_success_does_not_sleep() {
        let start = Instant::now();
        let value = wait_for_result(Duration::from_secs(1), Duration::from_millis(200), || {
            Ok::<_, Failure>(7)
        })
        .expect("value");
        assert_eq!(value, 7);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn retries_until_success() {
        let mut calls = 0;
        let value = wait_for_result(Duration::from_secs(2), Duration::from_millis(10), || {
            calls += 1;
            if calls < 3 {
                Err(Failure::element_not_found("#late"))
            } else {
                Ok(calls)
            }
        })
        .expect("eventually");
        assert_eq!(value, 3);
    }

    #[test]
    fn timeout_returns_last_failure() {
        let mut calls = 0;
        let start = Instant::now();
        let err = wait_for_result(Duration::from_millis(50), Duration::from_millis(10), || {
            calls += 1;
            Err::<(), _>(Failure::assertion(format!("attempt {calls}")))
        })
        .expect_err("timeout");
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(err, Failure::assertion(format!("attempt {calls}")));
    }

    #[test]
    fn block_for_waits_at_least_duration() {
        let start = Instant::now();
        block_for(Duration::from_millis(30), Duration::from_millis(200));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
