//! Waits for an external service to become reachable.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info};

use crate::adapters::live::probe;
use crate::error::{VectorError, VectorResult};

/// Invoke `probe` until it succeeds, starting attempts no more often than
/// once per `interval`.
///
/// After a failure the loop sleeps until `interval` has elapsed since the
/// failed attempt *started*. There is no retry limit; wrap the call in a
/// timeout to bound it.
pub async fn poll<F, Fut, T, E>(mut probe: F, interval: Duration) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u64 = 0;
    loop {
        let started = Instant::now();
        attempt += 1;
        match probe().await {
            Ok(value) => return value,
            Err(e) => debug!(attempt, "probe failed: {e}"),
        }
        sleep_until(started + interval).await;
    }
}

/// Poll `url` (WebSocket handshake or HTTP health check, by scheme) until it
/// answers or `deadline` expires.
///
/// # Errors
///
/// Returns [`VectorError::AvailabilityTimeout`] if the deadline expires first.
pub async fn wait_until_available(
    url: &str,
    interval: Duration,
    deadline: Duration,
) -> VectorResult<()> {
    let client = reqwest::Client::new();
    timeout(deadline, poll(|| probe::probe(&client, url), interval))
        .await
        .map_err(|_| VectorError::AvailabilityTimeout { url: url.to_string(), waited: deadline })?;
    info!(%url, "service is available");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test(start_paused = true)]
    async fn retries_until_probe_succeeds() {
        let attempts = RefCell::new(Vec::new());
        let origin = Instant::now();

        let value = poll(
            || {
                attempts.borrow_mut().push(origin.elapsed());
                let n = attempts.borrow().len();
                async move {
                    if n < 3 {
                        Err(format!("attempt {n} refused"))
                    } else {
                        Ok(n)
                    }
                }
            },
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(value, 3);
        assert_eq!(
            *attempts.borrow(),
            vec![Duration::ZERO, Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn interval_is_measured_from_attempt_start() {
        let attempts = RefCell::new(Vec::new());
        let origin = Instant::now();

        poll(
            || {
                attempts.borrow_mut().push(origin.elapsed());
                let n = attempts.borrow().len();
                async move {
                    // A slow failing probe eats into the wait before the next try.
                    tokio::time::sleep(Duration::from_millis(70)).await;
                    if n < 2 {
                        Err("slow refusal")
                    } else {
                        Ok(())
                    }
                }
            },
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(*attempts.borrow(), vec![Duration::ZERO, Duration::from_millis(100)]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_turns_into_availability_timeout() {
        let err = wait_until_available(
            "http://127.0.0.1:1/rpc",
            Duration::from_millis(100),
            Duration::from_millis(350),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VectorError::AvailabilityTimeout { .. }));
    }
}
