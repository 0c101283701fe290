//! Bounded-attempt retry around a single operation.

use crate::config::RetryDelay;
use std::future::Future;
use tracing::{debug, warn};

/// An operation failed on every permitted attempt. Only the final failure is kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Operation failed after {attempts} attempts: {last}")]
pub struct RetryExhaustedError<E> {
	/// Number of attempts actually made
	pub attempts: u32,
	/// Error returned by the last attempt
	#[source]
	pub last: E,
}

impl<E> RetryExhaustedError<E> {
	pub fn into_inner(self) -> E {
		self.last
	}
}

/// Retry settings: attempt ceiling plus the delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
	delay: RetryDelay,
}

impl RetryPolicy {
	/// A policy without delay between attempts. `max_attempts` below one is treated as one.
	pub fn new(max_attempts: u32) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			delay: RetryDelay::None,
		}
	}

	pub fn with_delay(mut self, delay: RetryDelay) -> Self {
		self.delay = delay;
		self
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Runs `operation` until it succeeds or the attempt ceiling is hit.
	///
	/// The operation is called at most `max_attempts` times whatever the delay schedule.
	/// There is no per-attempt timeout: a call that never completes stalls the retry.
	pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryExhaustedError<E>>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
		E: std::fmt::Display,
	{
		let mut schedule = self.delay.schedule();
		let mut attempt = 0;

		loop {
			attempt += 1;
			let error = match operation().await {
				Ok(value) => {
					if attempt > 1 {
						debug!("Operation succeeded on attempt {}", attempt);
					}
					return Ok(value);
				}
				Err(error) => error,
			};

			if attempt >= self.max_attempts {
				warn!("Attempt {}/{} failed, giving up: {}", attempt, self.max_attempts, error);
				return Err(RetryExhaustedError {
					attempts: attempt,
					last: error,
				});
			}

			match schedule.next_backoff() {
				Some(delay) => {
					warn!(
						"Attempt {}/{} failed, retrying in {:?}: {}",
						attempt, self.max_attempts, delay, error
					);
					if !delay.is_zero() {
						tokio::time::sleep(delay).await;
					}
				}
				None => {
					warn!("Retry schedule exhausted after attempt {}: {}", attempt, error);
					return Err(RetryExhaustedError {
						attempts: attempt,
						last: error,
					});
				}
			}
		}
	}
}

/// Runs `operation` up to `max_attempts` times with no delay between attempts.
pub async fn retry<T, E, F, Fut>(operation: F, max_attempts: u32) -> Result<T, RetryExhaustedError<E>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	RetryPolicy::new(max_attempts).run(operation).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::time::Duration;

	fn failing_until(
		success_on: u32,
		calls: Arc<AtomicU32>,
	) -> impl FnMut() -> futures::future::Ready<Result<u32, String>> {
		move || {
			let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
			if call >= success_on {
				futures::future::ready(Ok(call))
			} else {
				futures::future::ready(Err(format!("failure {}", call)))
			}
		}
	}

	#[tokio::test]
	async fn test_first_success_calls_once() {
		let calls = Arc::new(AtomicU32::new(0));
		let result = retry(failing_until(1, calls.clone()), 3).await;
		assert_eq!(result, Ok(1));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_succeeds_on_last_attempt() {
		let calls = Arc::new(AtomicU32::new(0));
		let result = retry(failing_until(3, calls.clone()), 3).await;
		assert_eq!(result, Ok(3));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_exhaustion_keeps_only_last_error() {
		let calls = Arc::new(AtomicU32::new(0));
		let err = retry(failing_until(u32::MAX, calls.clone()), 3)
			.await
			.unwrap_err();
		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert_eq!(err.attempts, 3);
		assert_eq!(err.last, "failure 3");
	}

	#[tokio::test]
	async fn test_zero_attempts_still_calls_once() {
		let calls = Arc::new(AtomicU32::new(0));
		let err = retry(failing_until(u32::MAX, calls.clone()), 0)
			.await
			.unwrap_err();
		assert_eq!(err.attempts, 1);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_fixed_delay_between_attempts() {
		let calls = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::new(3).with_delay(RetryDelay::Fixed(Duration::from_secs(2)));

		let started = tokio::time::Instant::now();
		let result = policy.run(failing_until(3, calls.clone())).await;
		assert_eq!(result, Ok(3));
		let elapsed = started.elapsed();
		assert!(elapsed >= Duration::from_secs(4));
		assert!(elapsed < Duration::from_secs(5));
	}

	#[tokio::test(start_paused = true)]
	async fn test_exponential_delay_never_exceeds_attempts() {
		let calls = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::new(4).with_delay(RetryDelay::Exponential {
			initial: Duration::from_millis(10),
			max_interval: Duration::from_millis(50),
			max_elapsed: None,
		});

		let err = policy
			.run(failing_until(u32::MAX, calls.clone()))
			.await
			.unwrap_err();
		assert_eq!(err.attempts, 4);
		assert_eq!(calls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn test_exponential_elapsed_ceiling_stops_early() {
		let calls = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::new(5).with_delay(RetryDelay::Exponential {
			initial: Duration::from_millis(10),
			max_interval: Duration::from_millis(50),
			max_elapsed: Some(Duration::ZERO),
		});

		let err = policy
			.run(failing_until(u32::MAX, calls.clone()))
			.await
			.unwrap_err();
		assert_eq!(err.attempts, 1);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(err.into_inner(), "failure 1");
	}
}
