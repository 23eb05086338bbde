//! Bounded polling with exponential backoff.
//!
//! Every wait in the workspace (deployment status, user-operation receipts,
//! intent leg receipts) goes through [`poll_until`]. The loop always
//! terminates: the check reports a value, the check fails, or the attempt
//! budget runs out and the outcome is inconclusive.

use std::future::Future;
use std::time::Duration;
use wallet_config::PollSettings;

/// Attempt budget and pacing for one polling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
	pub interval: Duration,
	pub max_attempts: u32,
	pub backoff_multiplier: f64,
	pub max_interval: Duration,
}

impl PollPolicy {
	/// Policy with a constant interval.
	pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
		Self {
			interval,
			max_attempts,
			backoff_multiplier: 1.0,
			max_interval: interval,
		}
	}

	/// Grows `current` by the multiplier, capped at `max_interval`.
	///
	/// Products that overflow `Duration` or are not finite saturate at the cap.
	fn next_interval(&self, current: Duration) -> Duration {
		let cap = self.max_interval.max(self.interval);
		Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier.max(1.0))
			.unwrap_or(cap)
			.min(cap)
	}
}

impl From<&PollSettings> for PollPolicy {
	fn from(settings: &PollSettings) -> Self {
		Self {
			interval: settings.interval(),
			max_attempts: settings.max_attempts,
			backoff_multiplier: settings.backoff_multiplier,
			max_interval: settings.max_interval(),
		}
	}
}

/// Result of a polling loop that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
	/// The check produced a value on attempt `attempts`.
	Ready { value: T, attempts: u32 },
	/// The attempt budget ran out without a value.
	Inconclusive { attempts: u32 },
}

impl<T> PollOutcome<T> {
	pub fn attempts(&self) -> u32 {
		match self {
			PollOutcome::Ready { attempts, .. } | PollOutcome::Inconclusive { attempts } => {
				*attempts
			},
		}
	}

	pub fn into_value(self) -> Option<T> {
		match self {
			PollOutcome::Ready { value, .. } => Some(value),
			PollOutcome::Inconclusive { .. } => None,
		}
	}
}

/// Calls `check` until it yields `Some`, fails, or the budget is spent.
///
/// The check receives the 1-based attempt number. The first check runs
/// immediately; later checks are spaced by the policy's backoff.
pub async fn poll_until<T, E, F, Fut>(
	policy: &PollPolicy,
	mut check: F,
) -> Result<PollOutcome<T>, E>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<Option<T>, E>>,
{
	let mut delay = policy.interval;
	for attempt in 1..=policy.max_attempts {
		if let Some(value) = check(attempt).await? {
			return Ok(PollOutcome::Ready {
				value,
				attempts: attempt,
			});
		}
		if attempt < policy.max_attempts {
			tokio::time::sleep(delay).await;
			delay = policy.next_interval(delay);
		}
	}

	tracing::debug!(attempts = policy.max_attempts, "Polling budget exhausted");
	Ok(PollOutcome::Inconclusive {
		attempts: policy.max_attempts,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;
	use tokio::time::Instant;

	#[tokio::test(start_paused = true)]
	async fn test_stops_at_first_ready_check() {
		let checks = Arc::new(AtomicU32::new(0));
		let counter = checks.clone();
		let policy = PollPolicy::fixed(Duration::from_secs(2), 10);

		let outcome: PollOutcome<&str> = poll_until(&policy, |attempt| {
			let counter = counter.clone();
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok::<_, ()>((attempt == 3).then_some("deployed"))
			}
		})
		.await
		.unwrap();

		assert_eq!(
			outcome,
			PollOutcome::Ready {
				value: "deployed",
				attempts: 3
			}
		);
		assert_eq!(checks.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_exhausted_budget_is_inconclusive() {
		let policy = PollPolicy {
			interval: Duration::from_secs(1),
			max_attempts: 4,
			backoff_multiplier: 2.0,
			max_interval: Duration::from_secs(3),
		};
		let start = Instant::now();

		let outcome: PollOutcome<()> = poll_until(&policy, |_| async { Ok::<_, ()>(None) })
			.await
			.unwrap();

		assert_eq!(outcome, PollOutcome::Inconclusive { attempts: 4 });
		// Sleeps of 1s, 2s and a capped 3s between the four checks.
		assert_eq!(start.elapsed(), Duration::from_secs(6));
	}

	#[tokio::test(start_paused = true)]
	async fn test_check_error_stops_polling() {
		let policy = PollPolicy::fixed(Duration::from_millis(10), 5);
		let result: Result<PollOutcome<()>, &str> =
			poll_until(&policy, |attempt| async move {
				if attempt == 2 {
					Err("rpc down")
				} else {
					Ok(None)
				}
			})
			.await;
		assert_eq!(result, Err("rpc down"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_oversized_multiplier_saturates_at_cap() {
		let policy = PollPolicy {
			interval: Duration::from_secs(1),
			max_attempts: 5,
			backoff_multiplier: 1e20,
			max_interval: Duration::from_secs(4),
		};
		let start = Instant::now();

		let outcome: PollOutcome<()> = poll_until(&policy, |_| async { Ok::<_, ()>(None) })
			.await
			.unwrap();

		assert_eq!(outcome, PollOutcome::Inconclusive { attempts: 5 });
		// 1s, then 4s three times.
		assert_eq!(start.elapsed(), Duration::from_secs(13));

		let unbounded = PollPolicy {
			backoff_multiplier: f64::INFINITY,
			..policy.clone()
		};
		assert_eq!(unbounded.next_interval(Duration::from_secs(1)), Duration::from_secs(4));
		let nan = PollPolicy {
			backoff_multiplier: f64::NAN,
			..policy
		};
		assert_eq!(nan.next_interval(Duration::from_secs(1)), Duration::from_secs(1));
	}

	#[test]
	fn test_policy_from_settings() {
		let settings = PollSettings {
			interval_ms: 500,
			max_attempts: 8,
			backoff_multiplier: 1.5,
			max_interval_ms: 2_000,
		};
		let policy = PollPolicy::from(&settings);
		assert_eq!(policy.interval, Duration::from_millis(500));
		assert_eq!(policy.next_interval(Duration::from_millis(1_600)), Duration::from_secs(2));
	}
}
