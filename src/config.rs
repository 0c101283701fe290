//! Client configuration.
//!
//! Plain structs with defaults; callers override individual fields with the `with_*`
//! builders. Nothing here is read from files or the command line.

use crate::provider::Network;
use crate::transaction::{DEFAULT_BROADCAST_ATTEMPTS, DEFAULT_FEE_UNITS};
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::{Backoff, Constant, Zero};
use std::time::Duration;

/// Delay applied between retry attempts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RetryDelay {
	/// Retry immediately.
	#[default]
	None,
	/// Wait the same amount before every retry.
	Fixed(Duration),
	/// Exponentially growing, randomized delay. Retrying stops early once
	/// `max_elapsed` has passed since the first attempt.
	Exponential {
		initial: Duration,
		max_interval: Duration,
		max_elapsed: Option<Duration>,
	},
}

impl RetryDelay {
	/// Fresh delay schedule for one retry run.
	pub fn schedule(&self) -> Box<dyn Backoff + Send> {
		match self {
			RetryDelay::None => Box::new(Zero {}),
			RetryDelay::Fixed(interval) => Box::new(Constant::new(*interval)),
			RetryDelay::Exponential {
				initial,
				max_interval,
				max_elapsed,
			} => Box::new(
				ExponentialBackoffBuilder::new()
					.with_initial_interval(*initial)
					.with_max_interval(*max_interval)
					.with_max_elapsed_time(*max_elapsed)
					.build(),
			),
		}
	}
}

/// Configuration for the confirmation monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
	/// Time between two confirmation queries
	pub poll_interval: Duration,
	/// Stop polling once this depth is reached; poll until teardown when `None`
	pub target_confirmations: Option<u64>,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(10),
			target_confirmations: None,
		}
	}
}

impl MonitorConfig {
	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	pub fn with_target_confirmations(mut self, target: u64) -> Self {
		self.target_confirmations = Some(target);
		self
	}
}

/// Top-level configuration of a `Client`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	/// Network whose providers the client uses
	pub network: Network,
	/// Upper bound on broadcast attempts
	pub broadcast_attempts: u32,
	/// Delay between broadcast attempts
	pub retry_delay: RetryDelay,
	/// Confirmation monitor settings
	pub monitor: MonitorConfig,
	/// Fee used when a send does not specify one, in smallest units
	pub default_fee_units: u64,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			network: Network::Mainnet,
			broadcast_attempts: DEFAULT_BROADCAST_ATTEMPTS,
			retry_delay: RetryDelay::None,
			monitor: MonitorConfig::default(),
			default_fee_units: DEFAULT_FEE_UNITS,
		}
	}
}

impl ClientConfig {
	pub fn new(network: Network) -> Self {
		Self {
			network,
			..Self::default()
		}
	}

	pub fn with_broadcast_attempts(mut self, attempts: u32) -> Self {
		self.broadcast_attempts = attempts;
		self
	}

	pub fn with_retry_delay(mut self, delay: RetryDelay) -> Self {
		self.retry_delay = delay;
		self
	}

	pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
		self.monitor = monitor;
		self
	}

	pub fn with_default_fee(mut self, fee_units: u64) -> Self {
		self.default_fee_units = fee_units;
		self
	}
}
