//! Background confirmation tracking.
//!
//! After a transaction is broadcast, the monitor polls its confirmation depth on a fixed
//! interval and emits a `Confirmation` event per successful poll. Monitoring is best
//! effort: query failures are logged and skipped, and nothing the monitor does can change
//! the already settled outcome of the send.

use crate::config::MonitorConfig;
use crate::dispatch::AggregatedError;
use crate::transaction::events::{EventSender, TransactionEvent};
use crate::transaction::handle::TransactionHandle;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Why a monitor stopped polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
	/// The transaction was flagged as errored
	Errored,
	/// The event receiver was dropped
	Unsubscribed,
	/// The configured confirmation target was reached
	TargetReached,
}

/// Polls confirmation depth for broadcast transactions.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationMonitor {
	config: MonitorConfig,
}

impl ConfirmationMonitor {
	pub fn new(config: MonitorConfig) -> Self {
		Self { config }
	}

	/// Starts polling for `handle` on a background task.
	///
	/// Returns `None` without spawning anything when the handle has no hash yet. Each tick
	/// checks `is_errored` before querying and again before emitting; once it reports
	/// `true` the monitor stops for good.
	pub fn subscribe<E, F, Fut>(
		&self,
		handle: Arc<TransactionHandle>,
		events: EventSender,
		is_errored: E,
		mut fetch_confirmations: F,
	) -> Option<JoinHandle<MonitorExit>>
	where
		E: Fn() -> bool + Send + 'static,
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = Result<u64, AggregatedError>> + Send,
	{
		let Some(tx_hash) = handle.tx_hash().map(str::to_string) else {
			warn!("Refusing to monitor a transaction without a hash");
			return None;
		};

		let poll_interval = self.config.poll_interval.max(MIN_POLL_INTERVAL);
		let target = self.config.target_confirmations;

		let task = tokio::spawn(async move {
			let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			let mut last_logged = None;

			info!(
				"Monitoring confirmations of {} every {:?}",
				tx_hash, poll_interval
			);

			let exit = loop {
				ticker.tick().await;

				if is_errored() {
					break MonitorExit::Errored;
				}
				if events.is_closed() {
					break MonitorExit::Unsubscribed;
				}

				let count = match fetch_confirmations().await {
					Ok(count) => count,
					Err(e) => {
						warn!("Confirmation query for {} failed: {}", tx_hash, e);
						continue;
					}
				};

				if is_errored() {
					break MonitorExit::Errored;
				}

				handle.record_confirmations(count);
				if last_logged != Some(count) {
					debug!("Transaction {} has {} confirmations", tx_hash, count);
					last_logged = Some(count);
				}

				if events.send(TransactionEvent::Confirmation(count)).is_err() {
					break MonitorExit::Unsubscribed;
				}

				if target.is_some_and(|target| count >= target) {
					handle.mark_confirmed();
					break MonitorExit::TargetReached;
				}
			};

			info!("Stopped monitoring {}: {:?}", tx_hash, exit);
			exit
		});

		Some(task)
	}
}
