//! Transaction lifecycle: build, broadcast, then hand over to confirmation tracking.
//!
//! `TransactionLifecycle::start` spawns one task per send. That task walks
//! `Building -> Broadcasting -> Broadcast` (or `Failed`), reports the hash on the event
//! stream, settles the outcome, and only then starts the `ConfirmationMonitor`. The
//! outcome resolves as soon as a provider acknowledges the broadcast, not on confirmation.

use crate::config::ClientConfig;
use crate::dispatch::{AggregatedError, RetryExhaustedError, RetryPolicy, dispatch};
use crate::provider::{Network, ProviderSet};
use crate::transaction::builder::{
	BuildContext, BuildError, SignedTransaction, Signer, TransactionBuilder, TransactionRequest,
};
use crate::transaction::events::{EventSender, TransactionEvent, TransactionEvents, event_channel};
use crate::transaction::handle::TransactionHandle;
use crate::transaction::monitor::ConfirmationMonitor;
use crate::wallet::utxo_selector::UtxoSelector;
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Broadcast failed on every permitted attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Broadcast failed: {0}")]
pub struct BroadcastError(#[from] pub RetryExhaustedError<AggregatedError>);

/// Why a send was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
	#[error("UTXO lookup failed: {0}")]
	Selection(AggregatedError),

	#[error("Build error: {0}")]
	Build(#[from] BuildError),

	#[error(transparent)]
	Broadcast(#[from] BroadcastError),

	#[error("Lifecycle task ended without an outcome")]
	Aborted,
}

/// Parameters of one send, before the sender address is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
	pub to_address: String,
	pub value_units: u64,
	pub fee_units: u64,
	pub subtract_fee: bool,
	/// Minimum confirmations of the UTXOs offered to the builder
	pub min_confirmations: u64,
}

/// Final outcome of a send: the transaction hash, or the reason it failed.
///
/// Resolves once; awaiting it does not wait for confirmations.
#[derive(Debug)]
pub struct TransactionOutcome {
	rx: oneshot::Receiver<Result<String, SendError>>,
}

impl Future for TransactionOutcome {
	type Output = Result<String, SendError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.rx
			.poll_unpin(cx)
			.map(|received| received.unwrap_or(Err(SendError::Aborted)))
	}
}

/// A send in progress: shared handle, event stream and outcome, each owned separately.
#[derive(Debug)]
pub struct PendingTransaction {
	handle: Arc<TransactionHandle>,
	events: TransactionEvents,
	outcome: TransactionOutcome,
}

impl PendingTransaction {
	pub fn handle(&self) -> &Arc<TransactionHandle> {
		&self.handle
	}

	pub fn events(&mut self) -> &mut TransactionEvents {
		&mut self.events
	}

	pub fn into_parts(self) -> (Arc<TransactionHandle>, TransactionEvents, TransactionOutcome) {
		(self.handle, self.events, self.outcome)
	}

	/// Waits for the outcome, discarding the event stream (which stops monitoring).
	pub async fn wait(self) -> Result<String, SendError> {
		self.outcome.await
	}
}

/// Orchestrates sends for one network. Cheap to clone.
#[derive(Clone)]
pub struct TransactionLifecycle {
	network: Network,
	providers: ProviderSet,
	selector: UtxoSelector,
	signer: Arc<dyn Signer>,
	builder: Arc<dyn TransactionBuilder>,
	retry: RetryPolicy,
	monitor: ConfirmationMonitor,
}

impl TransactionLifecycle {
	pub fn new(
		config: &ClientConfig,
		providers: ProviderSet,
		signer: Arc<dyn Signer>,
		builder: Arc<dyn TransactionBuilder>,
	) -> Self {
		Self {
			network: config.network,
			selector: UtxoSelector::new(providers.clone()),
			providers,
			signer,
			builder,
			retry: RetryPolicy::new(config.broadcast_attempts).with_delay(config.retry_delay.clone()),
			monitor: ConfirmationMonitor::new(config.monitor.clone()),
		}
	}

	/// Starts a send on a background task and returns immediately.
	///
	/// Must be called from within a tokio runtime.
	pub fn start(&self, transfer: Transfer) -> PendingTransaction {
		let handle = Arc::new(TransactionHandle::new());
		let (events_tx, events) = event_channel();
		let (outcome_tx, outcome_rx) = oneshot::channel();

		let lifecycle = self.clone();
		let task_handle = handle.clone();
		tokio::spawn(async move {
			lifecycle
				.run(task_handle, transfer, events_tx, outcome_tx)
				.await;
		});

		PendingTransaction {
			handle,
			events,
			outcome: TransactionOutcome { rx: outcome_rx },
		}
	}

	async fn run(
		self,
		handle: Arc<TransactionHandle>,
		transfer: Transfer,
		events: EventSender,
		outcome: oneshot::Sender<Result<String, SendError>>,
	) {
		let tx_hash = match self.build_and_broadcast(&handle, &transfer).await {
			Ok(tx_hash) => tx_hash,
			Err(e) => {
				handle.mark_failed();
				error!("Transaction to {} failed: {}", transfer.to_address, e);
				let _ = outcome.send(Err(e));
				return;
			}
		};

		info!("Transaction {} broadcast", tx_hash);
		// A dropped receiver only means the caller stopped listening.
		let _ = events.send(TransactionEvent::TransactionHash(tx_hash.clone()));
		let _ = outcome.send(Ok(tx_hash.clone()));

		let endpoints = self.providers.endpoints(move |provider| {
			let tx_hash = tx_hash.clone();
			async move { provider.get_confirmations(&tx_hash).await }.boxed()
		});
		let errored = handle.clone();
		self.monitor.subscribe(
			handle,
			events,
			move || errored.is_errored(),
			move || {
				let endpoints = endpoints.clone();
				async move { dispatch(&endpoints).await }
			},
		);
	}

	async fn build_and_broadcast(
		&self,
		handle: &TransactionHandle,
		transfer: &Transfer,
	) -> Result<String, SendError> {
		debug!("Building transaction to {}", transfer.to_address);
		let signed = self.build(transfer).await?;

		handle.begin_broadcast();
		debug!("Broadcasting transaction to {}", transfer.to_address);
		let tx_hash = self.broadcast(&signed).await?;

		if !handle.record_broadcast(tx_hash.clone()) {
			// The lifecycle is the only writer, so this cannot happen for a fresh handle.
			return Err(SendError::Aborted);
		}
		Ok(tx_hash)
	}

	/// Resolves the sender, selects spend candidates and invokes the external builder.
	pub async fn build(&self, transfer: &Transfer) -> Result<SignedTransaction, SendError> {
		let from_address = self.signer.address(self.network)?;
		let request = TransactionRequest::new(from_address, transfer.to_address.clone(), transfer.value_units)
			.with_fee(transfer.fee_units)
			.with_subtract_fee(transfer.subtract_fee);

		let utxos = self
			.selector
			.spend_candidates(&request.from_address, transfer.min_confirmations)
			.await
			.map_err(SendError::Selection)?;
		debug!(
			"Selected {} spend candidates for {}",
			utxos.len(),
			request.from_address
		);

		let signed = self
			.builder
			.build(BuildContext {
				network: self.network,
				signer: self.signer.as_ref(),
				request: &request,
				utxos: &utxos,
			})
			.await?;
		Ok(signed)
	}

	/// Submits `signed` through every provider in order, retrying the whole sequence.
	///
	/// Safe to call again with the same transaction: providers either acknowledge it
	/// under the same hash or reject it as already known.
	pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<String, BroadcastError> {
		let tx_hex = signed.to_hex();
		let endpoints = self.providers.endpoints(move |provider| {
			let tx_hex = tx_hex.clone();
			async move { provider.broadcast(&tx_hex).await }.boxed()
		});

		let tx_hash = self.retry.run(|| dispatch(&endpoints)).await?;
		Ok(tx_hash)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::MonitorConfig;
	use crate::provider::{MemoryProvider, Operation, ProviderError, UtxoProvider};
	use crate::test_support::{RecordingBuilder, StaticSigner, SENDER, utxo};
	use crate::transaction::handle::LifecycleState;
	use std::time::Duration;

	struct Fixture {
		primary: Arc<MemoryProvider>,
		backup: Arc<MemoryProvider>,
		builder: Arc<RecordingBuilder>,
		lifecycle: TransactionLifecycle,
	}

	fn fixture(target: Option<u64>) -> Fixture {
		let primary = Arc::new(MemoryProvider::new("primary"));
		let backup = Arc::new(MemoryProvider::new("backup"));
		primary.set_utxos(SENDER, vec![utxo(300_000_000, 6), utxo(1_000_000_000, 6)]);
		backup.set_utxos(SENDER, vec![utxo(300_000_000, 6), utxo(1_000_000_000, 6)]);

		let mut monitor = MonitorConfig::default().with_poll_interval(Duration::from_secs(5));
		monitor.target_confirmations = target;
		let config = ClientConfig::new(Network::Testnet).with_monitor(monitor);

		let builder = Arc::new(RecordingBuilder::default());
		let lifecycle = TransactionLifecycle::new(
			&config,
			ProviderSet::new(vec![primary.clone(), backup.clone()]),
			Arc::new(StaticSigner),
			builder.clone(),
		);

		Fixture {
			primary,
			backup,
			builder,
			lifecycle,
		}
	}

	fn transfer(value_units: u64) -> Transfer {
		Transfer {
			to_address: "recipient".into(),
			value_units,
			fee_units: 10_000,
			subtract_fee: false,
			min_confirmations: 0,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_hash_event_precedes_outcome_and_confirmations() {
		let f = fixture(Some(2));
		let pending = f.lifecycle.start(transfer(500_000_000));
		let (handle, mut events, outcome) = pending.into_parts();

		let first = events.next().await.unwrap();
		let TransactionEvent::TransactionHash(hash) = first else {
			panic!("expected the hash first, got {:?}", first);
		};
		assert_eq!(handle.tx_hash(), Some(hash.as_str()));
		assert_eq!(outcome.await.unwrap(), hash);
		assert_eq!(handle.state(), LifecycleState::Broadcast);

		f.primary.set_confirmations(&hash, 1);
		assert_eq!(events.next().await, Some(TransactionEvent::Confirmation(1)));
		f.primary.set_confirmations(&hash, 2);
		assert_eq!(events.next().await, Some(TransactionEvent::Confirmation(2)));
		assert_eq!(events.next().await, None);

		assert_eq!(handle.confirmation_count(), 2);
		assert_eq!(handle.state(), LifecycleState::Confirmed);
		assert_eq!(f.backup.calls().broadcast, 0);
	}

	#[tokio::test]
	async fn test_hash_event_queued_when_outcome_resolves() {
		let f = fixture(None);
		let mut pending = f.lifecycle.start(transfer(500_000_000));
		// The lifecycle task has not run yet on the current-thread runtime.
		assert_eq!(pending.events().try_next(), None);

		let (_handle, mut events, outcome) = pending.into_parts();
		let hash = outcome.await.unwrap();
		assert_eq!(
			events.try_next(),
			Some(TransactionEvent::TransactionHash(hash))
		);
		assert_eq!(events.try_next(), None);
	}

	#[tokio::test]
	async fn test_builder_sees_largest_first_candidates() {
		let f = fixture(None);
		let outcome = f.lifecycle.start(transfer(500_000_000)).wait().await;
		assert!(outcome.is_ok());

		let request = f.builder.last_request().unwrap();
		assert_eq!(request.from_address, SENDER);
		assert_eq!(request.change_address, SENDER);
		assert_eq!(request.fee_units, 10_000);
		assert_eq!(f.builder.last_amounts(), vec![1_000_000_000, 300_000_000]);
	}

	#[tokio::test]
	async fn test_build_failure_skips_broadcast() {
		let f = fixture(None);
		let pending = f.lifecycle.start(transfer(5_000_000_000));
		let (handle, mut events, outcome) = pending.into_parts();

		assert!(matches!(
			outcome.await,
			Err(SendError::Build(BuildError::InsufficientBalance(_)))
		));
		assert_eq!(events.next().await, None);
		assert!(handle.is_errored());
		assert_eq!(handle.state(), LifecycleState::Failed);
		assert_eq!(f.primary.calls().broadcast, 0);
		assert_eq!(f.backup.calls().broadcast, 0);
	}

	#[tokio::test]
	async fn test_broadcast_failure_after_three_attempts() {
		let f = fixture(None);
		f.primary.fail_operation(
			Operation::Broadcast,
			ProviderError::Unavailable("primary down".into()),
		);
		f.backup.fail_operation(Operation::Broadcast, ProviderError::Rejected("bad fee".into()));

		let pending = f.lifecycle.start(transfer(500_000_000));
		let (handle, mut events, outcome) = pending.into_parts();

		let Err(SendError::Broadcast(BroadcastError(exhausted))) = outcome.await else {
			panic!("expected a broadcast failure");
		};
		assert_eq!(exhausted.attempts, 3);
		assert_eq!(exhausted.last.len(), 2);
		assert_eq!(f.primary.calls().broadcast, 3);
		assert_eq!(f.backup.calls().broadcast, 3);

		assert_eq!(events.next().await, None);
		assert!(handle.is_errored());
		assert_eq!(handle.tx_hash(), None);
	}

	#[tokio::test]
	async fn test_falls_back_to_backup_provider() {
		let f = fixture(None);
		f.primary.fail_always(ProviderError::Request("timeout".into()));

		let hash = f.lifecycle.start(transfer(500_000_000)).wait().await.unwrap();
		assert_eq!(f.backup.accepted(), vec![hash]);
		assert!(f.primary.accepted().is_empty());
	}

	#[tokio::test]
	async fn test_utxo_lookup_failure_rejects_send() {
		let f = fixture(None);
		f.primary.fail_always(ProviderError::Unavailable("down".into()));
		f.backup.fail_always(ProviderError::Unavailable("down".into()));

		let outcome = f.lifecycle.start(transfer(1)).wait().await;
		assert!(matches!(outcome, Err(SendError::Selection(e)) if e.len() == 2));
		assert!(f.builder.last_request().is_none());
	}

	#[tokio::test]
	async fn test_rebroadcast_keeps_resolved_state() {
		let f = fixture(None);
		let pending = f.lifecycle.start(transfer(500_000_000));
		let handle = pending.handle().clone();
		let hash = pending.wait().await.unwrap();

		let signed = f.builder.last_signed().unwrap();
		assert_eq!(f.lifecycle.broadcast(&signed).await.unwrap(), hash);

		f.primary.reject_duplicates(true);
		f.backup.reject_duplicates(true);
		// The backup never saw the transaction, so it accepts it under the same hash.
		assert_eq!(f.lifecycle.broadcast(&signed).await.unwrap(), hash);
		assert!(f.lifecycle.broadcast(&signed).await.is_err());

		assert_eq!(handle.tx_hash(), Some(hash.as_str()));
		assert!(!handle.is_errored());
		assert_eq!(handle.state(), LifecycleState::Broadcast);
		assert_eq!(f.primary.get_confirmations(&hash).await, Ok(0));
	}
}
