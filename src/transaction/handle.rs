//! Shared record of one transaction's progress.
//!
//! The lifecycle task and the confirmation monitor both hold the handle. Every field has
//! a single writer:
//!
//! | field                | writer    |
//! |----------------------|-----------|
//! | `tx_hash`            | lifecycle |
//! | `errored`            | lifecycle |
//! | `stage`              | lifecycle |
//! | `confirmation_count` | monitor   |
//! | `confirmed`          | monitor   |
//!
//! Each task only reads fields it does not write. The atomics make the handle safe to
//! share across worker threads; they do not arbitrate between writers.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	/// Resolving the sender, selecting UTXOs and building the transaction
	Building,
	/// Submitting the signed transaction to the providers
	Broadcasting,
	/// Accepted by a provider; confirmation tracking continues
	Broadcast,
	/// The configured confirmation target was reached
	Confirmed,
	/// Building or broadcasting failed
	Failed,
}

impl LifecycleState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, LifecycleState::Confirmed | LifecycleState::Failed)
	}
}

impl fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LifecycleState::Building => write!(f, "Building"),
			LifecycleState::Broadcasting => write!(f, "Broadcasting"),
			LifecycleState::Broadcast => write!(f, "Broadcast"),
			LifecycleState::Confirmed => write!(f, "Confirmed"),
			LifecycleState::Failed => write!(f, "Failed"),
		}
	}
}

const STAGE_BUILDING: u8 = 0;
const STAGE_BROADCASTING: u8 = 1;
const STAGE_BROADCAST: u8 = 2;
const STAGE_FAILED: u8 = 3;

#[derive(Debug)]
pub struct TransactionHandle {
	tx_hash: OnceLock<String>,
	errored: AtomicBool,
	stage: AtomicU8,
	confirmation_count: AtomicU64,
	confirmed: AtomicBool,
}

impl Default for TransactionHandle {
	fn default() -> Self {
		Self::new()
	}
}

impl TransactionHandle {
	pub fn new() -> Self {
		Self {
			tx_hash: OnceLock::new(),
			errored: AtomicBool::new(false),
			stage: AtomicU8::new(STAGE_BUILDING),
			confirmation_count: AtomicU64::new(0),
			confirmed: AtomicBool::new(false),
		}
	}

	/// Hash of the broadcast transaction, once known.
	pub fn tx_hash(&self) -> Option<&str> {
		self.tx_hash.get().map(String::as_str)
	}

	pub fn is_errored(&self) -> bool {
		self.errored.load(Ordering::Acquire)
	}

	/// Latest confirmation depth seen by the monitor.
	pub fn confirmation_count(&self) -> u64 {
		self.confirmation_count.load(Ordering::Acquire)
	}

	pub fn state(&self) -> LifecycleState {
		match self.stage.load(Ordering::Acquire) {
			STAGE_BUILDING => LifecycleState::Building,
			STAGE_BROADCASTING => LifecycleState::Broadcasting,
			STAGE_BROADCAST if self.confirmed.load(Ordering::Acquire) => LifecycleState::Confirmed,
			STAGE_BROADCAST => LifecycleState::Broadcast,
			_ => LifecycleState::Failed,
		}
	}

	// Lifecycle-owned writes

	pub(crate) fn begin_broadcast(&self) {
		self.stage.store(STAGE_BROADCASTING, Ordering::Release);
	}

	/// Records the hash. Returns `false`, leaving the handle untouched, if a hash was
	/// already recorded or the transaction failed.
	pub(crate) fn record_broadcast(&self, tx_hash: String) -> bool {
		if self.is_errored() || self.tx_hash.set(tx_hash).is_err() {
			return false;
		}
		self.stage.store(STAGE_BROADCAST, Ordering::Release);
		true
	}

	/// Marks the transaction failed. Ignored once a hash is recorded, since the outcome
	/// is already settled.
	pub(crate) fn mark_failed(&self) -> bool {
		if self.tx_hash.get().is_some() {
			return false;
		}
		self.errored.store(true, Ordering::Release);
		self.stage.store(STAGE_FAILED, Ordering::Release);
		true
	}

	// Monitor-owned writes

	pub(crate) fn record_confirmations(&self, count: u64) {
		self.confirmation_count.store(count, Ordering::Release);
	}

	pub(crate) fn mark_confirmed(&self) {
		self.confirmed.store(true, Ordering::Release);
	}
}
