//!
//! In-process provider backed by scripted ledger state.
//!
//! Serves UTXOs, accepts broadcasts and reports confirmation depths from memory. Failures
//! can be injected to exercise the fallback and retry paths, and every call is counted.

use super::{ProviderError, Utxo, UtxoProvider};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Provider operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Utxos,
	Broadcast,
	Confirmations,
}

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
	pub utxos: usize,
	pub broadcast: usize,
	pub confirmations: usize,
}

#[derive(Default)]
struct LedgerState {
	utxos: HashMap<String, Vec<Utxo>>,
	confirmations: HashMap<String, u64>,
	known_hashes: HashMap<String, String>,
	accepted: HashSet<String>,
	reject_duplicates: bool,
	fail_next: usize,
	fail_always: bool,
	fail_only: Option<Operation>,
	failure: Option<ProviderError>,
	calls: CallCounts,
}

/// Provider serving scripted ledger state from memory.
pub struct MemoryProvider {
	name: String,
	state: Mutex<LedgerState>,
}

impl MemoryProvider {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			state: Mutex::new(LedgerState::default()),
		}
	}

	fn state(&self) -> MutexGuard<'_, LedgerState> {
		// A poisoned lock only means a test panicked mid-call; the data is still usable.
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Replaces the UTXO set reported for `address`.
	pub fn set_utxos(&self, address: &str, utxos: Vec<Utxo>) {
		self.state().utxos.insert(address.to_string(), utxos);
	}

	/// Sets the confirmation depth reported for `tx_hash`.
	pub fn set_confirmations(&self, tx_hash: &str, confirmations: u64) {
		self.state()
			.confirmations
			.insert(tx_hash.to_string(), confirmations);
	}

	/// Fixes the hash returned when `tx_hex` is broadcast.
	pub fn register_transaction(&self, tx_hex: &str, tx_hash: &str) {
		self.state()
			.known_hashes
			.insert(tx_hex.to_string(), tx_hash.to_string());
	}

	/// Rejects a second broadcast of an already accepted transaction instead of
	/// acknowledging it again.
	pub fn reject_duplicates(&self, reject: bool) {
		self.state().reject_duplicates = reject;
	}

	/// Fails the next `count` calls, whatever the operation.
	pub fn fail_next(&self, count: usize, error: ProviderError) {
		let mut state = self.state();
		state.fail_next = count;
		state.fail_only = None;
		state.failure = Some(error);
	}

	/// Fails every call until `recover` is called.
	pub fn fail_always(&self, error: ProviderError) {
		let mut state = self.state();
		state.fail_always = true;
		state.fail_only = None;
		state.failure = Some(error);
	}

	/// Fails every call of one operation until `recover` is called.
	pub fn fail_operation(&self, operation: Operation, error: ProviderError) {
		let mut state = self.state();
		state.fail_always = true;
		state.fail_only = Some(operation);
		state.failure = Some(error);
	}

	pub fn recover(&self) {
		let mut state = self.state();
		state.fail_always = false;
		state.fail_next = 0;
		state.fail_only = None;
		state.failure = None;
	}

	pub fn calls(&self) -> CallCounts {
		self.state().calls
	}

	/// Hashes of all transactions this provider accepted.
	pub fn accepted(&self) -> Vec<String> {
		let mut accepted: Vec<String> = self.state().accepted.iter().cloned().collect();
		accepted.sort();
		accepted
	}

	fn injected_failure(state: &mut LedgerState, operation: Operation) -> Option<ProviderError> {
		if state.fail_only.is_some_and(|only| only != operation) {
			return None;
		}
		if state.fail_always {
			return state.failure.clone();
		}
		if state.fail_next > 0 {
			state.fail_next -= 1;
			return state.failure.clone();
		}
		None
	}

	/// Stand-in transaction hash. `DefaultHasher` output is stable within one build but
	/// not across Rust releases, so never persist or compare these hashes externally.
	fn derive_hash(tx_hex: &str) -> String {
		let mut hasher = DefaultHasher::new();
		tx_hex.hash(&mut hasher);
		let digest = hasher.finish();
		format!("{:016x}", digest).repeat(4)
	}
}

#[async_trait::async_trait]
impl UtxoProvider for MemoryProvider {
	async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
		let mut state = self.state();
		state.calls.utxos += 1;
		if let Some(error) = Self::injected_failure(&mut state, Operation::Utxos) {
			return Err(error);
		}

		Ok(state.utxos.get(address).cloned().unwrap_or_default())
	}

	async fn broadcast(&self, tx_hex: &str) -> Result<String, ProviderError> {
		let mut state = self.state();
		state.calls.broadcast += 1;
		if let Some(error) = Self::injected_failure(&mut state, Operation::Broadcast) {
			return Err(error);
		}

		if hex::decode(tx_hex).is_err() {
			return Err(ProviderError::Rejected(
				"transaction is not valid hex".to_string(),
			));
		}

		let tx_hash = state
			.known_hashes
			.get(tx_hex)
			.cloned()
			.unwrap_or_else(|| Self::derive_hash(tx_hex));

		if !state.accepted.insert(tx_hash.clone()) && state.reject_duplicates {
			return Err(ProviderError::Rejected(format!(
				"transaction {} already known",
				tx_hash
			)));
		}
		state.confirmations.entry(tx_hash.clone()).or_insert(0);

		debug!("[{}] accepted transaction {}", self.name, tx_hash);
		Ok(tx_hash)
	}

	async fn get_confirmations(&self, tx_hash: &str) -> Result<u64, ProviderError> {
		let mut state = self.state();
		state.calls.confirmations += 1;
		if let Some(error) = Self::injected_failure(&mut state, Operation::Confirmations) {
			return Err(error);
		}

		state
			.confirmations
			.get(tx_hash)
			.copied()
			.ok_or_else(|| ProviderError::NotFound(format!("transaction {}", tx_hash)))
	}

	fn name(&self) -> &str {
		&self.name
	}
}
