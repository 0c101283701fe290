//! Transaction building collaborator
//!
//! Signing and script construction live outside this crate. This module defines the
//! capabilities the lifecycle consumes (`Signer`, `TransactionBuilder`) and the values
//! exchanged with them.

use crate::provider::{Network, Utxo};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The external builder rejected a request. Not retried: the inputs would not change.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BuildError {
	#[error("Insufficient balance: {0}")]
	InsufficientBalance(String),

	#[error("Invalid address: {0}")]
	InvalidAddress(String),

	#[error("Transaction validation error: {0}")]
	ValidationError(String),

	#[error("Signing error: {0}")]
	SigningError(String),

	#[error("Unexpected error: {0}")]
	UnexpectedError(String),
}

/// A value transfer to build. Constructed fresh per send and never mutated once
/// dispatch begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
	pub from_address: String,
	pub to_address: String,
	pub change_address: String,
	/// Value delivered to `to_address`, in smallest units
	pub value_units: u64,
	/// Fee paid to the network, in smallest units
	pub fee_units: u64,
	/// Deduct the fee from `value_units` instead of adding it on top
	pub subtract_fee: bool,
}

impl TransactionRequest {
	/// Creates a request that returns change to the sender.
	pub fn new(from_address: impl Into<String>, to_address: impl Into<String>, value_units: u64) -> Self {
		let from_address = from_address.into();
		Self {
			change_address: from_address.clone(),
			from_address,
			to_address: to_address.into(),
			value_units,
			fee_units: 0,
			subtract_fee: false,
		}
	}

	pub fn with_fee(mut self, fee_units: u64) -> Self {
		self.fee_units = fee_units;
		self
	}

	pub fn with_subtract_fee(mut self, subtract_fee: bool) -> Self {
		self.subtract_fee = subtract_fee;
		self
	}

	/// Total the selected inputs must cover, or `None` when the fee cannot be paid.
	///
	/// With `subtract_fee` the recipient absorbs the fee, so the fee must not exceed the
	/// value. Otherwise the fee comes on top of the value.
	pub fn required_units(&self) -> Option<u64> {
		if self.subtract_fee {
			(self.fee_units <= self.value_units).then_some(self.value_units)
		} else {
			self.value_units.checked_add(self.fee_units)
		}
	}
}

/// A fully-signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	raw: Vec<u8>,
}

impl SignedTransaction {
	pub fn new(raw: Vec<u8>) -> Self {
		Self { raw }
	}

	pub fn from_hex(tx_hex: &str) -> Result<Self, BuildError> {
		hex::decode(tx_hex)
			.map(Self::new)
			.map_err(|e| BuildError::UnexpectedError(format!("Invalid transaction hex: {}", e)))
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.raw
	}

	/// Wire-format hex string submitted to providers.
	pub fn to_hex(&self) -> String {
		hex::encode(&self.raw)
	}
}

/// Signing capability handed to the builder.
pub trait Signer: Send + Sync {
	/// Address controlled by this signer on `network`.
	fn address(&self, network: Network) -> Result<String, BuildError>;

	/// Signs a sighash digest. Opaque to this crate; only the builder calls it.
	fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, BuildError>;
}

/// Everything the external builder needs for one transaction.
pub struct BuildContext<'a> {
	pub network: Network,
	pub signer: &'a dyn Signer,
	pub request: &'a TransactionRequest,
	/// Spend candidates, largest amount first
	pub utxos: &'a [Utxo],
}

/// External builder producing signed transactions.
///
/// Implementations decide whether the candidates cover the request and report
/// `BuildError::InsufficientBalance` when they do not.
#[async_trait::async_trait]
pub trait TransactionBuilder: Send + Sync {
	async fn build(&self, context: BuildContext<'_>) -> Result<SignedTransaction, BuildError>;
}
