use crate::dispatch::AggregatedError;
use crate::provider::Network;
use crate::transaction::{BuildError, SendError};
use crate::utils::{Amount, AmountParseError};
use crate::wallet::utxo_selector::BalanceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticker of the native ledger asset.
pub const NATIVE_ASSET: &str = "BTC";

/// Errors surfaced by the wallet client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
	#[error("Unsupported asset: {0}")]
	UnsupportedAsset(String),

	#[error("Invalid amount {amount}: {reason}")]
	InvalidAmount { amount: Amount, reason: String },

	#[error("Balance of {0} overflows")]
	BalanceOverflow(String),

	#[error("No providers configured for {network}")]
	NoProviders { network: Network },

	#[error("Lifecycle task ended without an outcome")]
	LifecycleAborted,

	#[error("Signer error: {0}")]
	Signer(BuildError),

	#[error("Provider error: {0}")]
	ProviderError(#[from] AggregatedError),

	#[error("Amount parse error: {0}")]
	AmountParseError(#[from] AmountParseError),

	#[error("Send error: {0}")]
	SendError(SendError),
}

impl From<SendError> for ClientError {
	fn from(error: SendError) -> Self {
		match error {
			SendError::Aborted => ClientError::LifecycleAborted,
			other => ClientError::SendError(other),
		}
	}
}

impl From<BalanceError> for ClientError {
	fn from(error: BalanceError) -> Self {
		match error {
			BalanceError::Lookup(e) => ClientError::ProviderError(e),
			BalanceError::Overflow(address) => ClientError::BalanceOverflow(address),
		}
	}
}

/// Asset identifier accepted by balance and send calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
	pub fn new(ticker: impl Into<String>) -> Self {
		Self(ticker.into())
	}

	pub fn native() -> Self {
		Self::new(NATIVE_ASSET)
	}

	pub fn ticker(&self) -> &str {
		&self.0
	}

	pub fn is_native(&self) -> bool {
		self.0.eq_ignore_ascii_case(NATIVE_ASSET)
	}
}

impl Default for Asset {
	fn default() -> Self {
		Self::native()
	}
}

impl fmt::Display for Asset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Options for `Client::get_balance`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceOptions {
	/// Only count UTXOs with at least this many confirmations
	pub confirmations: u64,
}

impl BalanceOptions {
	pub fn with_confirmations(mut self, confirmations: u64) -> Self {
		self.confirmations = confirmations;
		self
	}
}

/// Options for `Client::send`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
	/// Minimum confirmations of the UTXOs spent
	pub confirmations: u64,
	/// Fee in smallest units; the client default applies when unset
	pub fee: Option<u64>,
	/// Deduct the fee from the sent value
	pub subtract_fee: bool,
}

impl SendOptions {
	pub fn with_confirmations(mut self, confirmations: u64) -> Self {
		self.confirmations = confirmations;
		self
	}

	pub fn with_fee(mut self, fee: u64) -> Self {
		self.fee = Some(fee);
		self
	}

	pub fn with_subtract_fee(mut self, subtract_fee: bool) -> Self {
		self.subtract_fee = subtract_fee;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dispatch::RetryExhaustedError;
	use crate::transaction::BroadcastError;

	#[test]
	fn test_asset_matching() {
		assert!(Asset::native().is_native());
		assert!(Asset::new("btc").is_native());
		assert!(!Asset::new("ETH").is_native());
		assert_eq!(Asset::default().to_string(), "BTC");
	}

	#[test]
	fn test_send_error_conversion() {
		assert!(matches!(
			ClientError::from(SendError::Aborted),
			ClientError::LifecycleAborted
		));

		let broadcast = SendError::Broadcast(BroadcastError(RetryExhaustedError {
			attempts: 3,
			last: AggregatedError { failures: vec![] },
		}));
		assert!(matches!(
			ClientError::from(broadcast),
			ClientError::SendError(SendError::Broadcast(_))
		));
	}

	#[test]
	fn test_option_defaults() {
		let options = SendOptions::default();
		assert_eq!(options.confirmations, 0);
		assert_eq!(options.fee, None);
		assert!(!options.subtract_fee);
		assert_eq!(BalanceOptions::default().confirmations, 0);
	}
}
