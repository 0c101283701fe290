//! Types shared by every data provider implementation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger network a provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Mainnet,
	Testnet,
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Network::Mainnet => write!(f, "mainnet"),
			Network::Testnet => write!(f, "testnet"),
		}
	}
}

/// An unspent transaction output as reported by a provider.
///
/// Amounts are in the ledger's smallest unit. Instances are never mutated after they
/// are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
	/// Hash of the transaction that created this output.
	#[serde(rename = "txHash")]
	pub tx_hash: String,
	/// Output index within that transaction.
	#[serde(rename = "vOut")]
	pub v_out: u32,
	/// Value in smallest units.
	pub amount: u64,
	/// Depth of the creating transaction at the time of the query.
	pub confirmations: u64,
	/// Locking script, opaque to this crate.
	#[serde(rename = "scriptPubKey", with = "hex::serde")]
	pub script_pub_key: Vec<u8>,
}

/// Failure of a single provider endpoint.
///
/// Recovered locally by the fallback dispatcher, which moves on to the next provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
	#[error("Request failed: {0}")]
	Request(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Rejected by provider: {0}")]
	Rejected(String),

	#[error("Provider unavailable: {0}")]
	Unavailable(String),
}
