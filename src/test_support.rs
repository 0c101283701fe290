//! Shared fixtures for unit tests.

use crate::provider::{Network, Utxo};
use crate::transaction::{BuildContext, BuildError, SignedTransaction, Signer, TransactionBuilder, TransactionRequest};
use crate::wallet::utxo_selector::total_amount;
use crate::utils::Amount;
use std::sync::Mutex;

pub const SENDER: &str = "tb1qsender";

pub fn utxo(amount: u64, confirmations: u64) -> Utxo {
	Utxo {
		tx_hash: format!("{:064x}", amount),
		v_out: 0,
		amount,
		confirmations,
		script_pub_key: vec![0x00, 0x14],
	}
}

pub struct StaticSigner;

impl Signer for StaticSigner {
	fn address(&self, _network: Network) -> Result<String, BuildError> {
		Ok(SENDER.to_string())
	}

	fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, BuildError> {
		Ok(digest.to_vec())
	}
}

#[derive(Default)]
struct Recorded {
	request: Option<TransactionRequest>,
	amounts: Vec<u64>,
	signed: Option<SignedTransaction>,
}

/// Builder that serializes the request as the transaction body and records its inputs.
#[derive(Default)]
pub struct RecordingBuilder {
	recorded: Mutex<Recorded>,
}

impl RecordingBuilder {
	pub fn last_request(&self) -> Option<TransactionRequest> {
		self.recorded.lock().unwrap().request.clone()
	}

	pub fn last_amounts(&self) -> Vec<u64> {
		self.recorded.lock().unwrap().amounts.clone()
	}

	pub fn last_signed(&self) -> Option<SignedTransaction> {
		self.recorded.lock().unwrap().signed.clone()
	}
}

#[async_trait::async_trait]
impl TransactionBuilder for RecordingBuilder {
	async fn build(&self, context: BuildContext<'_>) -> Result<SignedTransaction, BuildError> {
		let mut recorded = self.recorded.lock().unwrap();
		recorded.request = Some(context.request.clone());
		recorded.amounts = context.utxos.iter().map(|u| u.amount).collect();

		let required = context
			.request
			.required_units()
			.ok_or_else(|| BuildError::ValidationError("fee exceeds value".to_string()))?;
		let available = total_amount(context.utxos).unwrap_or(Amount::ZERO);
		if available < Amount::from_units(required as u128) {
			return Err(BuildError::InsufficientBalance(format!(
				"need {}, have {}",
				Amount::from_units(required as u128),
				available
			)));
		}

		let body = serde_json::to_vec(context.request)
			.map_err(|e| BuildError::UnexpectedError(e.to_string()))?;
		let signed = SignedTransaction::new(body);
		recorded.signed = Some(signed.clone());
		Ok(signed)
	}
}
