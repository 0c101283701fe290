//! UTXO queries over the provider fallback chain.
//!
//! Lookups go through `dispatch`, so the first provider that answers wins. Results are
//! filtered by confirmation depth; balances are summed in smallest units with checked
//! arithmetic.

use crate::dispatch::{AggregatedError, dispatch};
use crate::provider::{ProviderSet, Utxo};
use crate::utils::Amount;
use futures::FutureExt;
use thiserror::Error;
use tracing::debug;

/// Balance could not be computed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
	#[error("UTXO lookup failed: {0}")]
	Lookup(#[from] AggregatedError),

	#[error("Balance of {0} overflows")]
	Overflow(String),
}

/// Fetches and orders the unspent outputs of an address.
#[derive(Clone)]
pub struct UtxoSelector {
	providers: ProviderSet,
}

impl UtxoSelector {
	pub fn new(providers: ProviderSet) -> Self {
		Self { providers }
	}

	/// UTXOs of `address` with at least `min_confirmations`, in provider order.
	pub async fn get_utxos(
		&self,
		address: &str,
		min_confirmations: u64,
	) -> Result<Vec<Utxo>, AggregatedError> {
		let owned = address.to_string();
		let endpoints = self.providers.endpoints(move |provider| {
			let address = owned.clone();
			async move { provider.get_utxos(&address).await }.boxed()
		});

		let utxos = dispatch(&endpoints).await?;
		let total = utxos.len();
		let utxos: Vec<Utxo> = utxos
			.into_iter()
			.filter(|utxo| utxo.confirmations >= min_confirmations)
			.collect();
		debug!(
			"{} of {} UTXOs for {} have at least {} confirmations",
			utxos.len(),
			total,
			address,
			min_confirmations
		);
		Ok(utxos)
	}

	/// Sum of the UTXOs of `address` meeting the confirmation threshold.
	pub async fn get_balance(
		&self,
		address: &str,
		min_confirmations: u64,
	) -> Result<Amount, BalanceError> {
		let utxos = self.get_utxos(address, min_confirmations).await?;
		total_amount(&utxos).ok_or_else(|| BalanceError::Overflow(address.to_string()))
	}

	/// UTXOs meeting the threshold, largest amount first.
	pub async fn spend_candidates(
		&self,
		address: &str,
		min_confirmations: u64,
	) -> Result<Vec<Utxo>, AggregatedError> {
		let mut utxos = self.get_utxos(address, min_confirmations).await?;
		sort_largest_first(&mut utxos);
		Ok(utxos)
	}
}

/// Exact total of `utxos`, or `None` on overflow.
pub fn total_amount(utxos: &[Utxo]) -> Option<Amount> {
	Amount::checked_sum(utxos.iter().map(|utxo| utxo.amount))
}

/// Orders by amount descending. Stable, so equal amounts keep provider order.
pub fn sort_largest_first(utxos: &mut [Utxo]) {
	utxos.sort_by(|a, b| b.amount.cmp(&a.amount));
}
