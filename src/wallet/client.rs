//! Wallet client
//!
//! Public entry point binding a network's providers, a signer and an external builder.
//! Balance and UTXO queries run inline; sends are handed to a `TransactionLifecycle`
//! and return a `PendingTransaction` immediately.

use super::types::{Asset, BalanceOptions, ClientError, SendOptions};
use super::utxo_selector::UtxoSelector;
use crate::config::ClientConfig;
use crate::provider::{Network, ProviderRegistry, Utxo};
use crate::transaction::{PendingTransaction, Signer, TransactionBuilder, TransactionLifecycle, Transfer};
use crate::utils::Amount;
use std::sync::Arc;
use tracing::info;

pub struct Client {
	config: ClientConfig,
	signer: Arc<dyn Signer>,
	selector: UtxoSelector,
	lifecycle: TransactionLifecycle,
}

impl Client {
	/// Creates a client for `config.network`, which must have providers in `registry`.
	pub fn new(
		config: ClientConfig,
		registry: &ProviderRegistry,
		signer: Arc<dyn Signer>,
		builder: Arc<dyn TransactionBuilder>,
	) -> Result<Self, ClientError> {
		let providers = registry
			.providers(config.network)
			.cloned()
			.ok_or(ClientError::NoProviders {
				network: config.network,
			})?;

		info!(
			"Wallet client on {} using {} provider(s)",
			config.network,
			providers.len()
		);

		Ok(Self {
			selector: UtxoSelector::new(providers.clone()),
			lifecycle: TransactionLifecycle::new(&config, providers, signer.clone(), builder),
			signer,
			config,
		})
	}

	pub fn network(&self) -> Network {
		self.config.network
	}

	/// Address controlled by the configured signer.
	pub fn address(&self) -> Result<String, ClientError> {
		self.signer
			.address(self.config.network)
			.map_err(ClientError::Signer)
	}

	/// UTXOs of any address, optionally restricted to a confirmation depth.
	pub async fn get_utxos(
		&self,
		address: &str,
		confirmations: Option<u64>,
	) -> Result<Vec<Utxo>, ClientError> {
		let utxos = self
			.selector
			.get_utxos(address, confirmations.unwrap_or(0))
			.await?;
		Ok(utxos)
	}

	/// Balance of the signer's address.
	pub async fn get_balance(
		&self,
		asset: &Asset,
		options: BalanceOptions,
	) -> Result<Amount, ClientError> {
		Self::check_asset(asset)?;
		let address = self.address()?;
		let balance = self
			.selector
			.get_balance(&address, options.confirmations)
			.await?;
		Ok(balance)
	}

	/// Starts a transfer of `value` to `to`.
	///
	/// Argument errors are returned directly. Everything after that (selection, build,
	/// broadcast) is reported through the returned `PendingTransaction`.
	///
	/// # Panics
	///
	/// Spawns the lifecycle with `tokio::spawn`, so it panics when called outside a
	/// tokio runtime.
	pub fn send(
		&self,
		to: &str,
		value: Amount,
		asset: &Asset,
		options: SendOptions,
	) -> Result<PendingTransaction, ClientError> {
		Self::check_asset(asset)?;
		let value_units = value.to_u64().ok_or_else(|| ClientError::InvalidAmount {
			amount: value,
			reason: "exceeds the largest spendable output".to_string(),
		})?;
		if value_units == 0 {
			return Err(ClientError::InvalidAmount {
				amount: value,
				reason: "must be positive".to_string(),
			});
		}

		let transfer = Transfer {
			to_address: to.to_string(),
			value_units,
			fee_units: options.fee.unwrap_or(self.config.default_fee_units),
			subtract_fee: options.subtract_fee,
			min_confirmations: options.confirmations,
		};
		info!("Sending {} {} to {}", value, asset, to);
		Ok(self.lifecycle.start(transfer))
	}

	/// Sends and waits for the broadcast hash, ignoring confirmation events.
	pub async fn send_and_wait(
		&self,
		to: &str,
		value: Amount,
		asset: &Asset,
		options: SendOptions,
	) -> Result<String, ClientError> {
		let tx_hash = self.send(to, value, asset, options)?.wait().await?;
		Ok(tx_hash)
	}

	fn check_asset(asset: &Asset) -> Result<(), ClientError> {
		if asset.is_native() {
			Ok(())
		} else {
			Err(ClientError::UnsupportedAsset(asset.to_string()))
		}
	}
}
