//! Data provider integration
//!
//! Providers are interchangeable sources of ledger data (UTXO lookups, broadcast,
//! confirmation depth). Each network is served by an ordered `ProviderSet`; the
//! fallback dispatcher walks that order until one provider answers.

/// In-process provider for local development and tests
pub mod memory;
/// Type definitions shared by provider implementations
mod types;

pub use memory::{MemoryProvider, Operation};
pub use types::*;

use crate::dispatch::{Endpoint, EndpointFuture};
use std::collections::HashMap;
use std::sync::Arc;

/// Capability every data provider implements.
#[async_trait::async_trait]
pub trait UtxoProvider: Send + Sync {
	/// Unspent outputs currently locked to `address`, in provider order.
	async fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError>;

	/// Submits a serialized, fully-signed transaction and returns its hash.
	async fn broadcast(&self, tx_hex: &str) -> Result<String, ProviderError>;

	/// Current confirmation depth of `tx_hash`.
	async fn get_confirmations(&self, tx_hash: &str) -> Result<u64, ProviderError>;

	/// Get the name of this provider for logging and diagnostics.
	fn name(&self) -> &str;
}

/// Ordered list of providers serving one network.
#[derive(Clone, Default)]
pub struct ProviderSet {
	providers: Vec<Arc<dyn UtxoProvider>>,
}

impl ProviderSet {
	pub fn new(providers: Vec<Arc<dyn UtxoProvider>>) -> Self {
		Self { providers }
	}

	/// Appends a provider at the lowest priority.
	pub fn with_provider(mut self, provider: Arc<dyn UtxoProvider>) -> Self {
		self.providers.push(provider);
		self
	}

	pub fn len(&self) -> usize {
		self.providers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}

	/// Turns one provider operation into an endpoint per provider, preserving priority order.
	pub fn endpoints<T, F>(&self, call: F) -> Vec<Endpoint<T>>
	where
		T: Send + 'static,
		F: Fn(Arc<dyn UtxoProvider>) -> EndpointFuture<T> + Send + Sync + Clone + 'static,
	{
		self.providers
			.iter()
			.map(|provider| {
				let provider = provider.clone();
				let call = call.clone();
				Endpoint::new(provider.name().to_string(), move || call(provider.clone()))
			})
			.collect()
	}
}

/// Provider sets keyed by network.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	networks: HashMap<Network, ProviderSet>,
}

impl ProviderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or replaces) the providers for `network`.
	pub fn with_network(mut self, network: Network, providers: ProviderSet) -> Self {
		self.networks.insert(network, providers);
		self
	}

	/// Providers for `network`, if any are configured.
	pub fn providers(&self, network: Network) -> Option<&ProviderSet> {
		self.networks.get(&network).filter(|set| !set.is_empty())
	}
}
