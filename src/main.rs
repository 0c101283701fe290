use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use utxo_relay::config::{ClientConfig, MonitorConfig, RetryDelay};
use utxo_relay::provider::{MemoryProvider, Network, ProviderError, ProviderRegistry, ProviderSet, Utxo};
use utxo_relay::transaction::{
	BuildContext, BuildError, SignedTransaction, Signer, TransactionBuilder, TransactionEvent,
};
use utxo_relay::utils::Amount;
use utxo_relay::wallet::{Asset, BalanceOptions, Client, SendOptions};

const DEMO_ADDRESS: &str = "tb1qdemowallet";

struct DemoSigner;

impl Signer for DemoSigner {
	fn address(&self, _network: Network) -> Result<String, BuildError> {
		Ok(DEMO_ADDRESS.to_string())
	}

	fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, BuildError> {
		Ok(digest.iter().rev().copied().collect())
	}
}

/// Spends the largest candidates until the request is covered and emits a toy encoding.
struct DemoBuilder;

#[async_trait::async_trait]
impl TransactionBuilder for DemoBuilder {
	async fn build(&self, context: BuildContext<'_>) -> Result<SignedTransaction, BuildError> {
		let required = context
			.request
			.required_units()
			.ok_or_else(|| BuildError::ValidationError("fee exceeds value".to_string()))?;

		let mut covered = 0u64;
		let mut raw = Vec::new();
		for utxo in context.utxos {
			if covered >= required {
				break;
			}
			covered = covered.saturating_add(utxo.amount);
			raw.extend_from_slice(utxo.tx_hash.as_bytes());
			raw.extend_from_slice(&utxo.v_out.to_le_bytes());
		}
		if covered < required {
			return Err(BuildError::InsufficientBalance(format!(
				"need {}, selected {}",
				Amount::from_units(required.into()),
				Amount::from_units(covered.into())
			)));
		}

		raw.extend_from_slice(context.request.to_address.as_bytes());
		raw.extend_from_slice(&context.request.value_units.to_le_bytes());
		let signature = context.signer.sign_digest(&raw)?;
		raw.extend_from_slice(&signature);
		Ok(SignedTransaction::new(raw))
	}
}

fn demo_utxo(index: u32, amount: u64, confirmations: u64) -> Utxo {
	Utxo {
		tx_hash: format!("{:064x}", index),
		v_out: index,
		amount,
		confirmations,
		script_pub_key: vec![0x00, 0x14],
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive("utxo_relay=debug".parse().unwrap())
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wallet relay demo");

	let utxos = vec![
		demo_utxo(1, 500_000_000, 12),
		demo_utxo(2, 300_000_000, 3),
		demo_utxo(3, 1_000_000_000, 1),
		demo_utxo(4, 100_000_000, 0),
	];

	// The primary drops its first two calls so the backup takes over.
	let primary = Arc::new(MemoryProvider::new("primary"));
	primary.set_utxos(DEMO_ADDRESS, utxos.clone());
	primary.fail_next(2, ProviderError::Unavailable("connection reset".to_string()));
	let backup = Arc::new(MemoryProvider::new("backup"));
	backup.set_utxos(DEMO_ADDRESS, utxos);

	let registry = ProviderRegistry::new().with_network(
		Network::Testnet,
		ProviderSet::new(vec![primary.clone(), backup.clone()]),
	);

	let config = ClientConfig::new(Network::Testnet)
		.with_retry_delay(RetryDelay::Fixed(Duration::from_millis(500)))
		.with_monitor(
			MonitorConfig::default()
				.with_poll_interval(Duration::from_secs(1))
				.with_target_confirmations(3),
		);

	let client = Client::new(config, &registry, Arc::new(DemoSigner), Arc::new(DemoBuilder))
		.expect("testnet providers are registered");

	info!("Client ready on {}", client.network());

	let asset = Asset::native();
	for confirmations in [0, 1, 6] {
		let balance = client
			.get_balance(&asset, BalanceOptions::default().with_confirmations(confirmations))
			.await
			.unwrap();
		info!(
			"Balance with {} confirmation(s): {} {}",
			confirmations, balance, asset
		);
	}

	let value: Amount = "12.5".parse().unwrap();
	let pending = match client.send("tb1qrecipient", value, &asset, SendOptions::default()) {
		Ok(pending) => pending,
		Err(e) => {
			error!("Send rejected: {}", e);
			return;
		}
	};
	let (handle, mut events, outcome) = pending.into_parts();

	let tx_hash = match outcome.await {
		Ok(tx_hash) => tx_hash,
		Err(e) => {
			error!("Send failed: {}", e);
			return;
		}
	};
	info!("Outcome resolved with {} ({})", tx_hash, handle.state());

	// Mine a block per second on both providers.
	let miner = tokio::spawn({
		let tx_hash = tx_hash.clone();
		async move {
			for depth in 1..=5 {
				tokio::time::sleep(Duration::from_secs(1)).await;
				primary.set_confirmations(&tx_hash, depth);
				backup.set_confirmations(&tx_hash, depth);
			}
		}
	});

	while let Some(event) = events.next().await {
		info!("Event: {}", serde_json::to_string(&event).unwrap());
		if let TransactionEvent::Confirmation(count) = event {
			info!("{} has {} confirmation(s)", tx_hash, count);
		}
	}

	miner.abort();
	info!(
		"Finished: {} with {} confirmation(s)",
		handle.state(),
		handle.confirmation_count()
	);
}
