//! UTXO wallet relay: balance queries, transaction broadcast with provider fallback and
//! retry, and confirmation tracking.

pub mod config;
pub mod dispatch;
pub mod provider;
pub mod transaction;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, MonitorConfig, RetryDelay};
pub use provider::{MemoryProvider, Network, ProviderRegistry, ProviderSet, Utxo, UtxoProvider};
pub use transaction::{PendingTransaction, TransactionEvent, TransactionHandle};
pub use utils::Amount;
pub use wallet::{Asset, BalanceOptions, Client, ClientError, SendOptions};
