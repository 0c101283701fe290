pub mod client;
pub mod types;
pub mod utxo_selector;

pub use client::Client;
pub use types::*;
pub use utxo_selector::{BalanceError, UtxoSelector};
