//!
//! Utility module shared by the wallet and transaction layers.
//!
//! Re-exports the smallest-unit `Amount` type and its decimal formatting.
/// Smallest-unit amounts and their decimal representation
pub mod amount;

pub use amount::{Amount, AmountParseError, LEDGER_DECIMALS};
