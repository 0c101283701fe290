use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits of the ledger's display unit.
pub const LEDGER_DECIMALS: u32 = 8;

const UNITS_PER_COIN: u128 = 10u128.pow(LEDGER_DECIMALS);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
	#[error("empty amount")]
	Empty,

	#[error("invalid digit in amount: {0}")]
	InvalidDigit(String),

	#[error("amount has more than {LEDGER_DECIMALS} fractional digits: {0}")]
	TooPrecise(String),

	#[error("amount does not fit the ledger's value range: {0}")]
	Overflow(String),
}

/// A value expressed in the ledger's smallest unit.
///
/// Arithmetic never leaves integer space. The decimal representation only exists in
/// `Display` and `FromStr`, so `"19.00000000".parse::<Amount>()` yields
/// `Amount::from_units(1_900_000_000)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
	pub const ZERO: Amount = Amount(0);

	pub const fn from_units(units: u128) -> Self {
		Self(units)
	}

	pub const fn units(&self) -> u128 {
		self.0
	}

	/// Smallest-unit value as `u64`, the width used by UTXOs and transaction requests.
	pub fn to_u64(&self) -> Option<u64> {
		u64::try_from(self.0).ok()
	}

	/// Sums smallest-unit values, returning `None` on overflow.
	pub fn checked_sum<I>(values: I) -> Option<Amount>
	where
		I: IntoIterator<Item = u64>,
	{
		values
			.into_iter()
			.try_fold(0u128, |acc, value| acc.checked_add(u128::from(value)))
			.map(Amount)
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}.{:0width$}",
			self.0 / UNITS_PER_COIN,
			self.0 % UNITS_PER_COIN,
			width = LEDGER_DECIMALS as usize
		)
	}
}

impl FromStr for Amount {
	type Err = AmountParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(AmountParseError::Empty);
		}

		let (whole, fraction) = match s.split_once('.') {
			Some((whole, fraction)) => (whole, fraction),
			None => (s, ""),
		};
		if whole.is_empty() && fraction.is_empty() {
			return Err(AmountParseError::InvalidDigit(s.to_string()));
		}
		if fraction.len() > LEDGER_DECIMALS as usize {
			return Err(AmountParseError::TooPrecise(s.to_string()));
		}

		let parse_digits = |digits: &str| -> Result<u128, AmountParseError> {
			if digits.is_empty() {
				return Ok(0);
			}
			if !digits.bytes().all(|b| b.is_ascii_digit()) {
				return Err(AmountParseError::InvalidDigit(s.to_string()));
			}
			digits
				.parse::<u128>()
				.map_err(|_| AmountParseError::Overflow(s.to_string()))
		};

		let whole_units = parse_digits(whole)?
			.checked_mul(UNITS_PER_COIN)
			.ok_or_else(|| AmountParseError::Overflow(s.to_string()))?;
		let padding = 10u128.pow(LEDGER_DECIMALS - fraction.len() as u32);
		let fraction_units = parse_digits(fraction)? * padding;

		whole_units
			.checked_add(fraction_units)
			.map(Amount)
			.ok_or_else(|| AmountParseError::Overflow(s.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_uses_eight_fractional_digits() {
		assert_eq!(Amount::from_units(1_900_000_000).to_string(), "19.00000000");
		assert_eq!(Amount::from_units(1).to_string(), "0.00000001");
		assert_eq!(Amount::ZERO.to_string(), "0.00000000");
	}

	#[test]
	fn test_parse_decimal_strings() {
		assert_eq!("1.5".parse::<Amount>().unwrap().units(), 150_000_000);
		assert_eq!("0.00000001".parse::<Amount>().unwrap().units(), 1);
		assert_eq!("42".parse::<Amount>().unwrap().units(), 4_200_000_000);
		assert_eq!(".25".parse::<Amount>().unwrap().units(), 25_000_000);
	}

	#[test]
	fn test_parse_rejects_bad_input() {
		assert_eq!("".parse::<Amount>(), Err(AmountParseError::Empty));
		assert!(matches!(
			"0.000000001".parse::<Amount>(),
			Err(AmountParseError::TooPrecise(_))
		));
		assert!(matches!(
			"-1".parse::<Amount>(),
			Err(AmountParseError::InvalidDigit(_))
		));
		assert!(matches!(
			"1e8".parse::<Amount>(),
			Err(AmountParseError::InvalidDigit(_))
		));
		assert!(matches!(
			".".parse::<Amount>(),
			Err(AmountParseError::InvalidDigit(_))
		));
	}

	#[test]
	fn test_checked_sum_is_order_independent() {
		let a = Amount::checked_sum([500_000_000, 300_000_000, 1_000_000_000, 100_000_000]);
		let b = Amount::checked_sum([100_000_000, 1_000_000_000, 300_000_000, 500_000_000]);
		assert_eq!(a, Some(Amount::from_units(1_900_000_000)));
		assert_eq!(a, b);
	}

	#[test]
	fn test_checked_sum_does_not_wrap() {
		let total = Amount::checked_sum([u64::MAX, u64::MAX]).unwrap();
		assert_eq!(total.units(), 2 * u128::from(u64::MAX));
	}
}
