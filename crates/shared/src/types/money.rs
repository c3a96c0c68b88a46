//! Currency codes and minor-unit precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal`; a currency only contributes its
//! minor-unit scale, which bounds how many fractional digits an amount may carry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Pound Sterling
    Gbp,
    /// Indian Rupee
    Inr,
    /// Indonesian Rupiah
    Idr,
    /// Singapore Dollar
    Sgd,
    /// Japanese Yen
    Jpy,
}

/// Error returned when parsing an unsupported currency code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown currency: {0}")]
pub struct UnknownCurrency(pub String);

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Inr => "INR",
            Self::Idr => "IDR",
            Self::Sgd => "SGD",
            Self::Jpy => "JPY",
        }
    }

    /// Number of fractional digits in the currency's minor unit.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::Jpy => 0,
            Self::Usd | Self::Eur | Self::Gbp | Self::Inr | Self::Idr | Self::Sgd => 2,
        }
    }

    /// Returns true if `amount` is representable in this currency's minor unit.
    ///
    /// Trailing zeros are ignored, so `10.500` is valid for a two-digit currency.
    #[must_use]
    pub fn accepts(self, amount: Decimal) -> bool {
        amount.normalize().scale() <= self.minor_units()
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "INR" => Ok(Self::Inr),
            "IDR" => Ok(Self::Idr),
            "SGD" => Ok(Self::Sgd),
            "JPY" => Ok(Self::Jpy),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[rstest]
    #[case("USD", Currency::Usd)]
    #[case("usd", Currency::Usd)]
    #[case(" eur ", Currency::Eur)]
    #[case("GBP", Currency::Gbp)]
    #[case("INR", Currency::Inr)]
    #[case("IDR", Currency::Idr)]
    #[case("SGD", Currency::Sgd)]
    #[case("JPY", Currency::Jpy)]
    fn test_currency_from_str(#[case] input: &str, #[case] expected: Currency) {
        assert_eq!(Currency::from_str(input).unwrap(), expected);
    }

    #[test]
    fn test_currency_from_str_unknown() {
        assert_eq!(
            Currency::from_str("XXX"),
            Err(UnknownCurrency("XXX".to_string()))
        );
        assert!(Currency::from_str("").is_err());
    }

    #[test]
    fn test_currency_display_matches_code() {
        assert_eq!(Currency::Usd.to_string(), "USD");
        assert_eq!(Currency::Jpy.to_string(), Currency::Jpy.code());
    }

    #[test]
    fn test_currency_accepts_minor_units() {
        assert!(Currency::Usd.accepts(dec!(10.25)));
        assert!(Currency::Usd.accepts(dec!(10.500)));
        assert!(!Currency::Usd.accepts(dec!(10.255)));
        assert!(Currency::Jpy.accepts(dec!(1500)));
        assert!(!Currency::Jpy.accepts(dec!(1500.5)));
    }
}
