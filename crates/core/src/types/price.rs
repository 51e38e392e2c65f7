//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Whether the amount carries no more decimal places than the currency allows.
    #[must_use]
    pub fn is_precision_aligned(&self) -> bool {
        self.amount.normalize().scale() <= self.currency_code.exponent()
    }

    /// Round half away from zero to the currency's minor unit.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                self.currency_code.exponent(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency_code: self.currency_code,
        }
    }
}

/// Error returned when a string is not a supported ISO 4217 code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

macro_rules! currencies {
    ($($code:ident => $exp:expr, $symbol:expr;)+) => {
        /// ISO 4217 currency codes supported by the catalog.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
        #[allow(clippy::upper_case_acronyms)]
        pub enum CurrencyCode {
            #[default]
            $($code,)+
        }

        impl CurrencyCode {
            /// Every supported currency, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$code,)+];

            /// The three-letter ISO code.
            #[must_use]
            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$code => stringify!($code),)+
                }
            }

            /// Number of minor-unit digits (2 for USD, 0 for JPY, 3 for KWD).
            #[must_use]
            pub const fn exponent(self) -> u32 {
                match self {
                    $(Self::$code => $exp,)+
                }
            }

            /// Display symbol used by the money formatter.
            #[must_use]
            pub const fn symbol(self) -> &'static str {
                match self {
                    $(Self::$code => $symbol,)+
                }
            }
        }

        impl FromStr for CurrencyCode {
            type Err = UnknownCurrency;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $(stringify!($code) => Ok(Self::$code),)+
                    _ => Err(UnknownCurrency(s.to_string())),
                }
            }
        }
    };
}

// The first entry is the default.
currencies! {
    USD => 2, "$";
    EUR => 2, "€";
    GBP => 2, "£";
    CAD => 2, "CA$";
    AUD => 2, "A$";
    NZD => 2, "NZ$";
    CHF => 2, "CHF";
    SEK => 2, "kr";
    NOK => 2, "kr";
    DKK => 2, "kr.";
    PLN => 2, "zł";
    CZK => 2, "Kč";
    HUF => 2, "Ft";
    JPY => 0, "¥";
    KRW => 0, "₩";
    CNY => 2, "CN¥";
    INR => 2, "₹";
    BRL => 2, "R$";
    MXN => 2, "MX$";
    ZAR => 2, "R";
    KWD => 3, "KD";
    BHD => 3, "BD";
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!("usd".parse::<CurrencyCode>(), Ok(CurrencyCode::USD));
        assert_eq!(" Eur ".parse::<CurrencyCode>(), Ok(CurrencyCode::EUR));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_currency_exponents() {
        assert_eq!(CurrencyCode::USD.exponent(), 2);
        assert_eq!(CurrencyCode::JPY.exponent(), 0);
        assert_eq!(CurrencyCode::KWD.exponent(), 3);
    }

    #[test]
    fn test_default_currency_is_usd() {
        assert_eq!(CurrencyCode::default(), CurrencyCode::USD);
        assert_eq!(CurrencyCode::ALL.first(), Some(&CurrencyCode::USD));
    }

    #[test]
    fn test_precision_alignment() {
        assert!(Price::new(dec("19.99"), CurrencyCode::USD).is_precision_aligned());
        assert!(Price::new(dec("19.990"), CurrencyCode::USD).is_precision_aligned());
        assert!(!Price::new(dec("19.999"), CurrencyCode::USD).is_precision_aligned());
        assert!(!Price::new(dec("100.5"), CurrencyCode::JPY).is_precision_aligned());
        assert!(Price::new(dec("1.125"), CurrencyCode::KWD).is_precision_aligned());
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let price = Price::new(dec("10.005"), CurrencyCode::USD).rounded();
        assert_eq!(price.amount, dec("10.01"));
        let yen = Price::new(dec("99.5"), CurrencyCode::JPY).rounded();
        assert_eq!(yen.amount, dec("100"));
    }

    #[test]
    fn test_price_serializes_amount_as_string() {
        let json = serde_json::to_value(Price::new(dec("5.50"), CurrencyCode::GBP)).unwrap();
        assert_eq!(json["amount"], "5.50");
        assert_eq!(json["currency_code"], "GBP");
    }
}
