//! Currency codes and display symbols.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest code accepted by [`CurrencyCode::parse`].
///
/// ISO 4217 codes are three letters, but some rate feeds carry longer
/// tickers (e.g. "USDC"), so the limit is looser.
pub const MAX_CODE_LEN: usize = 8;

/// Error returned when a string is not a usable currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code: {0:?}")]
pub struct InvalidCurrencyCode(pub String);

/// Currency code, always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a code without validation, normalizing case.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Parse and validate a code.
    pub fn parse(code: &str) -> Result<Self, InvalidCurrencyCode> {
        let trimmed = code.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_CODE_LEN
            && trimmed.chars().all(|c| c.is_ascii_alphabetic());

        if valid {
            Ok(Self::new(trimmed))
        } else {
            Err(InvalidCurrencyCode(code.to_string()))
        }
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Conventional display symbol for this currency.
    pub fn symbol(&self) -> String {
        symbol_for(&self.0)
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = InvalidCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = InvalidCurrencyCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for CurrencyCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Symbols for the currencies the site quotes prices in.
const SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CNY", "¥"),
    ("KRW", "₩"),
    ("INR", "₹"),
    ("IDR", "Rp"),
    ("VND", "₫"),
    ("NGN", "₦"),
    ("GHS", "₵"),
    ("KES", "KSh"),
    ("UGX", "USh"),
    ("TZS", "TSh"),
    ("RWF", "FRw"),
    ("ZAR", "R"),
    ("XOF", "CFA"),
    ("XAF", "FCFA"),
    ("MAD", "DH"),
    ("EGP", "E£"),
    ("BRL", "R$"),
    ("MXN", "MX$"),
    ("CLP", "CLP$"),
    ("COP", "COL$"),
    ("PYG", "₲"),
    ("CAD", "CA$"),
    ("AUD", "A$"),
    ("CHF", "CHF "),
    ("AED", "AED "),
];

/// Conventional symbol for `code`, or the code followed by a space when
/// no symbol is known.
pub fn symbol_for(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    SYMBOLS
        .iter()
        .find(|(c, _)| *c == upper)
        .map(|(_, s)| (*s).to_string())
        .unwrap_or_else(|| format!("{} ", upper))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_uppercased() {
        assert_eq!(CurrencyCode::new(" eur ").as_str(), "EUR");
        assert_eq!(CurrencyCode::from("xof"), CurrencyCode::new("XOF"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(CurrencyCode::parse("").is_err());
        assert!(CurrencyCode::parse("US1").is_err());
        assert!(CurrencyCode::parse("TOOLONGCODE").is_err());
        assert_eq!(CurrencyCode::parse("usdc").unwrap().as_str(), "USDC");
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let code: CurrencyCode = serde_json::from_str("\"jpy\"").unwrap();
        assert_eq!(code, CurrencyCode::jpy());
        assert!(serde_json::from_str::<CurrencyCode>("\"1\"").is_err());
    }

    #[test]
    fn test_symbols() {
        assert_eq!(symbol_for("usd"), "$");
        assert_eq!(CurrencyCode::jpy().symbol(), "¥");
        assert_eq!(symbol_for("ZZZ"), "ZZZ ");
    }
}
