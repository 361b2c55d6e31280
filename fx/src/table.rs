//! Rate tables and the embedded fallback table.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use xrate_common::CurrencyCode;

use crate::error::{RefreshError, RefreshResult};

/// Compiled-in rates against USD, served until a refresh succeeds.
const EMBEDDED_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("CHF", 0.88),
    ("CAD", 1.36),
    ("AUD", 1.52),
    ("JPY", 149.5),
    ("CNY", 7.24),
    ("KRW", 1330.0),
    ("INR", 83.2),
    ("IDR", 15650.0),
    ("VND", 24500.0),
    ("AED", 3.67),
    ("ZAR", 18.6),
    ("NGN", 1550.0),
    ("GHS", 15.2),
    ("KES", 129.0),
    ("UGX", 3750.0),
    ("TZS", 2520.0),
    ("RWF", 1300.0),
    ("XOF", 603.0),
    ("XAF", 603.0),
    ("MAD", 10.0),
    ("EGP", 48.5),
    ("BRL", 5.05),
    ("MXN", 17.1),
    ("CLP", 940.0),
    ("COP", 3950.0),
    ("PYG", 7300.0),
];

/// Mapping from currency code to rate against a single base currency.
///
/// The base is always present at exactly 1.0 and every rate is finite and
/// strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    base: CurrencyCode,
    rates: BTreeMap<CurrencyCode, f64>,
}

impl RateTable {
    /// Table containing only the base currency.
    pub fn new(base: CurrencyCode) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(base.clone(), 1.0);
        Self { base, rates }
    }

    /// The compiled-in fallback table (USD based).
    pub fn embedded() -> Self {
        let mut table = Self::new(CurrencyCode::usd());
        for (code, rate) in EMBEDDED_RATES {
            table.rates.insert(CurrencyCode::new(code), *rate);
        }
        table
    }

    /// The compiled-in table rebased onto `base`.
    ///
    /// A base the embedded table does not know yields a table holding only
    /// that base.
    pub fn embedded_in(base: &CurrencyCode) -> Self {
        let embedded = Self::embedded();
        if embedded.base() == base {
            return embedded;
        }
        match Self::normalize(base.clone(), Some(embedded.base()), embedded.iter()) {
            Ok(table) => table,
            Err(_) => {
                debug!(base = %base, "Base missing from embedded table");
                Self::new(base.clone())
            }
        }
    }

    /// Build a table from rates already expressed against `base`.
    pub fn from_pairs<I, S>(base: CurrencyCode, pairs: I) -> RefreshResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let declared = base.clone();
        Self::normalize(base, Some(&declared), pairs)
    }

    /// Validate raw rates and rebase them onto `expected_base`.
    ///
    /// `declared_base` is the base the source claims its rates are quoted
    /// in. If the expected base is missing from the map but equals the
    /// declared base it is taken as 1.0; otherwise it must be present.
    /// Every rate is divided by the expected base's incoming rate, so the
    /// base ends up at exactly 1.0 whatever the source sent.
    pub fn normalize<I, S>(
        expected_base: CurrencyCode,
        declared_base: Option<&CurrencyCode>,
        raw: I,
    ) -> RefreshResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut accepted: BTreeMap<CurrencyCode, f64> = BTreeMap::new();

        for (code, rate) in raw {
            let code = code.as_ref();
            let parsed = match CurrencyCode::parse(code) {
                Ok(parsed) => parsed,
                Err(_) => {
                    debug!(code, "Dropping rate with invalid currency code");
                    continue;
                }
            };
            if !rate.is_finite() || rate <= 0.0 {
                debug!(code = %parsed, rate, "Dropping non-positive rate");
                continue;
            }
            accepted.insert(parsed, rate);
        }

        if accepted.is_empty() {
            return Err(RefreshError::EmptyTable);
        }

        let base_rate = match accepted.get(&expected_base) {
            Some(rate) => *rate,
            None if declared_base == Some(&expected_base) => 1.0,
            None => return Err(RefreshError::MissingBase(expected_base)),
        };

        if base_rate != 1.0 {
            for rate in accepted.values_mut() {
                *rate /= base_rate;
            }
            accepted.retain(|_, rate| rate.is_finite() && *rate > 0.0);
        }
        accepted.insert(expected_base.clone(), 1.0);

        Ok(Self {
            base: expected_base,
            rates: accepted,
        })
    }

    /// The currency all rates are expressed against.
    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    /// Rate for `code`, matched case-insensitively.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .or_else(|| self.rates.get(code.trim().to_ascii_uppercase().as_str()))
            .copied()
    }

    /// Rate for `code`, or 1.0 when the table does not know it.
    pub fn rate_or_identity(&self, code: &str) -> f64 {
        match self.rate(code) {
            Some(rate) => rate,
            None => {
                debug!(code, "Unknown currency, using identity rate");
                1.0
            }
        }
    }

    /// Whether the table carries a rate for `code`.
    pub fn contains(&self, code: &str) -> bool {
        self.rate(code).is_some()
    }

    /// Number of currencies, base included.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Never true for a constructed table; the base is always present.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Iterate over `(code, rate)` in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, f64)> {
        self.rates.iter().map(|(code, rate)| (code, *rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_table_invariants() {
        let table = RateTable::embedded();

        assert_eq!(table.base(), &CurrencyCode::usd());
        assert_eq!(table.rate("USD"), Some(1.0));
        assert!(table.iter().all(|(_, rate)| rate.is_finite() && rate > 0.0));
        assert!(table.contains("XOF"));
        assert!(table.contains("jpy"));
    }

    #[test]
    fn test_normalize_rebases_onto_expected_base() {
        let raw = vec![("EUR", 1.0), ("USD", 1.25), ("GBP", 0.8)];
        let declared = CurrencyCode::eur();

        let table = RateTable::normalize(CurrencyCode::usd(), Some(&declared), raw).unwrap();

        assert_eq!(table.rate("USD"), Some(1.0));
        assert!((table.rate("EUR").unwrap() - 0.8).abs() < 1e-12);
        assert!((table.rate("GBP").unwrap() - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_implicit_base() {
        let declared = CurrencyCode::usd();
        let table =
            RateTable::normalize(CurrencyCode::usd(), Some(&declared), vec![("eur", 0.9)]).unwrap();

        assert_eq!(table.rate("USD"), Some(1.0));
        assert_eq!(table.rate("EUR"), Some(0.9));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_normalize_missing_base() {
        let declared = CurrencyCode::eur();
        let result = RateTable::normalize(CurrencyCode::usd(), Some(&declared), vec![("GBP", 0.8)]);

        assert!(matches!(result, Err(RefreshError::MissingBase(code)) if code.as_str() == "USD"));
    }

    #[test]
    fn test_normalize_drops_invalid_entries() {
        let raw = vec![
            ("USD", 1.0),
            ("EUR", 0.0),
            ("GBP", -2.0),
            ("BAD1", 3.0),
            ("JPY", f64::NAN),
            ("CHF", 0.9),
        ];

        let table = RateTable::from_pairs(CurrencyCode::usd(), raw).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.contains("CHF"));
        assert!(!table.contains("EUR"));
    }

    #[test]
    fn test_normalize_empty() {
        let raw: Vec<(&str, f64)> = vec![("EUR", -1.0)];
        let result = RateTable::from_pairs(CurrencyCode::usd(), raw);

        assert!(matches!(result, Err(RefreshError::EmptyTable)));
    }

    #[test]
    fn test_base_pinned_even_if_source_disagrees() {
        let table =
            RateTable::from_pairs(CurrencyCode::usd(), vec![("USD", 2.0), ("EUR", 1.8)]).unwrap();

        assert_eq!(table.rate("USD"), Some(1.0));
        assert!((table.rate("EUR").unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_embedded_rebased_onto_other_base() {
        let table = RateTable::embedded_in(&CurrencyCode::eur());

        assert_eq!(table.base(), &CurrencyCode::eur());
        assert_eq!(table.rate("EUR"), Some(1.0));
        assert!((table.rate("USD").unwrap() - 1.0 / 0.92).abs() < 1e-12);
        assert_eq!(table.len(), RateTable::embedded().len());
    }

    #[test]
    fn test_embedded_with_unknown_base_keeps_only_base() {
        let table = RateTable::embedded_in(&CurrencyCode::new("ZZZ"));

        assert_eq!(table.base().as_str(), "ZZZ");
        assert_eq!(table.len(), 1);
        assert_eq!(table.rate("ZZZ"), Some(1.0));
    }

    #[test]
    fn test_unknown_code_is_identity() {
        let table = RateTable::embedded();
        assert_eq!(table.rate_or_identity("ZZZ"), 1.0);
    }
}
