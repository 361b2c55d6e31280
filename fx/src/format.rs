//! Display formatting for converted amounts.

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use xrate_common::symbol_for;

use crate::resolver::RateResolver;

/// Display scale of currencies without minor units. Only decides the
/// formatting class; rates are never adjusted by it.
const SCALE_FACTORS: &[(&str, u32)] = &[
    ("JPY", 100),
    ("KRW", 1000),
    ("IDR", 10000),
    ("VND", 10000),
    ("UGX", 1000),
    ("TZS", 1000),
    ("RWF", 1000),
    ("XOF", 100),
    ("XAF", 100),
    ("CLP", 1000),
    ("COP", 1000),
    ("PYG", 1000),
    ("ISK", 100),
];

const BILLION: f64 = 1e9;
const MILLION: f64 = 1e6;
const THOUSAND: f64 = 1e3;

/// How a currency's amounts are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleClass {
    /// No minor unit, large nominal values: whole numbers, `K` abbreviation.
    NoMinorUnit,
    /// Up to two fractional digits.
    Standard,
}

impl ScaleClass {
    pub fn of(code: &str) -> Self {
        if scale_factor(code) > 1 {
            ScaleClass::NoMinorUnit
        } else {
            ScaleClass::Standard
        }
    }
}

/// Display scale factor for `code`; 1 for standard currencies.
pub fn scale_factor(code: &str) -> u32 {
    let code = code.trim();
    SCALE_FACTORS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, factor)| *factor)
        .unwrap_or(1)
}

/// Render an amount already expressed in `code`.
///
/// Output is `{symbol}{number}{suffix}` with suffix one of `""`, `K`, `M`
/// or `B`.
pub fn format_amount(value: f64, code: &str, symbol: &str) -> String {
    let class = ScaleClass::of(code);
    let magnitude = value.abs();

    let (number, suffix) = if magnitude >= BILLION {
        (fixed(value / BILLION, 1), "B")
    } else if magnitude >= MILLION {
        match class {
            ScaleClass::NoMinorUnit => (fixed(value / MILLION, 0), "M"),
            ScaleClass::Standard => (fixed(value / MILLION, 1), "M"),
        }
    } else if magnitude >= THOUSAND && class == ScaleClass::NoMinorUnit {
        (fixed(value / THOUSAND, 0), "K")
    } else {
        match class {
            ScaleClass::NoMinorUnit => (fixed(value, 0), ""),
            ScaleClass::Standard => (up_to(value, 2), ""),
        }
    };

    format!("{}{}{}", symbol, number, suffix)
}

/// Formats base-currency amounts in any currency using a shared resolver.
#[derive(Debug, Clone)]
pub struct AmountFormatter {
    resolver: Arc<RateResolver>,
}

impl AmountFormatter {
    pub fn new(resolver: Arc<RateResolver>) -> Self {
        Self { resolver }
    }

    /// Convert a base-currency `amount` into `code` and render it.
    pub fn format(&self, amount: f64, code: &str, symbol: &str) -> String {
        let converted = self.resolver.convert_from_base(amount, code);
        format_amount(converted, code, symbol)
    }

    /// Like [`AmountFormatter::format`] with the currency's usual symbol.
    pub fn format_default(&self, amount: f64, code: &str) -> String {
        self.format(amount, code, &symbol_for(code))
    }
}

/// Exactly `dp` fractional digits, grouped.
fn fixed(value: f64, dp: u32) -> String {
    match Decimal::from_f64(value) {
        Some(d) => {
            let mut rounded = d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(dp);
            group(&rounded.to_string())
        }
        None => format!("{:.*}", dp as usize, value),
    }
}

/// At most `dp` fractional digits, trailing zeros dropped, grouped.
fn up_to(value: f64, dp: u32) -> String {
    match Decimal::from_f64(value) {
        Some(d) => {
            let rounded = d
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
                .normalize();
            group(&rounded.to_string())
        }
        None => format!("{:.*}", dp as usize, value),
    }
}

/// Insert `,` between thousands in the integer part of a plain decimal.
fn group(plain: &str) -> String {
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3);
    grouped.push_str(sign);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::provider::MockRateSource;
    use crate::table::RateTable;
    use xrate_common::{CurrencyCode, SystemClock};

    fn formatter(table: RateTable) -> AmountFormatter {
        let resolver = RateResolver::with_table(
            Arc::new(MockRateSource::new("mock")),
            ResolverConfig::default(),
            table,
            Arc::new(SystemClock),
        );
        AmountFormatter::new(Arc::new(resolver))
    }

    #[test]
    fn test_scale_classes() {
        assert_eq!(ScaleClass::of("JPY"), ScaleClass::NoMinorUnit);
        assert_eq!(ScaleClass::of("vnd"), ScaleClass::NoMinorUnit);
        assert_eq!(ScaleClass::of("USD"), ScaleClass::Standard);
        assert_eq!(ScaleClass::of("ZZZ"), ScaleClass::Standard);
        assert_eq!(scale_factor("JPY"), 100);
        assert_eq!(scale_factor("EUR"), 1);
    }

    #[test]
    fn test_standard_buckets() {
        assert_eq!(format_amount(1_500_000.0, "USD", "$"), "$1.5M");
        assert_eq!(format_amount(2_300_000_000.0, "USD", "$"), "$2.3B");
        assert_eq!(format_amount(2_000_000.0, "EUR", "€"), "€2.0M");
        assert_eq!(format_amount(1_234.567, "USD", "$"), "$1,234.57");
        assert_eq!(format_amount(999_999.5, "USD", "$"), "$999,999.5");
        assert_eq!(format_amount(12.0, "USD", "$"), "$12");
        assert_eq!(format_amount(0.0, "USD", "$"), "$0");
    }

    #[test]
    fn test_no_minor_unit_buckets() {
        assert_eq!(format_amount(999.0, "JPY", "¥"), "¥999");
        assert_eq!(format_amount(999.4, "JPY", "¥"), "¥999");
        assert_eq!(format_amount(149_350.5, "JPY", "¥"), "¥149K");
        assert_eq!(format_amount(24_500_000.0, "VND", "₫"), "₫25M");
        assert_eq!(format_amount(15_650_000_000.0, "IDR", "Rp"), "Rp15.7B");
    }

    #[test]
    fn test_negative_amounts_use_magnitude() {
        assert_eq!(format_amount(-1_500_000.0, "USD", "$"), "$-1.5M");
        assert_eq!(format_amount(-1_234.5, "USD", "$"), "$-1,234.5");
    }

    #[test]
    fn test_grouping() {
        assert_eq!(group("1234567.25"), "1,234,567.25");
        assert_eq!(group("-999"), "-999");
        assert_eq!(group("100000"), "100,000");
    }

    #[test]
    fn test_formatter_converts_from_base() {
        let fmt = formatter(RateTable::embedded());

        assert_eq!(fmt.format(1_500_000.0, "USD", "$"), "$1.5M");
        assert_eq!(fmt.format(2_300_000_000.0, "USD", "$"), "$2.3B");
        assert_eq!(fmt.format(1_000.0, "XOF", "CFA"), "CFA603K");
        assert_eq!(fmt.format_default(100.0, "EUR"), "€92");
    }

    #[test]
    fn test_formatter_integer_currency_without_suffix() {
        let table = RateTable::from_pairs(CurrencyCode::usd(), vec![("JPY", 1.0)]).unwrap();
        let fmt = formatter(table);

        assert_eq!(fmt.format(999.0, "JPY", "¥"), "¥999");
    }

    #[test]
    fn test_formatter_unknown_currency() {
        let fmt = formatter(RateTable::embedded());
        assert_eq!(fmt.format_default(50.0, "ZZZ"), "ZZZ 50");
    }
}
