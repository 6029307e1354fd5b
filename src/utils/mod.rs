//! Utility functions for formatting and common operations
//!
//! Money is displayed the way the dealership reads it: `.` as thousands
//! separator, `,` as decimal separator, `U$S` as the dollar marker.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::SalesError;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "U$S " prefix
    Usd,
    /// No currency symbol (table cells, exports)
    None,
}

fn group_thousands(integer_part: &str) -> String {
    let digits: Vec<char> = integer_part.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(*c);
    }
    out
}

/// Core formatting function with full control over output.
///
/// # Examples
/// ```
/// use salesboard::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::Usd),
///     "U$S 1.234,56"
/// );
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1.234,00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let sign = if value < Decimal::ZERO { "-" } else { "" };
    let formatted = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let prefix = match symbol {
        CurrencySymbol::Usd => "U$S ",
        CurrencySymbol::None => "",
    };

    let result = format!(
        "{}{}{},{}",
        prefix,
        sign,
        group_thousands(integer_part),
        decimal_part
    );

    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// "U$S 1.234,56"
pub fn format_usd(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::Usd)
}

/// "1.234,56"
pub fn format_decimal(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::None)
}

/// Percentage with two decimals: "12,38%"
pub fn format_percent(value: Decimal) -> String {
    format!("{}%", format_decimal(value))
}

/// Short form for KPI cards: "U$S 1,2M", "U$S 850,0K"
///
/// # Examples
/// ```
/// use salesboard::utils::format_usd_compact;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_usd_compact(dec!(1250000)), "U$S 1,2M");
/// assert_eq!(format_usd_compact(dec!(999)), "U$S 999,00");
/// ```
pub fn format_usd_compact(value: Decimal) -> String {
    let thousand = Decimal::from(1_000);
    let million = Decimal::from(1_000_000);
    let abs = value.abs();
    let sign = if value < Decimal::ZERO { "-" } else { "" };
    let (scaled, suffix) = if abs >= million {
        (abs / million, "M")
    } else if abs >= thousand {
        (abs / thousand, "K")
    } else {
        return format_usd(value);
    };
    let tenths = (scaled * Decimal::TEN).trunc() / Decimal::TEN;
    let text = format!("{:.1}", tenths).replace('.', ",");
    format!("U$S {}{}{}", sign, text, suffix)
}

/// Parse a date typed on the command line: `YYYY-MM-DD` or `DD/MM/YYYY`
pub fn parse_cli_date(input: &str) -> Result<NaiveDate, SalesError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| {
            SalesError::ParseError(format!(
                "invalid date '{}' (expected YYYY-MM-DD or DD/MM/YYYY)",
                input
            ))
        })
}
