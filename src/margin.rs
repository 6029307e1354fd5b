//! Per-record margin calculation and margin classification
//!
//! Margin is always computed on the effective (net) cost. Incentive
//! percentages are folded into `net_cost_usd` when a record is ingested and are
//! never applied again here.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::SaleRecord;

/// Lower bound (inclusive) of the green band
pub const HEALTHY_MARGIN_PCT: Decimal = Decimal::TEN;
/// Lower bound (inclusive) of the yellow band
pub const MARGINAL_MARGIN_PCT: Decimal = Decimal::from_parts(6, 0, 0, false, 0);

/// `numerator / denominator`, or zero when the ratio is undefined.
pub fn safe_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// `numerator / denominator * 100`, or zero when the ratio is undefined.
pub fn safe_percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    safe_ratio(numerator, denominator)
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}

/// Gross margin percentage of a single record.
///
/// Zero when there is no sale price or no effective cost; callers tell a real
/// zero margin apart from "not applicable" through `SaleRecord::kind`.
pub fn margin_percent(record: &SaleRecord) -> Decimal {
    let sale = record.gross_sale_usd;
    let cost = record.effective_cost();
    if sale <= Decimal::ZERO || cost <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    safe_percent(sale - cost, sale)
}

/// Gross margin in USD, zero for anything but a completed sale
pub fn margin_amount(record: &SaleRecord) -> Decimal {
    if !record.is_completed() {
        return Decimal::ZERO;
    }
    record.gross_sale_usd - record.effective_cost()
}

/// Three-way margin classification used by every report surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginBand {
    Green,
    Yellow,
    Red,
}

impl MarginBand {
    pub fn classify(percent: Decimal) -> Self {
        if percent >= HEALTHY_MARGIN_PCT {
            MarginBand::Green
        } else if percent >= MARGINAL_MARGIN_PCT {
            MarginBand::Yellow
        } else {
            MarginBand::Red
        }
    }

    pub fn hex_color(&self) -> &'static str {
        match self {
            MarginBand::Green => "#43A047",
            MarginBand::Yellow => "#FDD835",
            MarginBand::Red => "#E53935",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarginBand::Green => "green",
            MarginBand::Yellow => "yellow",
            MarginBand::Red => "red",
        }
    }
}
