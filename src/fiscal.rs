//! Fiscal calendar: November-to-October fiscal years and calendar quarters
//!
//! Fiscal year N runs from 1 November of N-1 through 31 October of N.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::db::SaleRecord;
use crate::error::SalesError;
use crate::margin::{margin_percent, safe_ratio};

/// First calendar month (1-based) of a fiscal year
pub const FISCAL_YEAR_START_MONTH: u32 = 11;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() >= FISCAL_YEAR_START_MONTH {
        date.year() + 1
    } else {
        date.year()
    }
}

/// Two-digit year suffix used in chart labels ("'24")
fn short_year(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

/// One calendar month of a fiscal year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiscalMonth {
    pub year: i32,
    pub month: u32,
    pub label: String,
}

/// The 12 months of `fiscal_year`, November of the previous year first.
pub fn fiscal_year_months(fiscal_year: i32) -> Vec<FiscalMonth> {
    (0..12u32)
        .map(|offset| {
            // offset 0 -> November, 1 -> December, 2 -> January ...
            let zero_based = FISCAL_YEAR_START_MONTH - 1 + offset;
            let year = fiscal_year - 1 + (zero_based / 12) as i32;
            let month = zero_based % 12 + 1;
            FiscalMonth {
                year,
                month,
                label: format!("{} '{}", MONTH_NAMES[(month - 1) as usize], short_year(year)),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

/// Record counts per month of a fiscal year; months without sales stay at zero.
pub fn monthly_sales(records: &[SaleRecord], fiscal_year: i32) -> Vec<MonthlyCount> {
    let mut buckets: Vec<MonthlyCount> = fiscal_year_months(fiscal_year)
        .into_iter()
        .map(|m| MonthlyCount {
            label: m.label,
            year: m.year,
            month: m.month,
            count: 0,
        })
        .collect();

    for record in records {
        let (year, month) = (record.sale_date.year(), record.sale_date.month());
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.year == year && b.month == month)
        {
            bucket.count += 1;
        }
    }
    buckets
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiscalYearCount {
    pub fiscal_year: i32,
    pub label: String,
    pub count: usize,
}

/// Record counts per fiscal year, oldest first
pub fn sales_by_fiscal_year(records: &[SaleRecord]) -> Vec<FiscalYearCount> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(fiscal_year(record.sale_date)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(fy, count)| FiscalYearCount {
            fiscal_year: fy,
            label: format!("FY{}", fy),
            count,
        })
        .collect()
}

/// Calendar quarter label such as `Q1 '25`.
///
/// Ordering is numeric on the two-digit year, then on the quarter digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QuarterLabel {
    pub quarter: u8,
    /// Two-digit year (0..=99)
    pub year: u8,
}

impl QuarterLabel {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            quarter: ((date.month() - 1) / 3 + 1) as u8,
            year: date.year().rem_euclid(100) as u8,
        }
    }
}

impl Ord for QuarterLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then(self.quarter.cmp(&other.quarter))
    }
}

impl PartialOrd for QuarterLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QuarterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} '{:02}", self.quarter, self.year)
    }
}

impl FromStr for QuarterLabel {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SalesError::ParseError(format!("invalid quarter label: '{}'", s));
        let s = s.trim();
        let (quarter_part, year_part) = s.split_once('\'').ok_or_else(invalid)?;
        let quarter: u8 = quarter_part
            .trim()
            .strip_prefix('Q')
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())?;
        let year: u8 = year_part.trim().parse().map_err(|_| invalid())?;
        if !(1..=4).contains(&quarter) || year > 99 {
            return Err(invalid());
        }
        Ok(Self { quarter, year })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterMargin {
    /// Full calendar year
    pub year: i32,
    pub quarter: QuarterLabel,
    pub label: String,
    pub sales: usize,
    pub average_margin_pct: Decimal,
}

/// Mean per-operation margin for each calendar quarter over completed sales.
///
/// Buckets are keyed by the full year, so quarters a century apart stay split.
pub fn margin_trend(records: &[SaleRecord]) -> Vec<QuarterMargin> {
    let mut by_quarter: BTreeMap<(i32, u8), (usize, Decimal)> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_completed()) {
        let label = QuarterLabel::from_date(record.sale_date);
        let entry = by_quarter
            .entry((record.sale_date.year(), label.quarter))
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += margin_percent(record);
    }

    by_quarter
        .into_iter()
        .map(|((year, quarter), (sales, sum))| {
            let label = QuarterLabel {
                quarter,
                year: year.rem_euclid(100) as u8,
            };
            QuarterMargin {
                year,
                quarter: label,
                label: label.to_string(),
                sales,
                average_margin_pct: safe_ratio(sum, Decimal::from(sales)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fiscal_year_boundary_is_november_first() {
        assert_eq!(fiscal_year(date(2024, 10, 31)), 2024);
        assert_eq!(fiscal_year(date(2024, 11, 1)), 2025);
        assert_eq!(fiscal_year(date(2024, 12, 31)), 2025);
        assert_eq!(fiscal_year(date(2025, 1, 1)), 2025);
    }

    #[test]
    fn fiscal_year_months_start_in_november() {
        let months = fiscal_year_months(2025);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].label, "Nov '24");
        assert_eq!(months[1].label, "Dec '24");
        assert_eq!(months[2].label, "Jan '25");
        assert_eq!(months[11].label, "Oct '25");
        assert_eq!((months[11].year, months[11].month), (2025, 10));
    }

    #[test]
    fn quarter_labels_order_numerically_not_lexically() {
        let mut labels: Vec<QuarterLabel> = ["Q1 '25", "Q4 '24", "Q2 '24", "Q3 '09"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        labels.sort();
        let shown: Vec<String> = labels.iter().map(|q| q.to_string()).collect();
        assert_eq!(shown, vec!["Q3 '09", "Q2 '24", "Q4 '24", "Q1 '25"]);
    }

    #[test]
    fn quarter_label_round_trips_through_display() {
        let q = QuarterLabel::from_date(date(2025, 8, 15));
        assert_eq!(q.to_string(), "Q3 '25");
        assert_eq!("Q3 '25".parse::<QuarterLabel>().unwrap(), q);
        assert!("Q5 '25".parse::<QuarterLabel>().is_err());
        assert!("3 '25".parse::<QuarterLabel>().is_err());
    }

    #[test]
    fn margin_trend_keeps_centuries_apart() {
        use crate::db::{SaleKind, TradeIn};
        use rust_decimal_macros::dec;

        let sale = |d: NaiveDate, cost: Decimal| {
            SaleRecord {
                id: None,
                product_type: "TRACTOR".to_string(),
                model: "6110J".to_string(),
                invoice_number: None,
                client: "Cliente".to_string(),
                seller: "Ana".to_string(),
                branch: "Central".to_string(),
                sale_date: d,
                gross_sale_usd: dec!(100),
                gross_cost_usd: cost,
                net_cost_usd: None,
                exchange_rate: Decimal::ZERO,
                total_incentives_usd: Decimal::ZERO,
                incentives: Default::default(),
                trade_in: TradeIn::default(),
                kind: SaleKind::Unpriced,
            }
            .classify()
        };
        let records = vec![
            sale(date(2025, 2, 1), dec!(80)),
            sale(date(1925, 2, 1), dec!(90)),
        ];

        let trend = margin_trend(&records);
        assert_eq!(trend.len(), 2);
        assert_eq!((trend[0].year, trend[0].label.as_str()), (1925, "Q1 '25"));
        assert_eq!(trend[0].average_margin_pct, dec!(10));
        assert_eq!((trend[1].year, trend[1].label.as_str()), (2025, "Q1 '25"));
        assert_eq!(trend[1].average_margin_pct, dec!(20));
        assert_eq!(trend[1].sales, 1);
    }

    #[test]
    fn october_is_fourth_calendar_quarter() {
        assert_eq!(QuarterLabel::from_date(date(2024, 10, 2)).quarter, 4);
        assert_eq!(QuarterLabel::from_date(date(2024, 3, 31)).quarter, 1);
    }
}
