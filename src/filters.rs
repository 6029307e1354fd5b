//! Record filtering driven by an explicit, immutable criteria value
//!
//! Every view builds a `FilterCriteria` and hands it to `filter_records`; no
//! filter state lives inside the aggregation functions.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::db::models::normalize_seller;
use crate::db::SaleRecord;
use crate::error::SalesError;
use crate::fiscal::fiscal_year;

/// Fiscal-year restriction: a single year or no restriction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FiscalYearFilter {
    #[default]
    All,
    Year(i32),
}

impl FromStr for FiscalYearFilter {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("todos")
        {
            return Ok(FiscalYearFilter::All);
        }
        let digits = trimmed
            .strip_prefix("FY")
            .or_else(|| trimmed.strip_prefix("fy"))
            .unwrap_or(trimmed);
        digits
            .parse::<i32>()
            .map(FiscalYearFilter::Year)
            .map_err(|_| SalesError::ParseError(format!("invalid fiscal year: '{}'", s)))
    }
}

impl fmt::Display for FiscalYearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FiscalYearFilter::All => f.write_str("all"),
            FiscalYearFilter::Year(y) => write!(f, "FY{}", y),
        }
    }
}

/// Active filters of a view. Empty / `None` fields impose no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub product_types: BTreeSet<String>,
    pub seller_substring: Option<String>,
    /// Exact seller key, compared after `normalize_seller`
    pub seller: Option<String>,
    /// Inclusive, from the start of this day
    pub date_from: Option<NaiveDate>,
    /// Inclusive, through the end of this day
    pub date_to: Option<NaiveDate>,
    pub fiscal_year: FiscalYearFilter,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_types.insert(product_type.into());
        self
    }

    pub fn with_seller_substring(mut self, needle: impl Into<String>) -> Self {
        self.seller_substring = Some(needle.into());
        self
    }

    pub fn with_seller(mut self, seller: impl AsRef<str>) -> Self {
        self.seller = Some(normalize_seller(seller.as_ref()));
        self
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn with_fiscal_year(mut self, fiscal_year: FiscalYearFilter) -> Self {
        self.fiscal_year = fiscal_year;
        self
    }

    /// The selected product type when exactly one is active
    pub fn single_product_type(&self) -> Option<&str> {
        if self.product_types.len() == 1 {
            self.product_types.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn matches(&self, record: &SaleRecord) -> bool {
        let type_ok =
            self.product_types.is_empty() || self.product_types.contains(&record.product_type);

        let substring_ok = match self.seller_substring.as_deref() {
            Some(needle) if !needle.is_empty() => record
                .seller
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        };

        let seller_ok = match self.seller.as_deref() {
            Some(key) if !key.is_empty() => record.seller_key() == key,
            _ => true,
        };

        let from_ok = self.date_from.map_or(true, |from| record.sale_date >= from);
        let to_ok = self.date_to.map_or(true, |to| record.sale_date <= to);

        let fy_ok = match self.fiscal_year {
            FiscalYearFilter::All => true,
            FiscalYearFilter::Year(fy) => fiscal_year(record.sale_date) == fy,
        };

        type_ok && substring_ok && seller_ok && from_ok && to_ok && fy_ok
    }
}

pub fn filter_records(records: &[SaleRecord], criteria: &FilterCriteria) -> Vec<SaleRecord> {
    records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect()
}
