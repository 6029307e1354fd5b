use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::kpi::{kpi_summary, KpiSummary};
use super::SortDirection;
use crate::db::models::normalize_seller;
use crate::db::SaleRecord;
use crate::error::SalesError;
use crate::margin::{margin_amount, safe_percent, safe_ratio};

/// One row of the seller ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerPerformance {
    /// Normalized seller key
    pub seller: String,
    pub operations: usize,
    pub total_revenue: Decimal,
    pub total_margin: Decimal,
    pub average_ticket: Decimal,
    pub average_margin_pct: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellerSortKey {
    Seller,
    Operations,
    Revenue,
    Margin,
    AverageTicket,
    AverageMargin,
}

impl FromStr for SellerSortKey {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "seller" => Ok(SellerSortKey::Seller),
            "operations" | "ops" => Ok(SellerSortKey::Operations),
            "revenue" => Ok(SellerSortKey::Revenue),
            "margin" => Ok(SellerSortKey::Margin),
            "average_ticket" | "ticket" => Ok(SellerSortKey::AverageTicket),
            "average_margin" | "avg_margin" => Ok(SellerSortKey::AverageMargin),
            _ => Err(SalesError::ParseError(format!(
                "invalid seller sort key: '{}' (seller, operations, revenue, margin, average-ticket, average-margin)",
                s
            ))),
        }
    }
}

/// Rank sellers over completed sales; highest revenue first.
pub fn seller_ranking(records: &[SaleRecord]) -> Vec<SellerPerformance> {
    let mut buckets: BTreeMap<String, (usize, Decimal, Decimal)> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_completed()) {
        let key = record.seller_key();
        if key.is_empty() {
            continue;
        }
        let bucket = buckets
            .entry(key)
            .or_insert((0, Decimal::ZERO, Decimal::ZERO));
        bucket.0 += 1;
        bucket.1 += record.gross_sale_usd;
        bucket.2 += margin_amount(record);
    }

    let mut rows: Vec<SellerPerformance> = buckets
        .into_iter()
        .map(|(seller, (operations, revenue, margin))| SellerPerformance {
            seller,
            operations,
            total_revenue: revenue,
            total_margin: margin,
            average_ticket: safe_ratio(revenue, Decimal::from(operations)),
            average_margin_pct: safe_percent(margin, revenue),
        })
        .collect();

    sort_sellers(&mut rows, SellerSortKey::Revenue, SortDirection::Desc);
    rows
}

pub fn sort_sellers(rows: &mut [SellerPerformance], key: SellerSortKey, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = match key {
            SellerSortKey::Seller => a.seller.cmp(&b.seller),
            SellerSortKey::Operations => a.operations.cmp(&b.operations),
            SellerSortKey::Revenue => a.total_revenue.cmp(&b.total_revenue),
            SellerSortKey::Margin => a.total_margin.cmp(&b.total_margin),
            SellerSortKey::AverageTicket => a.average_ticket.cmp(&b.average_ticket),
            SellerSortKey::AverageMargin => a.average_margin_pct.cmp(&b.average_margin_pct),
        };
        direction.apply(ordering).then_with(|| match key {
            SellerSortKey::Seller => Ordering::Equal,
            _ => a.seller.cmp(&b.seller),
        })
    });
}

/// KPIs for a single seller (detail view)
pub fn seller_summary(records: &[SaleRecord], seller: &str) -> KpiSummary {
    let key = normalize_seller(seller);
    let own: Vec<SaleRecord> = records
        .iter()
        .filter(|r| r.seller_key() == key)
        .cloned()
        .collect();
    kpi_summary(&own)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::sale;
    use rust_decimal_macros::dec;

    fn sample() -> Vec<SaleRecord> {
        vec![
            sale("A", "Juan Pérez", dec!(100000), dec!(90000), (2025, 1, 1)),
            sale("B", "JUAN PÉREZ ", dec!(20000), dec!(19000), (2025, 1, 2)),
            sale("C", "ana gómez", dec!(110000), dec!(100000), (2025, 1, 3)),
            sale("D", "ana gómez", dec!(0), dec!(50000), (2025, 1, 4)),
        ]
    }

    #[test]
    fn spelling_variants_merge_into_one_seller() {
        let ranking = seller_ranking(&sample());
        assert_eq!(ranking.len(), 2);

        let juan = ranking.iter().find(|r| r.seller == "JUAN PÉREZ").unwrap();
        assert_eq!(juan.operations, 2);
        assert_eq!(juan.total_revenue, dec!(120000));
        assert_eq!(juan.total_margin, dec!(11000));
        assert_eq!(juan.average_ticket, dec!(60000));
    }

    #[test]
    fn default_order_is_revenue_desc() {
        let ranking = seller_ranking(&sample());
        assert_eq!(ranking[0].seller, "JUAN PÉREZ");
        assert_eq!(ranking[1].seller, "ANA GÓMEZ");
    }

    #[test]
    fn resorts_by_margin_percentage() {
        let mut ranking = seller_ranking(&sample());
        sort_sellers(&mut ranking, SellerSortKey::AverageMargin, SortDirection::Desc);
        // 10000/110000 = 9.09% vs 11000/120000 = 9.17%
        assert_eq!(ranking[0].seller, "JUAN PÉREZ");
        sort_sellers(&mut ranking, SellerSortKey::Seller, SortDirection::Asc);
        assert_eq!(ranking[0].seller, "ANA GÓMEZ");
    }

    #[test]
    fn summary_for_one_seller_includes_their_stock() {
        let summary = seller_summary(&sample(), "Ana Gómez");
        assert_eq!(summary.completed_sales, 1);
        assert_eq!(summary.total_revenue, dec!(110000));
        assert_eq!(summary.stock_units, 1);
    }
}
