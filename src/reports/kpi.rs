//! Dashboard KPIs and the supporting lists shown next to them

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::db::{SaleKind, SaleRecord};
use crate::fiscal::fiscal_year;
use crate::margin::{margin_amount, safe_percent};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KpiSummary {
    /// Completed sales only
    pub total_revenue: Decimal,
    pub total_margin: Decimal,
    /// Revenue weighted: total margin / total revenue * 100
    pub average_margin_pct: Decimal,
    pub completed_sales: usize,
    /// Models with at least one record carrying a sale price
    pub distinct_models: usize,
    pub stock_units: usize,
    /// Sum of gross cost over stock records
    pub stock_value: Decimal,
    pub financed_plan_sales: usize,
    pub financed_plan_revenue: Decimal,
}

pub fn kpi_summary(records: &[SaleRecord]) -> KpiSummary {
    let mut summary = KpiSummary::default();
    let mut models = BTreeSet::new();

    for record in records {
        if record.gross_sale_usd > Decimal::ZERO {
            models.insert(record.model.as_str());
        }
        match record.kind {
            SaleKind::Completed => {
                summary.completed_sales += 1;
                summary.total_revenue += record.gross_sale_usd;
                summary.total_margin += margin_amount(record);
            }
            SaleKind::FinancedPlan => {
                summary.financed_plan_sales += 1;
                summary.financed_plan_revenue += record.gross_sale_usd;
            }
            SaleKind::Stock => {
                summary.stock_units += 1;
                summary.stock_value += record.gross_cost_usd;
            }
            SaleKind::Unpriced => {}
        }
    }

    summary.distinct_models = models.len();
    summary.average_margin_pct = safe_percent(summary.total_margin, summary.total_revenue);
    summary
}

/// Latest `n` records by sale date
pub fn recent_sales(records: &[SaleRecord], n: usize) -> Vec<SaleRecord> {
    let mut sorted: Vec<&SaleRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.sale_date.cmp(&a.sale_date));
    sorted.into_iter().take(n).cloned().collect()
}

pub fn product_type_options(records: &[SaleRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.product_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Normalized seller keys
pub fn seller_options(records: &[SaleRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.seller_key())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn client_options(records: &[SaleRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.client.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fiscal years present, newest first
pub fn fiscal_year_options(records: &[SaleRecord]) -> Vec<i32> {
    records
        .iter()
        .map(|r| fiscal_year(r.sale_date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .rev()
        .collect()
}

/// Values offered by the filter selectors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub product_types: Vec<String>,
    pub sellers: Vec<String>,
    pub clients: Vec<String>,
    pub fiscal_years: Vec<i32>,
}

/// Option lists over the whole store, so a narrowed view still offers every choice
pub fn filter_options(records: &[SaleRecord]) -> FilterOptions {
    FilterOptions {
        product_types: product_type_options(records),
        sellers: seller_options(records),
        clients: client_options(records),
        fiscal_years: fiscal_year_options(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::sale;
    use rust_decimal_macros::dec;

    #[test]
    fn revenue_counts_completed_sales_only() {
        let records = vec![
            sale("6110J", "A", dec!(100000), dec!(90000), (2025, 1, 10)),
            // financed plan
            sale("6110J", "A", dec!(50000), dec!(0), (2025, 1, 11)),
            // stock
            sale("S700", "B", dec!(0), dec!(300000), (2025, 1, 12)),
            // blank
            sale("X", "B", dec!(0), dec!(0), (2025, 1, 13)),
        ];
        let kpi = kpi_summary(&records);
        assert_eq!(kpi.total_revenue, dec!(100000));
        assert_eq!(kpi.total_margin, dec!(10000));
        assert_eq!(kpi.average_margin_pct, dec!(10));
        assert_eq!(kpi.completed_sales, 1);
        assert_eq!(kpi.financed_plan_sales, 1);
        assert_eq!(kpi.financed_plan_revenue, dec!(50000));
        assert_eq!(kpi.stock_units, 1);
        assert_eq!(kpi.stock_value, dec!(300000));
        assert_eq!(kpi.distinct_models, 1);
    }

    #[test]
    fn average_margin_is_revenue_weighted() {
        let records = vec![
            // 10% on 100000
            sale("A", "X", dec!(100000), dec!(90000), (2025, 2, 1)),
            // 50% on 1000
            sale("B", "X", dec!(1000), dec!(500), (2025, 2, 2)),
        ];
        let kpi = kpi_summary(&records);
        // (10000 + 500) / 101000 * 100, not (10 + 50) / 2
        assert_eq!(kpi.average_margin_pct.round_dp(4), dec!(10.3960));
    }

    #[test]
    fn empty_collection_yields_zeroes() {
        assert_eq!(kpi_summary(&[]), KpiSummary::default());
    }

    #[test]
    fn recent_sales_are_newest_first() {
        let records = vec![
            sale("A", "X", dec!(1), dec!(1), (2024, 5, 1)),
            sale("B", "X", dec!(1), dec!(1), (2025, 5, 1)),
            sale("C", "X", dec!(1), dec!(1), (2024, 12, 1)),
        ];
        let recent: Vec<String> = recent_sales(&records, 2).into_iter().map(|r| r.model).collect();
        assert_eq!(recent, vec!["B", "C"]);
    }

    #[test]
    fn option_lists_are_sorted_and_distinct() {
        let records = vec![
            sale("A", "Juan Pérez", dec!(1), dec!(1), (2024, 10, 1)),
            sale("B", "JUAN PÉREZ ", dec!(1), dec!(1), (2024, 11, 1)),
            sale("C", "Ana", dec!(1), dec!(1), (2025, 11, 1)),
        ];
        assert_eq!(seller_options(&records), vec!["ANA", "JUAN PÉREZ"]);
        assert_eq!(fiscal_year_options(&records), vec![2026, 2025, 2024]);
        assert_eq!(product_type_options(&records), vec!["TRACTOR"]);
    }

    #[test]
    fn client_options_trim_and_skip_blanks() {
        let mut records = vec![
            sale("A", "X", dec!(1), dec!(1), (2025, 1, 1)),
            sale("B", "X", dec!(1), dec!(1), (2025, 1, 2)),
            sale("C", "X", dec!(1), dec!(1), (2025, 1, 3)),
            sale("D", "X", dec!(1), dec!(1), (2025, 1, 4)),
        ];
        records[0].client = "Campo Verde ".to_string();
        records[1].client = " Agro Sur".to_string();
        records[2].client = "Campo Verde".to_string();
        records[3].client = "  ".to_string();

        assert_eq!(client_options(&records), vec!["Agro Sur", "Campo Verde"]);
    }

    #[test]
    fn filter_options_gather_every_list() {
        let mut records = vec![
            sale("A", "ana", dec!(1), dec!(1), (2024, 11, 1)),
            sale("B", "Luis", dec!(1), dec!(1), (2025, 10, 31)),
        ];
        records[1].product_type = "COSECHADORA".to_string();

        let options = filter_options(&records);
        assert_eq!(options.product_types, vec!["COSECHADORA", "TRACTOR"]);
        assert_eq!(options.sellers, vec!["ANA", "LUIS"]);
        assert_eq!(options.clients, vec!["Cliente"]);
        assert_eq!(options.fiscal_years, vec![2025]);
    }
}
