// Reports module - aggregations over a filtered sales collection

pub mod export;
pub mod kpi;
pub mod models;
pub mod participation;
pub mod sellers;

pub use export::{export_sales, ExportFormat, ExportRow};
pub use kpi::{
    client_options, filter_options, fiscal_year_options, kpi_summary, product_type_options,
    recent_sales, seller_options, FilterOptions, KpiSummary,
};
pub use models::{profitability_by_model, sort_models, ModelProfitability, ModelSortKey};
pub use participation::{
    participation_breakdown, ParticipationEntry, ParticipationGroup, OTHER_LABEL,
    PARTICIPATION_TOP_N,
};
pub use sellers::{seller_ranking, seller_summary, sort_sellers, SellerPerformance, SellerSortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;

    use crate::db::{SaleKind, SaleRecord, TradeIn};

    pub fn sale(
        model: &str,
        seller: &str,
        gross_sale: Decimal,
        gross_cost: Decimal,
        date: (i32, u32, u32),
    ) -> SaleRecord {
        SaleRecord {
            id: None,
            product_type: "TRACTOR".to_string(),
            model: model.to_string(),
            invoice_number: None,
            client: "Cliente".to_string(),
            seller: seller.to_string(),
            branch: "Central".to_string(),
            sale_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            gross_sale_usd: gross_sale,
            gross_cost_usd: gross_cost,
            net_cost_usd: None,
            exchange_rate: Decimal::ZERO,
            total_incentives_usd: Decimal::ZERO,
            incentives: BTreeMap::new(),
            trade_in: TradeIn::default(),
            kind: SaleKind::Unpriced,
        }
        .classify()
    }

    pub fn typed(mut record: SaleRecord, product_type: &str) -> SaleRecord {
        record.product_type = product_type.to_string();
        record
    }
}
