use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::SortDirection;
use crate::db::SaleRecord;
use crate::error::SalesError;
use crate::margin::{margin_amount, safe_percent};

/// Profitability of one model over completed sales
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelProfitability {
    pub model: String,
    pub units: usize,
    pub total_revenue: Decimal,
    pub total_margin: Decimal,
    /// Revenue weighted
    pub average_margin_pct: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSortKey {
    Model,
    Units,
    Revenue,
    Margin,
    AverageMargin,
}

impl FromStr for ModelSortKey {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "model" => Ok(ModelSortKey::Model),
            "units" => Ok(ModelSortKey::Units),
            "revenue" => Ok(ModelSortKey::Revenue),
            "margin" => Ok(ModelSortKey::Margin),
            "average_margin" | "avg_margin" => Ok(ModelSortKey::AverageMargin),
            _ => Err(SalesError::ParseError(format!(
                "invalid model sort key: '{}' (model, units, revenue, margin, average-margin)",
                s
            ))),
        }
    }
}

/// Group completed sales by model; sorted by total margin, highest first.
pub fn profitability_by_model(records: &[SaleRecord]) -> Vec<ModelProfitability> {
    let mut buckets: BTreeMap<&str, (usize, Decimal, Decimal)> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_completed()) {
        let bucket = buckets
            .entry(record.model.as_str())
            .or_insert((0, Decimal::ZERO, Decimal::ZERO));
        bucket.0 += 1;
        bucket.1 += record.gross_sale_usd;
        bucket.2 += margin_amount(record);
    }

    let mut rows: Vec<ModelProfitability> = buckets
        .into_iter()
        .map(|(model, (units, revenue, margin))| ModelProfitability {
            model: model.to_string(),
            units,
            total_revenue: revenue,
            total_margin: margin,
            average_margin_pct: safe_percent(margin, revenue),
        })
        .collect();

    sort_models(&mut rows, ModelSortKey::Margin, SortDirection::Desc);
    rows
}

pub fn sort_models(rows: &mut [ModelProfitability], key: ModelSortKey, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = match key {
            ModelSortKey::Model => a.model.cmp(&b.model),
            ModelSortKey::Units => a.units.cmp(&b.units),
            ModelSortKey::Revenue => a.total_revenue.cmp(&b.total_revenue),
            ModelSortKey::Margin => a.total_margin.cmp(&b.total_margin),
            ModelSortKey::AverageMargin => a.average_margin_pct.cmp(&b.average_margin_pct),
        };
        // ties stay in model order whatever the direction
        direction.apply(ordering).then_with(|| match key {
            ModelSortKey::Model => Ordering::Equal,
            _ => a.model.cmp(&b.model),
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::sale;
    use rust_decimal_macros::dec;

    fn sample() -> Vec<SaleRecord> {
        vec![
            sale("6110J", "A", dec!(100000), dec!(90000), (2025, 1, 1)),
            sale("6110J", "B", dec!(1000), dec!(500), (2025, 1, 2)),
            sale("S700", "A", dec!(300000), dec!(285000), (2025, 1, 3)),
            // stock and financed plan never count
            sale("S700", "A", dec!(0), dec!(280000), (2025, 1, 4)),
            sale("R4030", "A", dec!(50000), dec!(0), (2025, 1, 5)),
        ]
    }

    #[test]
    fn groups_completed_sales_by_model() {
        let rows = profitability_by_model(&sample());
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].model, "S700");
        assert_eq!(rows[0].units, 1);
        assert_eq!(rows[0].total_margin, dec!(15000));

        let tractor = &rows[1];
        assert_eq!(tractor.model, "6110J");
        assert_eq!(tractor.units, 2);
        assert_eq!(tractor.total_revenue, dec!(101000));
        assert_eq!(tractor.total_margin, dec!(10500));
        assert_eq!(tractor.average_margin_pct.round_dp(2), dec!(10.40));
    }

    #[test]
    fn resorts_by_any_field() {
        let mut rows = profitability_by_model(&sample());

        sort_models(&mut rows, ModelSortKey::AverageMargin, SortDirection::Desc);
        assert_eq!(rows[0].model, "6110J");

        sort_models(&mut rows, ModelSortKey::Model, SortDirection::Asc);
        assert_eq!(rows[0].model, "6110J");
        sort_models(&mut rows, ModelSortKey::Model, SortDirection::Desc);
        assert_eq!(rows[0].model, "S700");

        sort_models(&mut rows, ModelSortKey::Units, SortDirection::Asc);
        assert_eq!(rows[0].units, 1);
    }

    #[test]
    fn sort_key_parses_cli_spelling() {
        assert_eq!(
            "average-margin".parse::<ModelSortKey>().unwrap(),
            ModelSortKey::AverageMargin
        );
        assert!("price".parse::<ModelSortKey>().is_err());
    }
}
