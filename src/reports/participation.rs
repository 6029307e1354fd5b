use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::db::SaleRecord;
use crate::filters::FilterCriteria;
use crate::margin::safe_percent;

/// Number of slices kept before the rest collapse into `Other`
pub const PARTICIPATION_TOP_N: usize = 7;
pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationGroup {
    ProductType,
    Model,
}

impl ParticipationGroup {
    /// By model when exactly one product type is selected, by type otherwise
    pub fn for_criteria(criteria: &FilterCriteria) -> Self {
        if criteria.single_product_type().is_some() {
            ParticipationGroup::Model
        } else {
            ParticipationGroup::ProductType
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipationEntry {
    pub label: String,
    pub count: usize,
    pub share_pct: Decimal,
}

/// Record counts per group, largest first, tail collapsed into `Other`.
pub fn participation_breakdown(
    records: &[SaleRecord],
    group: ParticipationGroup,
) -> Vec<ParticipationEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let label = match group {
            ParticipationGroup::ProductType => record.product_type.as_str(),
            ParticipationGroup::Model => record.model.as_str(),
        };
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut sorted: Vec<(&str, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let total = Decimal::from(records.len());
    let share = |count: usize| safe_percent(Decimal::from(count), total);

    let mut entries: Vec<ParticipationEntry> = sorted
        .iter()
        .take(PARTICIPATION_TOP_N)
        .map(|(label, count)| ParticipationEntry {
            label: label.to_string(),
            count: *count,
            share_pct: share(*count),
        })
        .collect();

    let rest: usize = sorted.iter().skip(PARTICIPATION_TOP_N).map(|(_, c)| c).sum();
    if sorted.len() > PARTICIPATION_TOP_N {
        entries.push(ParticipationEntry {
            label: OTHER_LABEL.to_string(),
            count: rest,
            share_pct: share(rest),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::{sale, typed};
    use rust_decimal_macros::dec;

    fn repeated(model: &str, n: usize) -> Vec<SaleRecord> {
        (0..n)
            .map(|_| sale(model, "S", dec!(10), dec!(9), (2025, 1, 1)))
            .collect()
    }

    #[test]
    fn tail_beyond_seven_collapses_into_other() {
        let counts = [50, 40, 30, 20, 10, 8, 6, 4, 2, 1];
        let records: Vec<SaleRecord> = counts
            .iter()
            .enumerate()
            .flat_map(|(i, n)| repeated(&format!("M{}", i), *n))
            .collect();

        let entries = participation_breakdown(&records, ParticipationGroup::Model);
        assert_eq!(entries.len(), 8);
        assert_eq!(entries[0].label, "M0");
        assert_eq!(entries[6].count, 6);
        let other = entries.last().unwrap();
        assert_eq!(other.label, OTHER_LABEL);
        assert_eq!(other.count, 7);
        let total: usize = entries.iter().map(|e| e.count).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn no_other_slice_when_few_groups() {
        let mut records = repeated("A", 2);
        records.extend(repeated("B", 2));
        let entries = participation_breakdown(&records, ParticipationGroup::Model);
        assert_eq!(entries.len(), 2);
        // tie resolved by label
        assert_eq!(entries[0].label, "A");
        assert_eq!(entries[0].share_pct, dec!(50));
    }

    #[test]
    fn grouping_follows_product_type_selection() {
        let records = vec![
            typed(sale("6110J", "S", dec!(1), dec!(1), (2025, 1, 1)), "TRACTOR"),
            typed(sale("S700", "S", dec!(1), dec!(1), (2025, 1, 1)), "COSECHADORA"),
            // stock still counts
            typed(sale("S700", "S", dec!(0), dec!(1), (2025, 1, 1)), "COSECHADORA"),
        ];

        let all = FilterCriteria::new();
        let group = ParticipationGroup::for_criteria(&all);
        assert_eq!(group, ParticipationGroup::ProductType);
        let entries = participation_breakdown(&records, group);
        assert_eq!(entries[0].label, "COSECHADORA");
        assert_eq!(entries[0].count, 2);

        let one = FilterCriteria::new().with_product_type("COSECHADORA");
        assert_eq!(ParticipationGroup::for_criteria(&one), ParticipationGroup::Model);
    }

    #[test]
    fn empty_input_has_no_slices() {
        assert!(participation_breakdown(&[], ParticipationGroup::Model).is_empty());
    }
}
