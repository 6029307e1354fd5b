//! Manual entry of a single operation
//!
//! Incentives are applied here, once: the entered percentages reduce the gross
//! cost to the net cost that every margin calculation later reads.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::db::models::{normalize_seller, SaleKind, SaleRecord, TradeIn, BASE_INCENTIVES, UNSPECIFIED};
use crate::error::SalesError;

/// Known incentive program names. Open-ended: new names can be registered.
#[derive(Debug, Clone)]
pub struct IncentiveRegistry {
    names: BTreeSet<String>,
}

impl Default for IncentiveRegistry {
    fn default() -> Self {
        Self {
            names: BASE_INCENTIVES.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl IncentiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.register(name.as_ref());
        }
        self
    }

    /// Register a name; returns the normalized name when it was not known yet.
    pub fn register(&mut self, name: &str) -> Option<String> {
        let normalized = normalize_incentive_name(name);
        if normalized.is_empty() || self.names.contains(&normalized) {
            return None;
        }
        self.names.insert(normalized.clone());
        Some(normalized)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize_incentive_name(name))
    }

    /// Sorted names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

pub fn normalize_incentive_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Raw form input for one operation
#[derive(Debug, Clone, Default)]
pub struct ManualEntry {
    pub product_type: String,
    pub model: String,
    pub gross_cost_usd: Option<Decimal>,
    pub gross_sale_usd: Option<Decimal>,
    pub sale_date: Option<NaiveDate>,
    pub client: String,
    pub seller: String,
    pub branch: String,
    pub invoice_number: Option<String>,
    /// Incentive name -> percentage of gross cost
    pub incentives: BTreeMap<String, Decimal>,
    /// Used machine model and its trade-in value
    pub trade_in: Option<(String, Decimal)>,
}

/// Ingestion-time incentive adjustment: `(total incentives, net cost)`
pub fn apply_incentives(gross_cost: Decimal, percentages: &BTreeMap<String, Decimal>) -> (Decimal, Decimal) {
    let total_pct: Decimal = percentages.values().copied().sum();
    let total_incentives = gross_cost * total_pct / Decimal::ONE_HUNDRED;
    (total_incentives, gross_cost - total_incentives)
}

impl ManualEntry {
    /// Names of the required fields left blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.product_type.trim().is_empty() {
            missing.push("product type");
        }
        if self.model.trim().is_empty() {
            missing.push("model");
        }
        if self.gross_cost_usd.is_none() {
            missing.push("cost");
        }
        if self.gross_sale_usd.is_none() {
            missing.push("sale");
        }
        if self.sale_date.is_none() {
            missing.push("sale date");
        }
        if self.seller.trim().is_empty() {
            missing.push("seller");
        }
        missing
    }

    /// Validate the form and build the record to store.
    ///
    /// Incentive names not yet in `registry` are registered on the way.
    pub fn into_record(self, registry: &mut IncentiveRegistry) -> Result<SaleRecord> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(SalesError::ValidationError(format!(
                "please complete all main fields (missing: {})",
                missing.join(", ")
            ))
            .into());
        }
        let (Some(gross_cost), Some(gross_sale), Some(sale_date)) =
            (self.gross_cost_usd, self.gross_sale_usd, self.sale_date)
        else {
            return Err(SalesError::ValidationError("missing amounts or date".to_string()).into());
        };

        if let Some((name, pct)) = self.incentives.iter().find(|(_, pct)| **pct < Decimal::ZERO) {
            return Err(SalesError::ValidationError(format!(
                "incentive {} has a negative percentage ({})",
                name, pct
            ))
            .into());
        }

        // spellings that normalize to the same name add up
        let mut incentives: BTreeMap<String, Decimal> = BTreeMap::new();
        for (name, pct) in self.incentives {
            let name = normalize_incentive_name(&name);
            if !name.is_empty() {
                *incentives.entry(name).or_insert(Decimal::ZERO) += pct;
            }
        }
        for name in incentives.keys() {
            if let Some(added) = registry.register(name) {
                info!("Registered new incentive program {}", added);
            }
        }

        let (total_incentives, net_cost) = apply_incentives(gross_cost, &incentives);

        let trade_in = match self.trade_in {
            Some((model, value)) => TradeIn {
                was_traded: true,
                model: model.trim().to_uppercase(),
                trade_in_value_usd: value,
            },
            None => TradeIn::default(),
        };

        let or_unspecified = |value: String| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                UNSPECIFIED.to_string()
            } else {
                trimmed.to_string()
            }
        };

        let record = SaleRecord {
            id: None,
            product_type: self.product_type.trim().to_uppercase(),
            model: self.model.trim().to_uppercase(),
            invoice_number: self
                .invoice_number
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            client: or_unspecified(self.client),
            seller: normalize_seller(&self.seller),
            branch: or_unspecified(self.branch),
            sale_date,
            gross_sale_usd: gross_sale,
            gross_cost_usd: gross_cost,
            net_cost_usd: Some(net_cost),
            exchange_rate: Decimal::ZERO,
            total_incentives_usd: total_incentives,
            incentives,
            trade_in,
            kind: SaleKind::Unpriced,
        };
        Ok(record.classify())
    }
}
