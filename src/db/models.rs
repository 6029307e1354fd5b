use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Placeholder written into text fields that arrive blank.
pub const UNSPECIFIED: &str = "No especificado";

/// Incentive programs present as columns in the sales spreadsheet
pub const BASE_INCENTIVES: [&str; 12] = [
    "RETAIL",
    "PLA POWERTOUR",
    "VOLUMEN",
    "COMBO",
    "AGROACTIVA",
    "AGRONEA",
    "EXPOAGRO",
    "CONTRA",
    "FOJD",
    "PREVENTA",
    "EXP.J.DEERE",
    "AD.PREV",
];

/// What a record represents, derived from its sale and cost amounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SaleKind {
    /// Unit held in stock / floor plan: no sale price, positive cost
    Stock,
    /// Sold under a zero-cost financed plan: sale price, no effective cost
    FinancedPlan,
    /// Regular sale with both price and cost
    Completed,
    /// Neither price nor cost
    Unpriced,
}

impl SaleKind {
    pub fn classify(gross_sale: Decimal, gross_cost: Decimal, effective_cost: Decimal) -> Self {
        if gross_sale > Decimal::ZERO {
            if effective_cost > Decimal::ZERO {
                SaleKind::Completed
            } else {
                SaleKind::FinancedPlan
            }
        } else if gross_cost > Decimal::ZERO {
            SaleKind::Stock
        } else {
            SaleKind::Unpriced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleKind::Stock => "STOCK",
            SaleKind::FinancedPlan => "FINANCED_PLAN",
            SaleKind::Completed => "COMPLETED",
            SaleKind::Unpriced => "UNPRICED",
        }
    }
}

impl fmt::Display for SaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Used machine taken as part of the payment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TradeIn {
    pub was_traded: bool,
    pub model: String,
    pub trade_in_value_usd: Decimal,
}

/// One sale, stock entry or financed-plan entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleRecord {
    pub id: Option<i64>,
    pub product_type: String,
    pub model: String,
    pub invoice_number: Option<String>,
    pub client: String,
    pub seller: String,
    pub branch: String,
    pub sale_date: NaiveDate,
    pub gross_sale_usd: Decimal,
    pub gross_cost_usd: Decimal,
    pub net_cost_usd: Option<Decimal>,
    pub exchange_rate: Decimal,
    pub total_incentives_usd: Decimal,
    /// Incentive name (upper case) -> percentage
    pub incentives: BTreeMap<String, Decimal>,
    pub trade_in: TradeIn,
    pub kind: SaleKind,
}

impl SaleRecord {
    /// Net cost when it is positive, gross cost otherwise
    pub fn effective_cost(&self) -> Decimal {
        match self.net_cost_usd {
            Some(net) if net > Decimal::ZERO => net,
            _ => self.gross_cost_usd,
        }
    }

    /// Recompute `kind` from the monetary fields.
    ///
    /// Every constructor (CSV row, manual entry, store load) calls this once.
    pub fn classify(mut self) -> Self {
        self.kind = SaleKind::classify(
            self.gross_sale_usd,
            self.gross_cost_usd,
            self.effective_cost(),
        );
        self
    }

    pub fn is_completed(&self) -> bool {
        self.kind == SaleKind::Completed
    }

    /// Grouping key for the seller: trimmed, NFC-normalized, upper case
    pub fn seller_key(&self) -> String {
        normalize_seller(&self.seller)
    }
}

/// Normalize a seller name so spelling variants land in the same bucket.
pub fn normalize_seller(name: &str) -> String {
    name.trim().nfc().collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn classify_covers_every_price_cost_combination() {
        assert_eq!(
            SaleKind::classify(dec!(100), dec!(80), dec!(70)),
            SaleKind::Completed
        );
        assert_eq!(
            SaleKind::classify(dec!(100), dec!(0), dec!(0)),
            SaleKind::FinancedPlan
        );
        assert_eq!(SaleKind::classify(dec!(0), dec!(80), dec!(80)), SaleKind::Stock);
        assert_eq!(SaleKind::classify(dec!(-5), dec!(80), dec!(80)), SaleKind::Stock);
        assert_eq!(SaleKind::classify(dec!(0), dec!(0), dec!(0)), SaleKind::Unpriced);
    }

    #[test]
    fn seller_variants_share_a_key() {
        assert_eq!(normalize_seller("Juan Pérez"), normalize_seller("JUAN PÉREZ "));
        // decomposed e + combining acute
        assert_eq!(normalize_seller("Juan Pe\u{301}rez"), "JUAN PÉREZ");
    }
}
