use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::db::models::{SaleKind, SaleRecord, TradeIn, BASE_INCENTIVES, UNSPECIFIED};
use crate::error::SalesError;

pub const COL_PRODUCT_TYPE: &str = "MAQUINARIA";
pub const COL_DATE: &str = "FECHA";
pub const COL_MODEL: &str = "MODELO";
pub const COL_INVOICE: &str = "FACTURA";
pub const COL_CLIENT: &str = "CLIENTE";
pub const COL_SELLER: &str = "VENDEDOR";
pub const COL_BRANCH: &str = "SUCURSAL";
pub const COL_GROSS_COST: &str = " COSTO U$S";
pub const COL_NET_COST: &str = " COSTO NETO U$D";
pub const COL_GROSS_SALE: &str = " VENTA U$S";
pub const COL_EXCHANGE_RATE: &str = "T.C.";
pub const COL_TOTAL_INCENTIVES: &str = "TOTAL INCENTIVOS";
pub const COL_TRADE_IN_FLAG: &str = "ENT.USADO";
pub const COL_TRADE_IN_MODEL: &str = "MODELO2";
pub const COL_TRADE_IN_VALUE: &str = "PCIO TOMA";

/// Currency markers stripped before parsing, longest first
const CURRENCY_MARKERS: [&str; 7] = ["U$S", "U$D", "US$", "USS", "USD", "$", "\""];

/// Outcome of reading a sales CSV
#[derive(Debug, Default)]
pub struct ParsedFile {
    /// Rows that normalized into a record
    pub records: Vec<SaleRecord>,
    /// Non-empty data rows read, valid or not
    pub total_rows: usize,
}

impl ParsedFile {
    pub fn dropped_rows(&self) -> usize {
        self.total_rows - self.records.len()
    }
}

/// Parse a sales CSV file (comma or semicolon separated)
pub fn parse_sales_csv<P: AsRef<Path>>(file_path: P) -> Result<ParsedFile> {
    let path = file_path.as_ref();
    info!("Parsing sales CSV file: {:?}", path);

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let text = decode_text(&bytes);
    parse_sales_csv_str(&text)
}

/// Spreadsheet exports are often Windows-1252 rather than UTF-8
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            debug!("CSV is not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Parse CSV content already held in memory
pub fn parse_sales_csv_str(text: &str) -> Result<ParsedFile> {
    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    debug!("CSV headers: {:?}", headers);

    if !headers.iter().any(|h| h.trim() == COL_DATE) {
        return Err(SalesError::ParseError(format!(
            "CSV has no '{}' column; is this the sales spreadsheet?",
            COL_DATE
        ))
        .into());
    }

    let mut parsed = ParsedFile::default();
    for (idx, result) in reader.records().enumerate() {
        let record = result.context("Failed to read CSV record")?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        parsed.total_rows += 1;

        let row: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();

        match normalize_row(&row) {
            Some(sale) => parsed.records.push(sale),
            None => debug!("Dropping row {}: unparseable {}", idx + 2, COL_DATE),
        }
    }

    info!(
        "Normalized {} of {} rows from CSV",
        parsed.records.len(),
        parsed.total_rows
    );
    Ok(parsed)
}

/// Look a column up by its exact header, then by its trimmed header
fn field<'a>(row: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    row.get(name)
        .or_else(|| row.get(name.trim()))
        .map(String::as_str)
}

fn text_or_unspecified(row: &HashMap<String, String>, name: &str) -> String {
    match field(row, name).map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

/// Turn one raw CSV row into a sale record.
///
/// Returns `None` when the sale date cannot be parsed; the row is then left
/// out of the import.
pub fn normalize_row(row: &HashMap<String, String>) -> Option<SaleRecord> {
    let sale_date = parse_sale_date(field(row, COL_DATE)?)?;

    let net_cost = clean_currency(field(row, COL_NET_COST));

    let incentives: BTreeMap<String, Decimal> = BASE_INCENTIVES
        .iter()
        .map(|name| (name.to_string(), clean_percentage(field(row, name))))
        .collect();

    let invoice_number = field(row, COL_INVOICE)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let trade_in = TradeIn {
        was_traded: field(row, COL_TRADE_IN_FLAG)
            .map(|v| v.trim().eq_ignore_ascii_case("SI"))
            .unwrap_or(false),
        model: field(row, COL_TRADE_IN_MODEL)
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
        trade_in_value_usd: clean_currency(field(row, COL_TRADE_IN_VALUE)),
    };

    let record = SaleRecord {
        id: None,
        product_type: text_or_unspecified(row, COL_PRODUCT_TYPE),
        model: text_or_unspecified(row, COL_MODEL),
        invoice_number,
        client: text_or_unspecified(row, COL_CLIENT),
        seller: text_or_unspecified(row, COL_SELLER),
        branch: text_or_unspecified(row, COL_BRANCH),
        sale_date,
        gross_sale_usd: clean_currency(field(row, COL_GROSS_SALE)),
        gross_cost_usd: clean_currency(field(row, COL_GROSS_COST)),
        net_cost_usd: (!net_cost.is_zero()).then_some(net_cost),
        exchange_rate: clean_currency(field(row, COL_EXCHANGE_RATE)),
        total_incentives_usd: clean_currency(field(row, COL_TOTAL_INCENTIVES)),
        incentives,
        trade_in,
        kind: SaleKind::Unpriced,
    };
    Some(record.classify())
}

/// Parse an amount such as `USS 1.234,50` (dot thousands, comma decimals).
///
/// Missing or unparseable values are zero.
pub fn clean_currency(raw: Option<&str>) -> Decimal {
    let Some(raw) = raw else {
        return Decimal::ZERO;
    };
    let mut cleaned = raw.to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    let cleaned: String = cleaned
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(&cleaned).unwrap_or_else(|_| {
        debug!("Unparseable amount '{}', using 0", raw);
        Decimal::ZERO
    })
}

/// Parse a percentage such as `2,5%`. Missing or unparseable values are zero.
pub fn clean_percentage(raw: Option<&str>) -> Decimal {
    let Some(raw) = raw else {
        return Decimal::ZERO;
    };
    let cleaned = raw.replace('%', "").trim().replace(',', ".");
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(&cleaned).unwrap_or_else(|_| {
        debug!("Unparseable percentage '{}', using 0", raw);
        Decimal::ZERO
    })
}

/// Parse `DD/MM/YYYY`; anything else, or an impossible date, is `None`.
pub fn parse_sale_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
