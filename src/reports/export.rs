//! Sales table exports: spreadsheet (XLSX, CSV) and paginated PDF

use anyhow::{Context, Result};
use chrono::NaiveDate;
use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::db::SaleRecord;
use crate::error::SalesError;
use crate::margin::margin_percent;

pub const EXPORT_HEADERS: [&str; 8] = [
    "Date",
    "Type",
    "Model",
    "Net cost (USD)",
    "Sale (USD)",
    "Margin %",
    "Seller",
    "Client",
];

pub const SHEET_NAME: &str = "Sales report";

pub const DEFAULT_PDF_ROWS_PER_PAGE: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Pdf,
}

impl FromStr for ExportFormat {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(SalesError::ParseError(format!(
                "unsupported export format: '{}' (xlsx, csv, pdf)",
                s
            ))),
        }
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub product_type: String,
    pub model: String,
    pub net_cost_usd: Decimal,
    pub sale_usd: Decimal,
    pub margin_pct: Decimal,
    pub seller: String,
    pub client: String,
}

impl From<&SaleRecord> for ExportRow {
    fn from(record: &SaleRecord) -> Self {
        Self {
            date: record.sale_date,
            product_type: record.product_type.clone(),
            model: record.model.clone(),
            net_cost_usd: record.effective_cost(),
            sale_usd: record.gross_sale_usd,
            margin_pct: margin_percent(record).round_dp(2),
            seller: record.seller.clone(),
            client: record.client.clone(),
        }
    }
}

impl ExportRow {
    fn cells(&self) -> [String; 8] {
        [
            self.date.format("%d/%m/%Y").to_string(),
            self.product_type.clone(),
            self.model.clone(),
            format!("{:.2}", self.net_cost_usd),
            format!("{:.2}", self.sale_usd),
            format!("{:.2}", self.margin_pct),
            self.seller.clone(),
            self.client.clone(),
        ]
    }
}

/// Write `records` to `path`; returns the number of data rows written.
pub fn export_sales(
    records: &[SaleRecord],
    format: ExportFormat,
    path: &Path,
    pdf_rows_per_page: usize,
) -> Result<usize> {
    let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();
    match format {
        ExportFormat::Xlsx => write_xlsx(&rows, path)?,
        ExportFormat::Csv => write_csv(&rows, path)?,
        ExportFormat::Pdf => {
            write_pdf(&rows, path, pdf_rows_per_page)?;
        }
    }
    info!("Exported {} rows to {:?}", rows.len(), path);
    Ok(rows.len())
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

pub fn write_xlsx(rows: &[ExportRow], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let money_format = Format::new().set_num_format("#,##0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, row.date.format("%d/%m/%Y").to_string())?;
        worksheet.write_string(r, 1, &row.product_type)?;
        worksheet.write_string(r, 2, &row.model)?;
        worksheet.write_number_with_format(r, 3, to_f64(row.net_cost_usd), &money_format)?;
        worksheet.write_number_with_format(r, 4, to_f64(row.sale_usd), &money_format)?;
        worksheet.write_number(r, 5, to_f64(row.margin_pct))?;
        worksheet.write_string(r, 6, &row.seller)?;
        worksheet.write_string(r, 7, &row.client)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write spreadsheet {:?}", path))?;
    Ok(())
}

pub fn write_csv(rows: &[ExportRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer.write_record(EXPORT_HEADERS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    Ok(())
}

// Landscape A4, in points
const PAGE_WIDTH: i64 = 842;
const PAGE_HEIGHT: i64 = 595;
const MARGIN: i64 = 36;
const ROW_HEIGHT: i64 = 16;
const FONT_SIZE: i64 = 8;

/// Data rows that fit between the header block and the bottom margin
pub const MAX_PDF_ROWS_PER_PAGE: usize =
    ((PAGE_HEIGHT - 2 * MARGIN - (ROW_HEIGHT + 4) - ROW_HEIGHT) / ROW_HEIGHT + 1) as usize;

/// Column start offsets and the characters that fit in each column
const PDF_COLUMNS: [(i64, usize); 8] = [
    (0, 12),
    (60, 18),
    (150, 18),
    (240, 16),
    (330, 16),
    (420, 10),
    (475, 32),
    (630, 34),
];

fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('.');
        cut
    }
}

/// Helvetica with WinAnsi encoding covers accented Spanish text
fn pdf_text(text: &str) -> Object {
    let (bytes, _, _) = WINDOWS_1252.encode(text);
    Object::string_literal(bytes.into_owned())
}

fn text_line(operations: &mut Vec<Operation>, x: i64, y: i64, text: &str) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new("Tj", vec![pdf_text(text)]));
    operations.push(Operation::new("ET", vec![]));
}

fn table_row(operations: &mut Vec<Operation>, y: i64, cells: &[String]) {
    for ((offset, width), cell) in PDF_COLUMNS.iter().zip(cells) {
        text_line(operations, MARGIN + offset, y, &fit(cell, *width));
    }
}

fn page_content(rows: &[ExportRow], page: usize, pages: usize) -> Result<Vec<u8>> {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    text_line(&mut operations, MARGIN, y, SHEET_NAME);
    y -= ROW_HEIGHT + 4;

    let headers: Vec<String> = EXPORT_HEADERS.iter().map(|h| h.to_string()).collect();
    table_row(&mut operations, y, &headers);
    // rule under the header
    operations.push(Operation::new("m", vec![MARGIN.into(), (y - 4).into()]));
    operations.push(Operation::new(
        "l",
        vec![(PAGE_WIDTH - MARGIN).into(), (y - 4).into()],
    ));
    operations.push(Operation::new("S", vec![]));
    y -= ROW_HEIGHT;

    for row in rows {
        table_row(&mut operations, y, &row.cells());
        y -= ROW_HEIGHT;
    }

    text_line(
        &mut operations,
        PAGE_WIDTH - MARGIN - 60,
        MARGIN / 2,
        &format!("Page {} / {}", page, pages),
    );

    Content { operations }
        .encode()
        .context("Failed to encode PDF page")
}

/// Returns the number of pages written.
///
/// `rows_per_page` is clamped to `1..=MAX_PDF_ROWS_PER_PAGE`.
pub fn write_pdf(rows: &[ExportRow], path: &Path, rows_per_page: usize) -> Result<usize> {
    let rows_per_page = rows_per_page.clamp(1, MAX_PDF_ROWS_PER_PAGE);
    let chunks: Vec<&[ExportRow]> = if rows.is_empty() {
        vec![rows]
    } else {
        rows.chunks(rows_per_page).collect()
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let content = page_content(chunk, index + 1, chunks.len())?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_ids.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path)
        .with_context(|| format!("Failed to write PDF {:?}", path))?;

    Ok(page_ids.len())
}
