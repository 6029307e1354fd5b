//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::db::SaleRecord;
use crate::fiscal::{FiscalYearCount, MonthlyCount, QuarterMargin};
use crate::margin::{margin_percent, MarginBand};
use crate::reports::{
    FilterOptions, KpiSummary, ModelProfitability, ParticipationEntry, ParticipationGroup, SellerPerformance,
};
use crate::utils::{format_percent, format_usd, format_usd_compact};

pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Margin percentage coloured by its band
pub fn colored_margin(pct: Decimal) -> ColoredString {
    let text = format_percent(pct);
    match MarginBand::classify(pct) {
        MarginBand::Green => text.green(),
        MarginBand::Yellow => text.yellow(),
        MarginBand::Red => text.red(),
    }
}

pub fn format_kpis(kpi: &KpiSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{} Key figures\n", "📊".cyan().bold()));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Total revenue:".bold(),
        format_usd_compact(kpi.total_revenue)
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Total margin:".bold(),
        format_usd_compact(kpi.total_margin)
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Average margin:".bold(),
        colored_margin(kpi.average_margin_pct)
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Completed sales:".bold(),
        kpi.completed_sales
    ));
    output.push_str(&format!(
        "\n{:<24} {}",
        "Models sold:".bold(),
        kpi.distinct_models
    ));
    output.push_str(&format!(
        "\n{:<24} {} units ({})",
        "Stock:".bold(),
        kpi.stock_units,
        format_usd_compact(kpi.stock_value)
    ));
    if kpi.financed_plan_sales > 0 {
        output.push_str(&format!(
            "\n{:<24} {} ({})",
            "Financed plan sales:".bold(),
            kpi.financed_plan_sales,
            format_usd_compact(kpi.financed_plan_revenue)
        ));
    }
    output.push('\n');
    output
}

/// One line per selector with the values it offers
pub fn format_filter_options(options: &FilterOptions) -> String {
    let years: Vec<String> = options
        .fiscal_years
        .iter()
        .map(|fy| format!("FY{}", fy))
        .collect();

    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Filters".bold()));
    for (label, values) in [
        ("Types:", options.product_types.join(", ")),
        ("Sellers:", options.sellers.join(", ")),
        ("Clients:", options.clients.join(", ")),
        ("Fiscal years:", years.join(", ")),
    ] {
        output.push_str(&format!("{:<16} {}\n", label.dimmed(), values));
    }
    output
}

pub fn format_participation_table(entries: &[ParticipationEntry], group: ParticipationGroup) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Group")]
        label: String,
        #[tabled(rename = "Records")]
        count: usize,
        #[tabled(rename = "Share")]
        share: String,
    }

    let title = match group {
        ParticipationGroup::ProductType => "Participation by product type",
        ParticipationGroup::Model => "Participation by model",
    };

    let rows: Vec<Row> = entries
        .iter()
        .map(|e| Row {
            label: e.label.clone(),
            count: e.count,
            share: format_percent(e.share_pct),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{}\n{}\n", title.bold(), table)
}

pub fn format_sales_table(records: &[SaleRecord]) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Type")]
        product_type: String,
        #[tabled(rename = "Model")]
        model: String,
        #[tabled(rename = "Seller")]
        seller: String,
        #[tabled(rename = "Client")]
        client: String,
        #[tabled(rename = "Sale")]
        sale: String,
        #[tabled(rename = "Margin")]
        margin: String,
    }

    let rows: Vec<Row> = records
        .iter()
        .map(|r| Row {
            date: r.sale_date.format("%d/%m/%Y").to_string(),
            product_type: r.product_type.clone(),
            model: r.model.clone(),
            seller: r.seller.clone(),
            client: r.client.clone(),
            sale: format_usd(r.gross_sale_usd),
            margin: if r.is_completed() {
                colored_margin(margin_percent(r)).to_string()
            } else {
                r.kind.as_str().bright_black().to_string()
            },
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(5..), Alignment::right());
    table.to_string()
}

pub fn format_monthly_table(months: &[MonthlyCount], fiscal_year: i32) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Month")]
        label: String,
        #[tabled(rename = "Records")]
        count: usize,
    }

    let rows: Vec<Row> = months
        .iter()
        .map(|m| Row {
            label: m.label.clone(),
            count: m.count,
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    format!("\n{}\n{}\n", format!("Sales per month, FY{}", fiscal_year).bold(), table)
}

pub fn format_fiscal_year_table(years: &[FiscalYearCount]) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Fiscal year")]
        label: String,
        #[tabled(rename = "Records")]
        count: usize,
    }

    let rows: Vec<Row> = years
        .iter()
        .map(|y| Row {
            label: y.label.clone(),
            count: y.count,
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    format!("\n{}\n{}\n", "Sales per fiscal year".bold(), table)
}

pub fn format_margin_trend_table(trend: &[QuarterMargin]) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Quarter")]
        label: String,
        #[tabled(rename = "Sales")]
        sales: usize,
        #[tabled(rename = "Avg margin")]
        margin: String,
    }

    let rows: Vec<Row> = trend
        .iter()
        .map(|q| Row {
            label: q.label.clone(),
            sales: q.sales,
            margin: colored_margin(q.average_margin_pct).to_string(),
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{}\n{}\n", "Margin trend".bold(), table)
}

pub fn format_models_table(models: &[ModelProfitability]) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Model")]
        model: String,
        #[tabled(rename = "Units")]
        units: usize,
        #[tabled(rename = "Revenue")]
        revenue: String,
        #[tabled(rename = "Margin")]
        margin: String,
        #[tabled(rename = "Avg margin")]
        average: String,
    }

    let rows: Vec<Row> = models
        .iter()
        .map(|m| Row {
            model: m.model.clone(),
            units: m.units,
            revenue: format_usd(m.total_revenue),
            margin: format_usd(m.total_margin),
            average: colored_margin(m.average_margin_pct).to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    // Right-align everything but the model name
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

pub fn format_sellers_table(sellers: &[SellerPerformance]) -> String {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "#")]
        rank: usize,
        #[tabled(rename = "Seller")]
        seller: String,
        #[tabled(rename = "Operations")]
        operations: usize,
        #[tabled(rename = "Revenue")]
        revenue: String,
        #[tabled(rename = "Margin")]
        margin: String,
        #[tabled(rename = "Avg ticket")]
        ticket: String,
        #[tabled(rename = "Avg margin")]
        average: String,
    }

    let rows: Vec<Row> = sellers
        .iter()
        .enumerate()
        .map(|(i, s)| Row {
            rank: i + 1,
            seller: s.seller.clone(),
            operations: s.operations,
            revenue: format_usd(s.total_revenue),
            margin: format_usd(s.total_margin),
            ticket: format_usd(s.average_ticket),
            average: colored_margin(s.average_margin_pct).to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(2..), Alignment::right());
    table.to_string()
}

/// Format empty store message
pub fn format_empty_store() -> String {
    format!(
        "{} No sales found\nLoad the spreadsheet first using: {} import <file>\n",
        "ℹ".blue().bold(),
        "salesboard".bold()
    )
}
