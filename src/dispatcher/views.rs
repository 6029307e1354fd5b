use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::{build_criteria, AppContext};
use crate::auth::{authorize, Action};
use crate::cli::formatters::{
    format_empty_store, format_filter_options, format_fiscal_year_table, format_json,
    format_kpis, format_margin_trend_table, format_models_table, format_monthly_table,
    format_participation_table, format_sales_table, format_sellers_table,
};
use crate::cli::FilterArgs;
use crate::db::SaleRecord;
use crate::filters::{filter_records, FilterCriteria, FiscalYearFilter};
use crate::fiscal::{
    margin_trend, monthly_sales, sales_by_fiscal_year, FiscalYearCount, MonthlyCount,
    QuarterMargin,
};
use crate::margin::MarginBand;
use crate::reports::{
    export_sales, filter_options, kpi_summary, participation_breakdown, profitability_by_model,
    recent_sales, seller_ranking, seller_summary, sort_models, sort_sellers, ExportFormat,
    FilterOptions, KpiSummary, ModelProfitability, ModelSortKey, ParticipationEntry,
    ParticipationGroup, SellerPerformance, SellerSortKey, SortDirection,
};

fn direction(asc: bool) -> SortDirection {
    if asc {
        SortDirection::Asc
    } else {
        SortDirection::Desc
    }
}

struct FilteredView {
    records: Vec<SaleRecord>,
    criteria: FilterCriteria,
    options: FilterOptions,
}

/// Load everything once, then narrow it down for the view
fn load_filtered(args: &FilterArgs, ctx: &AppContext) -> Result<FilteredView> {
    authorize(ctx.config.role, Action::ViewReports)?;
    let all = ctx.load_sales()?;
    let criteria = build_criteria(args, &all)?;
    let records = filter_records(&all, &criteria);
    tracing::debug!("{} of {} records pass the filters", records.len(), all.len());
    Ok(FilteredView {
        records,
        criteria,
        options: filter_options(&all),
    })
}

#[derive(Serialize)]
#[serde(untagged)]
enum SalesTrend {
    Monthly(Vec<MonthlyCount>),
    ByFiscalYear(Vec<FiscalYearCount>),
}

#[derive(Serialize)]
struct DashboardJson {
    criteria: FilterCriteria,
    options: FilterOptions,
    kpis: KpiSummary,
    margin_band: MarginBand,
    margin_color: &'static str,
    participation_group: ParticipationGroup,
    participation: Vec<ParticipationEntry>,
    recent_sales: Vec<SaleRecord>,
    sales_trend: SalesTrend,
    margin_trend: Vec<QuarterMargin>,
}

pub fn dispatch_dashboard(args: &FilterArgs, ctx: &AppContext) -> Result<()> {
    let FilteredView {
        records,
        criteria,
        options,
    } = load_filtered(args, ctx)?;

    let kpis = kpi_summary(&records);
    let band = MarginBand::classify(kpis.average_margin_pct);
    let group = ParticipationGroup::for_criteria(&criteria);
    let dashboard = DashboardJson {
        options,
        kpis,
        margin_band: band,
        margin_color: band.hex_color(),
        participation_group: group,
        participation: participation_breakdown(&records, group),
        recent_sales: recent_sales(&records, ctx.config.recent_sales),
        sales_trend: match criteria.fiscal_year {
            FiscalYearFilter::Year(fy) => SalesTrend::Monthly(monthly_sales(&records, fy)),
            FiscalYearFilter::All => SalesTrend::ByFiscalYear(sales_by_fiscal_year(&records)),
        },
        margin_trend: margin_trend(&records),
        criteria,
    };

    if ctx.json {
        println!("{}", format_json(&dashboard));
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", format_empty_store());
        return Ok(());
    }

    print!("{}", format_kpis(&dashboard.kpis));
    print!("{}", format_filter_options(&dashboard.options));
    print!(
        "{}",
        format_participation_table(&dashboard.participation, dashboard.participation_group)
    );
    println!("\n{}", "Recent sales".bold());
    println!("{}", format_sales_table(&dashboard.recent_sales));
    match &dashboard.sales_trend {
        SalesTrend::Monthly(months) => {
            if let FiscalYearFilter::Year(fy) = dashboard.criteria.fiscal_year {
                print!("{}", format_monthly_table(months, fy));
            }
        }
        SalesTrend::ByFiscalYear(years) => print!("{}", format_fiscal_year_table(years)),
    }
    if !dashboard.margin_trend.is_empty() {
        print!("{}", format_margin_trend_table(&dashboard.margin_trend));
    }
    Ok(())
}

pub fn dispatch_models(
    args: &FilterArgs,
    sort: Option<&str>,
    asc: bool,
    ctx: &AppContext,
) -> Result<()> {
    let records = load_filtered(args, ctx)?.records;
    let mut rows: Vec<ModelProfitability> = profitability_by_model(&records);
    if let Some(key) = sort {
        sort_models(&mut rows, key.parse::<ModelSortKey>()?, direction(asc));
    } else if asc {
        sort_models(&mut rows, ModelSortKey::Margin, SortDirection::Asc);
    }

    if ctx.json {
        println!("{}", format_json(&rows));
    } else if rows.is_empty() {
        println!("{}", format_empty_store());
    } else {
        println!("\n{} Profitability by model\n", "📊".cyan().bold());
        println!("{}", format_models_table(&rows));
    }
    Ok(())
}

#[derive(Serialize)]
struct SellerDetailJson {
    seller: String,
    summary: KpiSummary,
    recent_sales: Vec<SaleRecord>,
    margin_trend: Vec<QuarterMargin>,
}

pub fn dispatch_sellers(
    args: &FilterArgs,
    sort: Option<&str>,
    asc: bool,
    seller: Option<&str>,
    ctx: &AppContext,
) -> Result<()> {
    let records = load_filtered(args, ctx)?.records;

    if let Some(name) = seller {
        return seller_detail(&records, name, ctx);
    }

    let mut rows: Vec<SellerPerformance> = seller_ranking(&records);
    if let Some(key) = sort {
        sort_sellers(&mut rows, key.parse::<SellerSortKey>()?, direction(asc));
    } else if asc {
        sort_sellers(&mut rows, SellerSortKey::Revenue, SortDirection::Asc);
    }

    if ctx.json {
        println!("{}", format_json(&rows));
    } else if rows.is_empty() {
        println!("{}", format_empty_store());
    } else {
        println!("\n{} Seller ranking\n", "🏆".cyan().bold());
        println!("{}", format_sellers_table(&rows));
    }
    Ok(())
}

fn seller_detail(records: &[SaleRecord], name: &str, ctx: &AppContext) -> Result<()> {
    let criteria = FilterCriteria::new().with_seller(name);
    let own = filter_records(records, &criteria);
    let detail = SellerDetailJson {
        seller: criteria.seller.clone().unwrap_or_default(),
        summary: seller_summary(records, name),
        recent_sales: recent_sales(&own, ctx.config.recent_sales),
        margin_trend: margin_trend(&own),
    };

    if ctx.json {
        println!("{}", format_json(&detail));
        return Ok(());
    }
    if own.is_empty() {
        println!("{} No sales found for {}", "ℹ".blue().bold(), detail.seller);
        return Ok(());
    }

    println!("\n{} {}", "👤".cyan().bold(), detail.seller.bold());
    print!("{}", format_kpis(&detail.summary));
    println!("\n{}", "Recent sales".bold());
    println!("{}", format_sales_table(&detail.recent_sales));
    if !detail.margin_trend.is_empty() {
        print!("{}", format_margin_trend_table(&detail.margin_trend));
    }
    Ok(())
}

pub fn dispatch_export(format: &str, path: &Path, args: &FilterArgs, ctx: &AppContext) -> Result<()> {
    let format = format.parse::<ExportFormat>()?;
    let records = load_filtered(args, ctx)?.records;
    let written = export_sales(&records, format, path, ctx.config.pdf_rows_per_page)?;

    if ctx.json {
        #[derive(Serialize)]
        struct ExportJson {
            path: String,
            rows: usize,
        }
        println!(
            "{}",
            format_json(&ExportJson {
                path: path.display().to_string(),
                rows: written,
            })
        );
    } else {
        println!(
            "{} Exported {} rows to {}",
            "✓".green().bold(),
            written,
            path.display()
        );
    }
    Ok(())
}
