use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::AppContext;
use crate::auth::{authorize, Action};
use crate::cli::formatters::{format_json, format_sales_table};
use crate::{db, importers};

const PREVIEW_ROWS: usize = 10;

#[derive(Serialize)]
struct ImportSummaryJson {
    file: String,
    total_rows: usize,
    valid_rows: usize,
    dropped_rows: usize,
    dry_run: bool,
    deleted: Option<usize>,
    batch_sizes: Vec<usize>,
}

pub async fn dispatch_import(path: &Path, dry_run: bool, ctx: &AppContext) -> Result<()> {
    authorize(ctx.config.role, Action::BulkImport)?;
    tracing::info!("Importing from: {:?}", path);

    let parsed = importers::import_file(path)
        .with_context(|| format!("Error reading import file {}", path.display()))?;

    let mut summary = ImportSummaryJson {
        file: path.display().to_string(),
        total_rows: parsed.total_rows,
        valid_rows: parsed.records.len(),
        dropped_rows: parsed.dropped_rows(),
        dry_run,
        deleted: None,
        batch_sizes: Vec::new(),
    };

    if !ctx.json {
        println!(
            "\n{} {} rows read, {} valid\n",
            "✓".green().bold(),
            summary.total_rows,
            summary.valid_rows
        );
        if summary.dropped_rows > 0 {
            println!(
                "{} {} rows skipped (unreadable FECHA)",
                "ℹ".blue().bold(),
                summary.dropped_rows
            );
        }
        if !parsed.records.is_empty() {
            let preview: Vec<_> = parsed.records.iter().take(PREVIEW_ROWS).cloned().collect();
            println!("{}", format_sales_table(&preview));
            if parsed.records.len() > PREVIEW_ROWS {
                println!("\n... and {} more rows", parsed.records.len() - PREVIEW_ROWS);
            }
        }
    }

    if dry_run {
        if ctx.json {
            println!("{}", format_json(&summary));
        } else {
            println!("\n{} Dry run - no changes saved", "ℹ".blue().bold());
        }
        return Ok(());
    }

    let db_path = ctx.db_path()?;
    db::init_database(Some(db_path.clone()))?;
    let report = db::replace_all_sales(&db_path, parsed.records).await?;

    summary.deleted = Some(report.deleted);
    summary.batch_sizes = report.batch_sizes.clone();

    if ctx.json {
        println!("{}", format_json(&summary));
    } else {
        println!("\n{} Import complete!", "✓".green().bold());
        println!("  Replaced: {}", report.deleted.to_string().yellow());
        println!("  Stored: {}", report.written().to_string().green());
        let batches: Vec<String> = report.batch_sizes.iter().map(|n| n.to_string()).collect();
        println!("  Batches: {}", batches.join(" + "));
    }
    Ok(())
}
