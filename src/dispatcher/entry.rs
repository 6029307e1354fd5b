use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::AppContext;
use crate::auth::{authorize, Action};
use crate::cli::formatters::{colored_margin, format_json};
use crate::cli::AddArgs;
use crate::db::models::BASE_INCENTIVES;
use crate::db::{self, SaleRecord};
use crate::error::SalesError;
use crate::importers::manual::normalize_incentive_name;
use crate::importers::{IncentiveRegistry, ManualEntry};
use crate::margin::margin_percent;
use crate::utils::{format_usd, parse_cli_date};

/// Parse a typed amount; accepts `1234.5`, `1234,5` and `1.234,50`.
///
/// `1.234` is rejected: a dot followed by exactly three digits reads as a
/// thousands separator.
fn parse_amount(field: &str, raw: &str) -> Result<Decimal, SalesError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        if let Some((_, fraction)) = trimmed.rsplit_once('.') {
            if fraction.len() == 3 && fraction.chars().all(|c| c.is_ascii_digit()) {
                return Err(SalesError::ParseError(format!(
                    "ambiguous {}: '{}' (write {} or {},00)",
                    field,
                    raw,
                    trimmed.replace('.', ""),
                    trimmed
                )));
            }
        }
        trimmed.to_string()
    };
    Decimal::from_str(&normalized)
        .map_err(|_| SalesError::ParseError(format!("invalid {}: '{}'", field, raw)))
}

/// Parse `NAME=PCT`; the name comes back normalized
fn parse_incentive(raw: &str) -> Result<(String, Decimal), SalesError> {
    let (name, pct) = raw.split_once('=').ok_or_else(|| {
        SalesError::ParseError(format!("invalid incentive '{}' (expected NAME=PCT)", raw))
    })?;
    let pct = parse_amount("incentive percentage", pct.trim_end_matches('%'))?;
    Ok((normalize_incentive_name(name), pct))
}

fn optional_amount(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, SalesError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_amount(field, s))
        .transpose()
}

pub fn manual_entry_from_args(args: AddArgs) -> Result<ManualEntry> {
    let mut incentives = BTreeMap::new();
    for raw in &args.incentives {
        let (name, pct) = parse_incentive(raw)?;
        *incentives.entry(name).or_insert(Decimal::ZERO) += pct;
    }

    let trade_in = match (args.trade_in_model, args.trade_in_value.as_deref()) {
        (Some(model), value) if !model.trim().is_empty() => Some((
            model,
            optional_amount("trade-in value", value)?.unwrap_or(Decimal::ZERO),
        )),
        _ => None,
    };

    Ok(ManualEntry {
        product_type: args.product_type.unwrap_or_default(),
        model: args.model.unwrap_or_default(),
        gross_cost_usd: optional_amount("cost", args.cost.as_deref())?,
        gross_sale_usd: optional_amount("sale", args.sale.as_deref())?,
        sale_date: args.date.as_deref().map(parse_cli_date).transpose()?,
        client: args.client.unwrap_or_default(),
        seller: args.seller.unwrap_or_default(),
        branch: args.branch.unwrap_or_default(),
        invoice_number: args.invoice,
        incentives,
        trade_in,
    })
}

/// Base names, configured extras and names stored by earlier entries
fn load_registry(ctx: &AppContext, conn: &rusqlite::Connection) -> Result<IncentiveRegistry> {
    Ok(IncentiveRegistry::new()
        .with_names(&ctx.config.extra_incentives)
        .with_names(db::list_incentive_programs(conn)?))
}

#[derive(Serialize)]
struct AddedJson<'a> {
    id: i64,
    record: &'a SaleRecord,
    margin_pct: Decimal,
}

pub fn dispatch_add(args: AddArgs, ctx: &AppContext) -> Result<()> {
    authorize(ctx.config.role, Action::ManualEntry)?;

    let entry = manual_entry_from_args(args)?;
    let conn = ctx.open()?;
    let mut registry = load_registry(ctx, &conn)?;
    let record = entry.into_record(&mut registry)?;

    let id = db::insert_sale(&conn, &record)?;
    for name in record.incentives.keys() {
        if !BASE_INCENTIVES.contains(&name.as_str()) {
            db::add_incentive_program(&conn, name)?;
        }
    }
    tracing::info!("Stored manual sale {} ({} {})", id, record.product_type, record.model);

    let margin = margin_percent(&record);
    if ctx.json {
        println!(
            "{}",
            format_json(&AddedJson {
                id,
                record: &record,
                margin_pct: margin,
            })
        );
    } else {
        println!("\n{} Operation saved (#{})", "✓".green().bold(), id);
        println!("  {} {} for {}", record.product_type, record.model, record.client);
        println!("  Sale: {}", format_usd(record.gross_sale_usd));
        println!("  Net cost: {}", format_usd(record.effective_cost()));
        if record.total_incentives_usd > Decimal::ZERO {
            println!("  Incentives: {}", format_usd(record.total_incentives_usd));
        }
        println!("  Margin: {}", colored_margin(margin));
    }
    Ok(())
}

pub fn dispatch_incentives_list(ctx: &AppContext) -> Result<()> {
    let conn = ctx.open()?;
    let registry = load_registry(ctx, &conn)?;
    let names: Vec<&str> = registry.names().collect();

    if ctx.json {
        println!("{}", format_json(&names));
    } else {
        println!("\n{} Incentive programs\n", "📋".cyan().bold());
        for name in names {
            println!("  {}", name);
        }
    }
    Ok(())
}

pub fn dispatch_incentives_add(name: &str, ctx: &AppContext) -> Result<()> {
    authorize(ctx.config.role, Action::ManualEntry)?;

    let normalized = normalize_incentive_name(name);
    if normalized.is_empty() {
        return Err(SalesError::ValidationError("incentive name is empty".to_string()).into());
    }

    let conn = ctx.open()?;
    let registry = load_registry(ctx, &conn)?;
    let added = !registry.contains(&normalized) && db::add_incentive_program(&conn, &normalized)?;

    if ctx.json {
        #[derive(Serialize)]
        struct AddedIncentive {
            name: String,
            added: bool,
        }
        println!(
            "{}",
            format_json(&AddedIncentive {
                name: normalized,
                added,
            })
        );
    } else if added {
        println!("{} Registered {}", "✓".green().bold(), normalized);
    } else {
        println!("{} {} is already registered", "ℹ".blue().bold(), normalized);
    }
    Ok(())
}
