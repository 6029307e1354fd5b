//! Command dispatcher that routes parsed clap commands to their handlers.
//!
//! Every handler receives the resolved `AppContext` (configuration plus output
//! mode) and loads the record collection itself.

mod entry;
mod imports;
mod views;

use anyhow::Result;
use std::path::PathBuf;

use crate::cli::{Commands, FilterArgs, IncentiveCommands};
use crate::config::Config;
use crate::db::{self, SaleRecord};
use crate::filters::{FilterCriteria, FiscalYearFilter};
use crate::reports::product_type_options;
use crate::utils::parse_cli_date;

/// Resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub json: bool,
}

impl AppContext {
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.config.db_path {
            Some(path) => Ok(path.clone()),
            None => db::get_default_db_path(),
        }
    }

    /// Open the store, creating the schema when needed
    pub fn open(&self) -> Result<rusqlite::Connection> {
        let path = self.db_path()?;
        db::init_database(Some(path.clone()))?;
        db::open_db(Some(path))
    }

    pub fn load_sales(&self) -> Result<Vec<SaleRecord>> {
        let conn = self.open()?;
        db::load_sales(&conn)
    }
}

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Import { file, dry_run } => imports::dispatch_import(&file, dry_run, ctx).await,
        Commands::Add(args) => entry::dispatch_add(args, ctx),
        Commands::Dashboard { filters } => views::dispatch_dashboard(&filters, ctx),
        Commands::Models { filters, sort, asc } => {
            views::dispatch_models(&filters, sort.as_deref(), asc, ctx)
        }
        Commands::Sellers {
            filters,
            sort,
            asc,
            seller,
        } => views::dispatch_sellers(&filters, sort.as_deref(), asc, seller.as_deref(), ctx),
        Commands::Export {
            format,
            path,
            filters,
        } => views::dispatch_export(&format, &path, &filters, ctx),
        Commands::Incentives { action } => match action {
            IncentiveCommands::List => entry::dispatch_incentives_list(ctx),
            IncentiveCommands::Add { name } => entry::dispatch_incentives_add(&name, ctx),
        },
    }
}

/// Build the criteria for a view.
///
/// Product types are matched case-insensitively against the stored spellings.
pub fn build_criteria(args: &FilterArgs, records: &[SaleRecord]) -> Result<FilterCriteria> {
    let known = product_type_options(records);
    let mut criteria = FilterCriteria::new();

    for wanted in &args.product_types {
        let wanted = wanted.trim();
        let lowered = wanted.to_lowercase();
        let stored = known
            .iter()
            .find(|k| k.to_lowercase() == lowered)
            .cloned()
            .unwrap_or_else(|| wanted.to_string());
        criteria = criteria.with_product_type(stored);
    }

    if let Some(needle) = args.seller_like.as_deref().filter(|s| !s.trim().is_empty()) {
        criteria = criteria.with_seller_substring(needle.trim());
    }

    let from = args.from.as_deref().map(parse_cli_date).transpose()?;
    let to = args.to.as_deref().map(parse_cli_date).transpose()?;
    criteria = criteria.with_date_range(from, to);

    if let Some(fy) = args.fy.as_deref() {
        criteria = criteria.with_fiscal_year(fy.parse::<FiscalYearFilter>()?);
    }

    Ok(criteria)
}
