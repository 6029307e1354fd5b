use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser, Debug)]
#[command(name = "salesboard")]
#[command(
    version,
    about = "Sales analytics for a machinery dealership: margins, rankings and reports"
)]
#[command(
    long_about = "Import the dealership sales spreadsheet (CSV export), add operations by hand, and review margin KPIs, model profitability, seller rankings and trends. Exports the filtered sales table to XLSX, CSV or PDF."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Role to act as (admin, cargador, viewer)
    #[arg(long, global = true)]
    pub role: Option<String>,

    /// Database file (default ~/.salesboard/sales.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Filters shared by every read view
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Product type to include (repeatable; default all)
    #[arg(long = "type", value_name = "TYPE")]
    pub product_types: Vec<String>,

    /// Case-insensitive part of the seller name
    #[arg(long = "seller-like", value_name = "TEXT")]
    pub seller_like: Option<String>,

    /// First sale date, inclusive (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long)]
    pub from: Option<String>,

    /// Last sale date, inclusive (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long)]
    pub to: Option<String>,

    /// Fiscal year (November to October), e.g. 2025, FY2025 or all
    #[arg(long)]
    pub fy: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace every stored sale with the contents of a CSV export (admin only)
    Import {
        /// Path to the CSV file
        file: PathBuf,

        /// Preview only, don't touch the database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Add a single operation by hand (admin or cargador)
    Add(AddArgs),

    /// KPIs, participation, recent sales and trends
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Profitability by model
    Models {
        #[command(flatten)]
        filters: FilterArgs,

        /// Sort by: model, units, revenue, margin, average-margin
        #[arg(long)]
        sort: Option<String>,

        /// Ascending order (default descending)
        #[arg(long)]
        asc: bool,
    },

    /// Seller ranking, or one seller's detail with --seller
    Sellers {
        #[command(flatten)]
        filters: FilterArgs,

        /// Sort by: seller, operations, revenue, margin, average-ticket, average-margin
        #[arg(long)]
        sort: Option<String>,

        /// Ascending order (default descending)
        #[arg(long)]
        asc: bool,

        /// Show the detail view for this seller
        #[arg(long)]
        seller: Option<String>,
    },

    /// Export the filtered sales table
    Export {
        /// xlsx, csv or pdf
        format: String,

        /// Output file
        path: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Incentive program names
    Incentives {
        #[command(subcommand)]
        action: IncentiveCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Product type, e.g. TRACTOR
    #[arg(long = "type")]
    pub product_type: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Gross cost in USD
    #[arg(long)]
    pub cost: Option<String>,

    /// Sale price in USD
    #[arg(long)]
    pub sale: Option<String>,

    /// Sale date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub seller: Option<String>,

    #[arg(long)]
    pub client: Option<String>,

    #[arg(long)]
    pub branch: Option<String>,

    /// Invoice number
    #[arg(long)]
    pub invoice: Option<String>,

    /// Incentive as NAME=PERCENT (repeatable)
    #[arg(long = "incentive", value_name = "NAME=PCT")]
    pub incentives: Vec<String>,

    /// Model of the used machine taken in trade
    #[arg(long)]
    pub trade_in_model: Option<String>,

    /// Value given for the used machine (USD)
    #[arg(long)]
    pub trade_in_value: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum IncentiveCommands {
    /// List known incentive programs
    List,
    /// Register a new incentive program name
    Add {
        name: String,
    },
}
