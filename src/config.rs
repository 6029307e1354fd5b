//! Configuration for salesboard
//!
//! Layers, lowest precedence first: built-in defaults, `config.toml`,
//! environment variables, command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::auth::Role;
use crate::reports::export::{DEFAULT_PDF_ROWS_PER_PAGE, MAX_PDF_ROWS_PER_PAGE};

pub const ENV_DB: &str = "SALESBOARD_DB";
pub const ENV_ROLE: &str = "SALESBOARD_ROLE";

pub const DEFAULT_RECENT_SALES: usize = 10;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml; every key is optional
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub role: Option<String>,
    pub recent_sales: Option<usize>,
    pub pdf_rows_per_page: Option<usize>,
    pub extra_incentives: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// `<config_home>/salesboard/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("salesboard").join("config.toml"))
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Values that override the file: environment first, then CLI flags on top
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub role: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var_os(ENV_DB)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            role: std::env::var(ENV_ROLE).ok().filter(|v| !v.trim().is_empty()),
        }
    }

    /// `other` wins where it is set
    pub fn merged_with(self, other: Overrides) -> Self {
        Self {
            db_path: other.db_path.or(self.db_path),
            role: other.role.or(self.role),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` means the default location (~/.salesboard/sales.db)
    pub db_path: Option<PathBuf>,
    pub role: Role,
    pub recent_sales: usize,
    pub pdf_rows_per_page: usize,
    pub extra_incentives: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            role: Role::Viewer,
            recent_sales: DEFAULT_RECENT_SALES,
            pdf_rows_per_page: DEFAULT_PDF_ROWS_PER_PAGE,
            extra_incentives: Vec::new(),
        }
    }
}

/// Zero falls back to the default; anything taller than a page is capped
fn pdf_rows_per_page(configured: Option<usize>) -> usize {
    match configured {
        Some(0) | None => DEFAULT_PDF_ROWS_PER_PAGE,
        Some(n) if n > MAX_PDF_ROWS_PER_PAGE => {
            warn!(
                "pdf_rows_per_page = {} does not fit on a page, using {}",
                n, MAX_PDF_ROWS_PER_PAGE
            );
            MAX_PDF_ROWS_PER_PAGE
        }
        Some(n) => n,
    }
}

impl Config {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let defaults = Config::default();
        let role = match overrides.role.or(file.role) {
            Some(name) => name.parse::<Role>()?,
            None => defaults.role,
        };
        Ok(Self {
            db_path: overrides.db_path.or(file.db_path),
            role,
            recent_sales: file.recent_sales.unwrap_or(defaults.recent_sales),
            pdf_rows_per_page: pdf_rows_per_page(file.pdf_rows_per_page),
            extra_incentives: file.extra_incentives,
        })
    }

    /// Read the config file (when present) and apply env and CLI overrides.
    pub fn load(cli: Overrides) -> Result<Self> {
        let file = match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                FileConfig::load(&path)?
            }
            _ => FileConfig::default(),
        };
        Self::resolve(file, Overrides::from_env().merged_with(cli))
    }
}
