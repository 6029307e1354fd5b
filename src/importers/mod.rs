// Import module - sales CSV parser and manual entry

pub mod manual;
pub mod sales_csv;

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

pub use manual::{IncentiveRegistry, ManualEntry};
pub use sales_csv::{normalize_row, parse_sales_csv, ParsedFile};

/// Import a sales spreadsheet export (checks the extension, then parses)
pub fn import_file<P: AsRef<Path>>(file_path: P) -> Result<ParsedFile> {
    let path = file_path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("File has no extension"))?
        .to_lowercase();

    info!("Importing sales file: {:?} (type: {})", path, extension);

    match extension.as_str() {
        "csv" | "txt" => parse_sales_csv(path),
        _ => Err(anyhow!(
            "Unsupported file format: {}. Supported formats: .csv, .txt",
            extension
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_extensions() {
        let err = import_file("sales.xlsx").unwrap_err();
        assert!(err.to_string().contains("Unsupported file format: xlsx"));
        assert!(import_file("sales").is_err());
    }
}
