use std::path::Path;

use anyhow::{bail, Context};
use tracing::debug;

use crate::db::{compute_checksum, import_statement};
use crate::error::LedgerwiseError;
use crate::importer::Reconciler;
use crate::ofx::parse_statement;
use crate::settings::load_settings;

pub fn run(file: &str, owner: Option<String>) -> anyhow::Result<()> {
    let settings = load_settings();
    let owner = settings.owner_or_default(owner);
    let path = Path::new(file);

    let bytes = std::fs::read(path).with_context(|| format!("cannot read {file}"))?;
    let content = String::from_utf8_lossy(&bytes);
    let records = match parse_statement(&content) {
        Ok(records) => records,
        Err(LedgerwiseError::Parse(detail)) => {
            debug!(file, detail = detail.as_str(), "statement rejected");
            bail!("{file} is not a valid bank statement (expected OFX)");
        }
        Err(e) => return Err(e.into()),
    };

    let mut conn = super::open_db(&settings)?;
    let reconciler = Reconciler::new(owner.as_str(), settings.categorizer()?);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());

    let result = match import_statement(&mut conn, &filename, &compute_checksum(&bytes), &reconciler, &records) {
        Ok(result) => result,
        Err(LedgerwiseError::NoTransactionsFound) => {
            bail!("No transactions found in {file}");
        }
        Err(e) => return Err(e.into()),
    };

    if result.duplicate_file {
        println!("This file has already been imported for {owner} (duplicate checksum).");
        return Ok(());
    }

    let report = &result.report;
    println!(
        "{} imported, {} skipped (duplicates), {} rejected",
        report.imported_count, report.skipped_count, report.rejected_count
    );
    Ok(())
}
