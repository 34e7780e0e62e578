use colored::Colorize;
use comfy_table::{Cell, Table};

use super::ReportWindow;
use crate::db::load_transactions;
use crate::fmt::money;
use crate::ledger::{compute_ledger, compute_rule_503020};
use crate::settings::load_settings;

pub fn run(window: ReportWindow) -> anyhow::Result<()> {
    let settings = load_settings();
    let (from, to) = window.bounds()?;
    let owner = settings.owner_or_default(window.owner.clone());
    let conn = super::open_db(&settings)?;
    let ledger = compute_ledger(&load_transactions(&conn, &owner, from, to)?);
    let report = compute_rule_503020(&ledger);

    if window.json {
        return super::print_json(&report);
    }

    let sym = settings.currency_symbol.as_str();
    let mut table = Table::new();
    table.set_header(vec!["Bucket", "Target", "Actual", "Gap"]);
    for b in report.buckets() {
        let gap = if b.gap >= 0.0 {
            money(b.gap, sym).green().to_string()
        } else {
            money(b.gap, sym).red().to_string()
        };
        table.add_row(vec![
            Cell::new(format!("{} ({:.0}%)", b.bucket.label(), b.bucket.target_fraction() * 100.0)),
            Cell::new(money(b.target, sym)),
            Cell::new(money(b.actual, sym)),
            Cell::new(gap),
        ]);
    }

    println!("50/30/20 budget for {} ({})\n{table}", owner, window.describe());
    println!("Income: {}", money(report.total_income, sym));
    if report.total_income == 0.0 {
        println!("{}", "No income recorded in this period; every target is zero.".yellow());
    }
    Ok(())
}
