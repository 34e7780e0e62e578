use colored::Colorize;
use comfy_table::{Cell, Table};

use super::ReportWindow;
use crate::db::load_transactions;
use crate::fmt::{money, pct};
use crate::ledger::compute_ledger;
use crate::settings::load_settings;

pub fn run(window: ReportWindow) -> anyhow::Result<()> {
    let settings = load_settings();
    let (from, to) = window.bounds()?;
    let owner = settings.owner_or_default(window.owner.clone());
    let conn = super::open_db(&settings)?;
    let transactions = load_transactions(&conn, &owner, from, to)?;
    let result = compute_ledger(&transactions);

    if window.json {
        return super::print_json(&result);
    }

    let sym = settings.currency_symbol.as_str();
    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "% of Expenses"]);
    for (category, total) in result.top_categories() {
        let share = if result.total_expense > 0.0 {
            total / result.total_expense * 100.0
        } else {
            0.0
        };
        table.add_row(vec![
            Cell::new(category),
            Cell::new(money(total, sym)),
            Cell::new(format!("{share:.1}%")),
        ]);
    }
    table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new("")]);
    table.add_row(vec![
        Cell::new("Total Income".green().bold()),
        Cell::new(money(result.total_income, sym)),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Total Expenses".red().bold()),
        Cell::new(money(result.total_expense, sym)),
        Cell::new(""),
    ]);
    let balance_label = if result.balance >= 0.0 {
        "BALANCE".green().bold()
    } else {
        "BALANCE".red().bold()
    };
    table.add_row(vec![
        Cell::new(balance_label),
        Cell::new(money(result.balance, sym)),
        Cell::new(""),
    ]);

    println!("Ledger for {} ({})\n{table}", owner, window.describe());
    println!(
        "Savings rate: {}   Transactions: {}",
        pct(result.savings_rate),
        result.transaction_count
    );
    Ok(())
}
