use chrono::Local;

use crate::categorizer::DEFAULT_CATEGORY;
use crate::db::insert_transaction;
use crate::error::LedgerwiseError;
use crate::fmt::money;
use crate::importer::POSTED_HOUR;
use crate::models::{Transaction, TransactionType};
use crate::projection::parse_decimal_param;
use crate::settings::load_settings;

pub struct AddArgs {
    pub amount: String,
    pub kind: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub owner: Option<String>,
}

pub fn run(args: AddArgs) -> anyhow::Result<()> {
    let settings = load_settings();
    let amount = parse_decimal_param("amount", &args.amount)?;
    if amount <= 0.0 {
        return Err(LedgerwiseError::InvalidInput("amount must be greater than zero".into()).into());
    }
    let kind = TransactionType::parse(&args.kind)?;
    let day = match &args.date {
        Some(raw) => super::parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let date = day
        .and_hms_opt(POSTED_HOUR, 0, 0)
        .ok_or_else(|| LedgerwiseError::InvalidInput(format!("invalid date {day}")))?;

    let description = args
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    let category = match (args.category, &description) {
        (Some(c), _) if !c.trim().is_empty() => c.trim().to_uppercase(),
        (_, Some(d)) => settings.categorizer()?.categorize(d).to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    };

    let txn = Transaction {
        owner: settings.owner_or_default(args.owner),
        amount,
        kind,
        description: description.unwrap_or_else(|| category.clone()),
        category,
        date,
    };

    let conn = super::open_db(&settings)?;
    let id = insert_transaction(&conn, &txn, None)?;
    println!(
        "Added #{id}: {} {} {} ({}) on {}",
        txn.kind.key(),
        money(txn.amount, &settings.currency_symbol),
        txn.description,
        txn.category,
        day
    );
    Ok(())
}
