pub mod add;
pub mod budget;
pub mod import;
pub mod init;
pub mod ledger;
pub mod payoff;
pub mod project;
pub mod status;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "ledgerwise", about = "Household ledger, budgets, projections and bank statement import.")]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings and create the database.
    Init {
        /// Path for ledgerwise data (default: ~/Documents/ledgerwise)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Default owner for imports and reports
        #[arg(long)]
        owner: Option<String>,
        /// Currency symbol used in reports, e.g. 'R$'
        #[arg(long)]
        currency: Option<String>,
    },
    /// Import an OFX statement (or its JSON tree), skipping transactions already stored.
    Import {
        /// Path to the .ofx/.qfx/.json statement
        file: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Record a single transaction by hand.
    Add {
        /// Amount (always positive; use --type for direction)
        amount: String,
        /// income or expense
        #[arg(long = "type", default_value = "expense")]
        kind: String,
        /// Category; inferred from the description when omitted
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Income, expenses, balance, savings rate and spending by category.
    Ledger {
        #[command(flatten)]
        window: ReportWindow,
    },
    /// Compare spending against the 50/30/20 rule.
    Budget {
        #[command(flatten)]
        window: ReportWindow,
    },
    /// Project an investment with monthly contributions and compounding.
    Project {
        /// Starting balance
        #[arg(long, allow_hyphen_values = true)]
        initial: String,
        /// Contribution added every month
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        monthly: String,
        /// Annual return in percent (may be negative)
        #[arg(long, allow_hyphen_values = true)]
        rate: String,
        /// Horizon in whole years
        #[arg(long)]
        years: String,
        #[arg(long)]
        json: bool,
    },
    /// Work out how long a fixed monthly payment takes to clear a debt.
    Payoff {
        /// Outstanding balance
        #[arg(long, allow_hyphen_values = true)]
        debt: String,
        /// Fixed monthly payment
        #[arg(long, allow_hyphen_values = true)]
        payment: String,
        /// Monthly interest in percent
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        rate: String,
        /// Print the month-by-month amortization schedule
        #[arg(long)]
        schedule: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show settings, database location and record counts.
    Status,
}

#[derive(Args, Clone, Default)]
pub struct ReportWindow {
    #[arg(long)]
    pub owner: Option<String>,
    /// Month: YYYY-MM
    #[arg(long)]
    pub month: Option<String>,
    /// Start date: YYYY-MM-DD (requires --to)
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End date: YYYY-MM-DD (requires --from)
    #[arg(long = "to")]
    pub to_date: Option<String>,
    #[arg(long)]
    pub json: bool,
}

pub(crate) fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn month_bounds(month: &str) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .with_context(|| format!("invalid month '{month}', expected YYYY-MM"))?;
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .context("month out of range")?;
    Ok((first, next.pred_opt().context("month out of range")?))
}

impl ReportWindow {
    /// Inclusive date bounds for the report; `None` means open-ended.
    pub fn bounds(&self) -> anyhow::Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        match (&self.month, &self.from_date, &self.to_date) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                bail!("--month cannot be combined with --from/--to")
            }
            (Some(m), None, None) => {
                let (first, last) = month_bounds(m)?;
                Ok((Some(first), Some(last)))
            }
            (None, Some(from), Some(to)) => {
                let (from, to) = (parse_date(from)?, parse_date(to)?);
                if from > to {
                    bail!("--from must not be after --to");
                }
                Ok((Some(from), Some(to)))
            }
            (None, Some(_), None) => {
                bail!("--from requires --to (both date boundaries must be specified)")
            }
            (None, None, Some(_)) => {
                bail!("--to requires --from (both date boundaries must be specified)")
            }
            (None, None, None) => Ok((None, None)),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.month, &self.from_date, &self.to_date) {
            (Some(m), _, _) => m.clone(),
            (None, Some(from), Some(to)) => format!("{from} to {to}"),
            _ => "all time".to_string(),
        }
    }
}

/// Open the database, creating the data directory and schema on first use.
pub(crate) fn open_db(settings: &Settings) -> anyhow::Result<Connection> {
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    Ok(conn)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(month: Option<&str>, from: Option<&str>, to: Option<&str>) -> ReportWindow {
        ReportWindow {
            month: month.map(str::to_string),
            from_date: from.map(str::to_string),
            to_date: to.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_payoff_accepts_leading_hyphen_values() {
        let cli = Cli::try_parse_from(["ledgerwise", "payoff", "--debt", "-5", "--payment", "-1", "--rate", "-2"]).unwrap();
        match cli.command {
            Commands::Payoff { debt, payment, rate, .. } => {
                assert_eq!((debt.as_str(), payment.as_str(), rate.as_str()), ("-5", "-1", "-2"));
            }
            _ => panic!("expected payoff command"),
        }
    }

    #[test]
    fn test_month_window() {
        let (from, to) = window(Some("2024-02"), None, None).bounds().unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn test_range_window() {
        let (from, to) = window(None, Some("2025-01-10"), Some("2025-03-01")).bounds().unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 1, 10));
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_open_window() {
        assert_eq!(window(None, None, None).bounds().unwrap(), (None, None));
    }

    #[test]
    fn test_window_errors() {
        assert!(window(None, Some("2025-01-01"), None).bounds().is_err());
        assert!(window(None, None, Some("2025-01-01")).bounds().is_err());
        assert!(window(Some("2025-01"), Some("2025-01-01"), None).bounds().is_err());
        assert!(window(Some("2025-13"), None, None).bounds().is_err());
        assert!(window(None, Some("2025-02-01"), Some("2025-01-01")).bounds().is_err());
    }
}
