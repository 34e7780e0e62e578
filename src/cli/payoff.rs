use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::fmt::money;
use crate::projection::{calculate_debt_payoff, parse_decimal_param, DebtPayoffScenario, PayoffOutcome};
use crate::settings::load_settings;

pub fn run(debt: &str, payment: &str, rate: &str, schedule: bool, json: bool) -> anyhow::Result<()> {
    let scenario = DebtPayoffScenario::new(
        parse_decimal_param("debt", debt)?,
        parse_decimal_param("payment", payment)?,
        parse_decimal_param("rate", rate)?,
    );
    let outcome = calculate_debt_payoff(&scenario)?;

    if json {
        return super::print_json(&outcome);
    }

    let sym = load_settings().currency_symbol;
    match outcome {
        PayoffOutcome::PaidOff(result) => {
            if schedule {
                let mut table = Table::new();
                table.set_header(vec!["Month", "Payment", "Interest", "Principal", "Balance"]);
                for row in &result.schedule {
                    table.add_row(vec![
                        Cell::new(row.month),
                        Cell::new(money(row.payment, &sym)),
                        Cell::new(money(row.interest, &sym)),
                        Cell::new(money(row.principal, &sym)),
                        Cell::new(money(row.balance, &sym)),
                    ]);
                }
                println!("Amortization schedule\n{table}");
            }
            println!(
                "{} in {} months ({} years, {} months)",
                "Paid off".green().bold(),
                result.months,
                result.months / 12,
                result.months % 12
            );
            println!("Total paid:     {}", money(result.total_paid, &sym));
            println!("Total interest: {}", money(result.total_interest, &sym));
        }
        PayoffOutcome::Unpayable {
            monthly_payment,
            first_month_interest,
        } => {
            println!("{}", "This debt will never be paid off.".red().bold());
            println!(
                "A payment of {} does not cover the first month's interest of {}.",
                money(monthly_payment, &sym),
                money(first_month_interest, &sym)
            );
        }
        PayoffOutcome::Capped {
            months,
            total_paid,
            remaining_balance,
        } => {
            println!("{}", format!("Not paid off within {months} months.").yellow().bold());
            println!("Total paid:        {}", money(total_paid, &sym));
            println!("Remaining balance: {}", money(remaining_balance, &sym));
        }
    }
    Ok(())
}
