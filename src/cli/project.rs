use comfy_table::{Cell, Table};

use crate::fmt::money;
use crate::projection::{parse_decimal_param, parse_years_param, project_investment, ProjectionScenario};
use crate::settings::load_settings;

pub fn run(initial: &str, monthly: &str, rate: &str, years: &str, json: bool) -> anyhow::Result<()> {
    let scenario = ProjectionScenario::new(
        parse_decimal_param("initial", initial)?,
        parse_decimal_param("monthly", monthly)?,
        parse_decimal_param("rate", rate)?,
        parse_years_param(years)?,
    );
    let result = project_investment(&scenario)?;

    if json {
        return super::print_json(&result);
    }

    let sym = load_settings().currency_symbol;
    let mut table = Table::new();
    table.set_header(vec!["Year", "Balance"]);
    for point in &result.timeline {
        table.add_row(vec![Cell::new(point.year), Cell::new(money(point.balance, &sym))]);
    }

    println!("Investment projection\n{table}");
    println!("Final balance:     {}", money(result.final_balance, &sym));
    println!("Total contributed: {}", money(result.total_contributed, &sym));
    println!("Total growth:      {}", money(result.total_growth, &sym));
    Ok(())
}
