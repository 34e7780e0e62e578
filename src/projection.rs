use serde::Serialize;
use tracing::debug;

use crate::error::{LedgerwiseError, Result};
use crate::ledger::round2;

/// Payoff iteration stops here (100 years) whether or not the balance hit zero.
pub const MAX_PAYOFF_MONTHS: u32 = 1200;

/// Longest horizon a projection accepts, in years.
pub const MAX_PROJECTION_YEARS: u32 = MAX_PAYOFF_MONTHS / 12;

// ---------------------------------------------------------------------------
// Parameter parsing
// ---------------------------------------------------------------------------

/// Parse a user-supplied decimal parameter ("1500", "$1,500.00").
pub fn parse_decimal_param(name: &str, raw: &str) -> Result<f64> {
    let s = raw.trim().replace([',', '$', ' '], "");
    let val: f64 = s
        .parse()
        .map_err(|_| LedgerwiseError::InvalidInput(format!("{name} must be a number, got '{raw}'")))?;
    if !val.is_finite() {
        return Err(LedgerwiseError::InvalidInput(format!(
            "{name} must be a finite number, got '{raw}'"
        )));
    }
    Ok(val)
}

pub fn parse_years_param(raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|_| {
        LedgerwiseError::InvalidInput(format!(
            "years must be a whole number of years (0 or more), got '{raw}'"
        ))
    })
}

fn require_finite(name: &str, val: f64) -> Result<()> {
    if val.is_finite() {
        Ok(())
    } else {
        Err(LedgerwiseError::InvalidInput(format!("{name} must be a finite number")))
    }
}

// ---------------------------------------------------------------------------
// Investment projection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionScenario {
    pub initial_balance: f64,
    pub monthly_contribution: f64,
    /// Percent per year, e.g. 12.0 for 12%.
    pub annual_return_rate: f64,
    pub years: u32,
}

impl ProjectionScenario {
    pub fn new(initial_balance: f64, monthly_contribution: f64, annual_return_rate: f64, years: u32) -> Self {
        Self {
            initial_balance,
            monthly_contribution,
            annual_return_rate,
            years,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_finite("initial balance", self.initial_balance)?;
        require_finite("monthly contribution", self.monthly_contribution)?;
        require_finite("annual return rate", self.annual_return_rate)?;
        if self.annual_return_rate < -100.0 {
            return Err(LedgerwiseError::InvalidInput(format!(
                "annual return rate cannot be below -100%, got {}%",
                self.annual_return_rate
            )));
        }
        if self.years > MAX_PROJECTION_YEARS {
            return Err(LedgerwiseError::InvalidInput(format!(
                "years cannot exceed {MAX_PROJECTION_YEARS}, got {}",
                self.years
            )));
        }
        Ok(())
    }

    /// Geometric monthly rate equivalent to the annual rate.
    pub fn monthly_rate(&self) -> f64 {
        (1.0 + self.annual_return_rate / 100.0).powf(1.0 / 12.0) - 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub year: u32,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub final_balance: f64,
    pub timeline: Vec<TimelinePoint>,
    pub total_contributed: f64,
    pub total_growth: f64,
}

pub fn project_investment(scenario: &ProjectionScenario) -> Result<ProjectionResult> {
    scenario.validate()?;

    let monthly_rate = scenario.monthly_rate();
    let months = scenario
        .years
        .checked_mul(12)
        .ok_or_else(|| LedgerwiseError::InvalidInput(format!("{} years is too long", scenario.years)))?;
    let mut balance = scenario.initial_balance;
    let mut timeline = Vec::with_capacity(scenario.years as usize);

    for month in 1..=months {
        balance = (balance + scenario.monthly_contribution) * (1.0 + monthly_rate);
        if month % 12 == 0 {
            timeline.push(TimelinePoint {
                year: month / 12,
                balance: balance.round(),
            });
        }
    }

    let final_balance = balance.round();
    if !final_balance.is_finite() {
        return Err(LedgerwiseError::InvalidInput(
            "projected balance is too large to represent; lower the rate or the horizon".into(),
        ));
    }
    let total_contributed =
        round2(scenario.initial_balance + scenario.monthly_contribution * f64::from(months));
    debug!(
        years = scenario.years,
        monthly_rate, final_balance, "investment projection computed"
    );

    Ok(ProjectionResult {
        final_balance,
        timeline,
        total_contributed,
        total_growth: round2(final_balance - total_contributed),
    })
}

// ---------------------------------------------------------------------------
// Debt payoff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebtPayoffScenario {
    pub total_debt: f64,
    pub monthly_payment: f64,
    /// Percent per month, e.g. 2.0 for 2%.
    pub monthly_interest_rate: f64,
}

impl DebtPayoffScenario {
    pub fn new(total_debt: f64, monthly_payment: f64, monthly_interest_rate: f64) -> Self {
        Self {
            total_debt,
            monthly_payment,
            monthly_interest_rate,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_finite("total debt", self.total_debt)?;
        require_finite("monthly payment", self.monthly_payment)?;
        require_finite("monthly interest rate", self.monthly_interest_rate)?;
        if self.total_debt <= 0.0 {
            return Err(LedgerwiseError::InvalidInput("total debt must be greater than zero".into()));
        }
        if self.monthly_payment <= 0.0 {
            return Err(LedgerwiseError::InvalidInput(
                "monthly payment must be greater than zero".into(),
            ));
        }
        if self.monthly_interest_rate < 0.0 {
            return Err(LedgerwiseError::InvalidInput(
                "monthly interest rate cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoffResult {
    pub months: u32,
    pub total_paid: f64,
    pub total_interest: f64,
    pub schedule: Vec<AmortizationRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PayoffOutcome {
    PaidOff(PayoffResult),
    /// The payment never covers the first month's interest.
    Unpayable {
        monthly_payment: f64,
        first_month_interest: f64,
    },
    /// Still owing after `MAX_PAYOFF_MONTHS`; figures are as of the cap.
    Capped {
        months: u32,
        total_paid: f64,
        remaining_balance: f64,
    },
}

pub fn calculate_debt_payoff(scenario: &DebtPayoffScenario) -> Result<PayoffOutcome> {
    scenario.validate()?;

    let rate = scenario.monthly_interest_rate / 100.0;
    let first_month_interest = scenario.total_debt * rate;
    if scenario.monthly_payment <= first_month_interest {
        debug!(
            payment = scenario.monthly_payment,
            first_month_interest, "payment does not cover interest"
        );
        return Ok(PayoffOutcome::Unpayable {
            monthly_payment: scenario.monthly_payment,
            first_month_interest: round2(first_month_interest),
        });
    }

    let mut balance = scenario.total_debt;
    let mut total_paid = 0.0;
    let mut months = 0u32;
    let mut schedule = Vec::new();

    while balance > 0.0 {
        if months >= MAX_PAYOFF_MONTHS {
            debug!(months, balance, "payoff capped");
            return Ok(PayoffOutcome::Capped {
                months,
                total_paid: round2(total_paid),
                remaining_balance: round2(balance),
            });
        }
        months += 1;

        let interest = balance * rate;
        let mut principal = scenario.monthly_payment - interest;
        let payment = if principal >= balance {
            // final period settles the remainder exactly
            principal = balance;
            balance = 0.0;
            principal + interest
        } else {
            balance -= principal;
            scenario.monthly_payment
        };
        total_paid += payment;

        schedule.push(AmortizationRow {
            month: months,
            payment: round2(payment),
            interest: round2(interest),
            principal: round2(principal),
            balance: round2(balance),
        });
    }

    Ok(PayoffOutcome::PaidOff(PayoffResult {
        months,
        total_paid: round2(total_paid),
        total_interest: round2(total_paid - scenario.total_debt),
        schedule,
    }))
}
