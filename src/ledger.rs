use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Transaction, TransactionType};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

// Sums are carried in integer cents so that category totals add up to the
// expense total exactly.
pub(crate) fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub(crate) fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

pub fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerResult {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub savings_rate: f64,
    pub category_totals: BTreeMap<String, f64>,
    pub transaction_count: usize,
}

impl LedgerResult {
    /// Expense categories, largest first. Ties keep alphabetical order.
    pub fn top_categories(&self) -> Vec<(&str, f64)> {
        let mut items: Vec<(&str, f64)> = self
            .category_totals
            .iter()
            .map(|(name, total)| (name.as_str(), *total))
            .collect();
        items.sort_by(|a, b| b.1.total_cmp(&a.1));
        items
    }
}

/// Aggregate whatever transactions the caller hands over. Owner and date
/// filtering happen before this point.
pub fn compute_ledger(transactions: &[Transaction]) -> LedgerResult {
    let mut income_cents = 0i64;
    let mut expense_cents = 0i64;
    let mut by_category: BTreeMap<String, i64> = BTreeMap::new();

    for txn in transactions {
        let cents = to_cents(txn.amount.abs());
        match txn.kind {
            TransactionType::Income => income_cents += cents,
            TransactionType::Expense => {
                expense_cents += cents;
                *by_category.entry(txn.category.clone()).or_default() += cents;
            }
        }
    }

    let total_income = from_cents(income_cents);
    let balance = from_cents(income_cents - expense_cents);
    let savings_rate = if income_cents == 0 {
        0.0
    } else {
        round2(balance / total_income * 100.0)
    };

    LedgerResult {
        total_income,
        total_expense: from_cents(expense_cents),
        balance,
        savings_rate,
        category_totals: by_category
            .into_iter()
            .map(|(name, cents)| (name, from_cents(cents)))
            .collect(),
        transaction_count: transactions.len(),
    }
}

// ---------------------------------------------------------------------------
// 50/30/20 rule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Needs,
    Wants,
    Savings,
}

impl Bucket {
    pub fn target_fraction(&self) -> f64 {
        match self {
            Self::Needs => 0.50,
            Self::Wants => 0.30,
            Self::Savings => 0.20,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Needs => "Needs",
            Self::Wants => "Wants",
            Self::Savings => "Savings",
        }
    }
}

const BUCKET_TABLE: &[(&str, Bucket)] = &[
    ("HOUSING", Bucket::Needs),
    ("RENT", Bucket::Needs),
    ("UTILITIES", Bucket::Needs),
    ("BILLS", Bucket::Needs),
    ("FOOD", Bucket::Needs),
    ("GROCERIES", Bucket::Needs),
    ("TRANSPORT", Bucket::Needs),
    ("HEALTH", Bucket::Needs),
    ("EDUCATION", Bucket::Needs),
    ("INSURANCE", Bucket::Needs),
    ("ENTERTAINMENT", Bucket::Wants),
    ("LEISURE", Bucket::Wants),
    ("SHOPPING", Bucket::Wants),
    ("SUBSCRIPTIONS", Bucket::Wants),
    ("TRAVEL", Bucket::Wants),
    ("RESTAURANTS", Bucket::Wants),
    ("PERSONAL", Bucket::Wants),
];

// Unmapped categories, "OTHER" included, land here alongside real savings.
const FALLBACK_BUCKET: Bucket = Bucket::Savings;

pub fn bucket_for(category: &str) -> Bucket {
    let category = category.trim();
    BUCKET_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, bucket)| *bucket)
        .unwrap_or(FALLBACK_BUCKET)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketReport {
    pub bucket: Bucket,
    pub target: f64,
    pub actual: f64,
    /// Positive: room left under target. Negative: overspent.
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule503020Result {
    pub total_income: f64,
    pub needs: BucketReport,
    pub wants: BucketReport,
    pub savings: BucketReport,
}

impl Rule503020Result {
    pub fn buckets(&self) -> [&BucketReport; 3] {
        [&self.needs, &self.wants, &self.savings]
    }
}

pub fn compute_rule_503020(ledger: &LedgerResult) -> Rule503020Result {
    let mut actual_cents = [0i64; 3];
    for (category, total) in &ledger.category_totals {
        let idx = match bucket_for(category) {
            Bucket::Needs => 0,
            Bucket::Wants => 1,
            Bucket::Savings => 2,
        };
        actual_cents[idx] += to_cents(*total);
    }

    let report = |bucket: Bucket, cents: i64| {
        let target = round2(ledger.total_income * bucket.target_fraction());
        let actual = from_cents(cents);
        BucketReport {
            bucket,
            target,
            actual,
            gap: round2(target - actual),
        }
    };

    Rule503020Result {
        total_income: ledger.total_income,
        needs: report(Bucket::Needs, actual_cents[0]),
        wants: report(Bucket::Wants, actual_cents[1]),
        savings: report(Bucket::Savings, actual_cents[2]),
    }
}
