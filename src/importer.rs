use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::categorizer::Categorizer;
use crate::error::{LedgerwiseError, Result};
use crate::models::{RawStatementRecord, Transaction, TransactionType};

pub const PLACEHOLDER_DESCRIPTION: &str = "Imported transaction";

// Posting dates are pinned to midday so a timezone shift can't move them
// across a day boundary.
pub const POSTED_HOUR: u32 = 12;

// ---------------------------------------------------------------------------
// Field normalization
// ---------------------------------------------------------------------------

/// Parse a statement amount. Accepts "1,234.56", "-45.90", "(12.00)", the
/// comma-decimal form "-45,90" and "1.234,56". Separators that could be read
/// either way are rejected rather than guessed.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(['"', '$', ' '], "");
    let val = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        -normalize_separators(inner)?.parse::<f64>().ok()?
    } else {
        normalize_separators(&s)?.parse::<f64>().ok()?
    };
    val.is_finite().then_some(val)
}

/// Rewrite a number with thousands/decimal separators into plain `1234.56` form.
fn normalize_separators(s: &str) -> Option<String> {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');
    match (last_comma, last_dot) {
        (None, _) => Some(s.to_string()),
        // "1,234.56": commas group thousands
        (Some(c), Some(d)) if c < d => {
            grouped_in_thousands(&s[..d], ',').then(|| s.replace(',', ""))
        }
        // "1.234,56": dots group thousands, the comma is the decimal point
        (Some(c), Some(_)) => {
            let (int_part, frac) = (&s[..c], &s[c + 1..]);
            (grouped_in_thousands(int_part, '.') && is_digits(frac))
                .then(|| format!("{}.{frac}", int_part.replace('.', "")))
        }
        (Some(c), None) => {
            let frac = &s[c + 1..];
            if s.matches(',').count() == 1 && (1..=2).contains(&frac.len()) && is_digits(frac) {
                Some(format!("{}.{frac}", &s[..c]))
            } else if grouped_in_thousands(s, ',') {
                Some(s.replace(',', ""))
            } else {
                None
            }
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// "-12,345,678": a 1-3 digit lead group then groups of exactly three.
fn grouped_in_thousands(s: &str, sep: char) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let mut groups = unsigned.split(sep);
    let lead_ok = groups
        .next()
        .is_some_and(|g| is_digits(g) && g.len() <= 3);
    lead_ok && groups.all(|g| g.len() == 3 && is_digits(g))
}

/// The one place a signed statement amount becomes a transaction type.
pub fn type_for_amount(amount: f64) -> TransactionType {
    if amount > 0.0 {
        TransactionType::Income
    } else {
        TransactionType::Expense
    }
}

pub fn normalize_description(memo: Option<&str>, name: Option<&str>) -> String {
    [memo, name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(PLACEHOLDER_DESCRIPTION)
        .to_string()
}

/// Read the leading YYYYMMDD of an OFX date ("20250115", "20250115093000[-3:BRT]").
pub fn parse_posted_date(raw: &str) -> Option<NaiveDateTime> {
    let digits = raw.trim().get(0..8)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let y: i32 = digits[0..4].parse().ok()?;
    let m: u32 = digits[4..6].parse().ok()?;
    let d: u32 = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(POSTED_HOUR, 0, 0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub amount: f64,
    pub kind: TransactionType,
    pub description: String,
    pub date: NaiveDateTime,
}

/// Turn a raw record into validated fields, or say why it can't be.
pub fn normalize_record(raw: &RawStatementRecord) -> std::result::Result<NormalizedRecord, String> {
    let amount_raw = raw.trnamt.as_deref().ok_or("missing TRNAMT")?;
    let amount =
        parse_amount(amount_raw).ok_or_else(|| format!("unreadable TRNAMT '{amount_raw}'"))?;
    let date_raw = raw.dtposted.as_deref().ok_or("missing DTPOSTED")?;
    let date =
        parse_posted_date(date_raw).ok_or_else(|| format!("unreadable DTPOSTED '{date_raw}'"))?;

    Ok(NormalizedRecord {
        amount: amount.abs(),
        kind: type_for_amount(amount),
        description: normalize_description(raw.memo.as_deref(), raw.name.as_deref()),
        date,
    })
}

// ---------------------------------------------------------------------------
// Dedup lookup
// ---------------------------------------------------------------------------

/// Approximate identity of a stored transaction: same owner, same magnitude,
/// same description, same calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupKey {
    pub owner: String,
    pub amount: f64,
    pub description: String,
    pub day_start: NaiveDateTime,
    pub day_end: NaiveDateTime,
}

/// Answers "is this already stored?" for the reconciler. Called once per
/// candidate, in input order.
pub trait ExistingLookup {
    fn exists(&mut self, key: &DedupKey) -> Result<bool>;
}

impl<F> ExistingLookup for F
where
    F: FnMut(&DedupKey) -> Result<bool>,
{
    fn exists(&mut self, key: &DedupKey) -> Result<bool> {
        self(key)
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Accepted(Transaction),
    Duplicate,
    Rejected(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub accepted: Vec<Transaction>,
    pub imported_count: usize,
    pub skipped_count: usize,
    pub rejected_count: usize,
}

impl ImportReport {
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Accepted(txn) => {
                self.accepted.push(txn);
                self.imported_count += 1;
            }
            RecordOutcome::Duplicate => self.skipped_count += 1,
            RecordOutcome::Rejected(_) => self.rejected_count += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    owner: String,
    categorizer: Categorizer,
}

impl Reconciler {
    pub fn new(owner: impl Into<String>, categorizer: Categorizer) -> Self {
        Self {
            owner: owner.into(),
            categorizer,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn dedup_key(&self, record: &NormalizedRecord) -> DedupKey {
        let day = record.date.date();
        DedupKey {
            owner: self.owner.clone(),
            amount: record.amount,
            description: record.description.clone(),
            day_start: day.and_time(chrono::NaiveTime::MIN),
            day_end: day.and_hms_opt(23, 59, 59).unwrap_or(record.date),
        }
    }

    /// Normalize, dedup and classify one record. Persisting an accepted
    /// record is left to the caller.
    pub fn reconcile_record<L>(&self, raw: &RawStatementRecord, lookup: &mut L) -> Result<RecordOutcome>
    where
        L: ExistingLookup + ?Sized,
    {
        let record = match normalize_record(raw) {
            Ok(r) => r,
            Err(reason) => {
                warn!(fitid = raw.fitid.as_deref().unwrap_or(""), reason = reason.as_str(), "rejecting statement record");
                return Ok(RecordOutcome::Rejected(reason));
            }
        };

        if lookup.exists(&self.dedup_key(&record))? {
            debug!(description = record.description.as_str(), amount = record.amount, "duplicate skipped");
            return Ok(RecordOutcome::Duplicate);
        }

        let category = self.categorizer.categorize(&record.description).to_string();
        Ok(RecordOutcome::Accepted(Transaction {
            owner: self.owner.clone(),
            amount: record.amount,
            kind: record.kind,
            category,
            description: record.description,
            date: record.date,
        }))
    }

    pub fn reconcile_import<L>(&self, raw_records: &[RawStatementRecord], lookup: &mut L) -> Result<ImportReport>
    where
        L: ExistingLookup + ?Sized,
    {
        if raw_records.is_empty() {
            return Err(LedgerwiseError::NoTransactionsFound);
        }
        let mut report = ImportReport::default();
        for raw in raw_records {
            report.record(self.reconcile_record(raw, lookup)?);
        }
        debug!(
            imported = report.imported_count,
            skipped = report.skipped_count,
            rejected = report.rejected_count,
            "statement reconciled"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(amount: &str, memo: Option<&str>, name: Option<&str>, date: &str) -> RawStatementRecord {
        RawStatementRecord {
            trnamt: Some(amount.to_string()),
            memo: memo.map(str::to_string),
            name: name.map(str::to_string),
            dtposted: Some(date.to_string()),
            fitid: None,
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new("ana", Categorizer::default())
    }

    fn nothing_stored(_: &DedupKey) -> Result<bool> {
        Ok(false)
    }

    fn key_matches(key: &DedupKey, txn: &Transaction) -> bool {
        txn.owner == key.owner
            && txn.description == key.description
            && (txn.amount - key.amount).abs() < 0.005
            && txn.date >= key.day_start
            && txn.date <= key.day_end
    }

    fn midday(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("-45.90"), Some(-45.9));
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("-45,90"), Some(-45.9));
        assert_eq!(parse_amount("(12.00)"), Some(-12.0));
        assert_eq!(parse_amount(" 300 "), Some(300.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn test_parse_amount_thousands_separators() {
        assert_eq!(parse_amount("1,234"), Some(1234.0));
        assert_eq!(parse_amount("-2,500"), Some(-2500.0));
        assert_eq!(parse_amount("12,345,678.90"), Some(12345678.9));
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("-1.234.567,8"), Some(-1234567.8));
        assert_eq!(parse_amount("(2,500)"), Some(-2500.0));
    }

    #[test]
    fn test_parse_amount_rejects_ambiguous_separators() {
        assert_eq!(parse_amount("1,2345"), None);
        assert_eq!(parse_amount("12,34,56"), None);
        assert_eq!(parse_amount("1,23.45"), None);
        assert_eq!(parse_amount("1.23,45"), None);
        assert_eq!(parse_amount("1,234,5"), None);
    }

    #[test]
    fn test_sign_policy() {
        assert_eq!(type_for_amount(10.0), TransactionType::Income);
        assert_eq!(type_for_amount(-10.0), TransactionType::Expense);
        assert_eq!(type_for_amount(0.0), TransactionType::Expense);
    }

    #[test]
    fn test_description_fallbacks() {
        assert_eq!(normalize_description(Some("memo"), Some("name")), "memo");
        assert_eq!(normalize_description(Some("  "), Some("name")), "name");
        assert_eq!(normalize_description(None, Some(" name ")), "name");
        assert_eq!(normalize_description(None, None), PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn test_parse_posted_date() {
        assert_eq!(parse_posted_date("20250115"), Some(midday(2025, 1, 15)));
        assert_eq!(parse_posted_date("20250115000000[-3:BRT]"), Some(midday(2025, 1, 15)));
        assert_eq!(parse_posted_date("20250231"), None);
        assert_eq!(parse_posted_date("2025-01-15"), None);
        assert_eq!(parse_posted_date("2025"), None);
    }

    #[test]
    fn test_normalize_record_rejects_missing_fields() {
        let mut r = raw("-10.00", Some("X"), None, "20250101");
        r.trnamt = None;
        assert!(normalize_record(&r).is_err());
        let mut r = raw("-10.00", Some("X"), None, "20250101");
        r.dtposted = None;
        assert!(normalize_record(&r).is_err());
    }

    #[test]
    fn test_accepted_record_is_normalized() {
        let mut lookup = nothing_stored;
        let outcome = reconciler()
            .reconcile_record(&raw("-32.50", Some("UBER *TRIP"), Some("UBER"), "20250110"), &mut lookup)
            .unwrap();
        let RecordOutcome::Accepted(txn) = outcome else {
            panic!("expected accepted record");
        };
        assert_eq!(txn.amount, 32.5);
        assert_eq!(txn.kind, TransactionType::Expense);
        assert_eq!(txn.category, "TRANSPORT");
        assert_eq!(txn.owner, "ana");
        assert_eq!(txn.date, midday(2025, 1, 10));
    }

    #[test]
    fn test_categories_from_memo() {
        let mut lookup = nothing_stored;
        let records = vec![
            raw("-20.00", Some("UBER *TRIP"), None, "20250110"),
            raw("-55.00", Some("IFOOD *PIZZARIA"), None, "20250110"),
            raw("-99.00", Some("LOJA QUALQUER"), None, "20250110"),
            raw("3000.00", None, Some("PAGAMENTO SALARIO"), "20250105"),
        ];
        let report = reconciler().reconcile_import(&records, &mut lookup).unwrap();
        let cats: Vec<&str> = report.accepted.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(cats, vec!["TRANSPORT", "FOOD", "OTHER", "SALARY"]);
        assert_eq!(report.accepted[3].kind, TransactionType::Income);
    }

    #[test]
    fn test_reimport_is_skipped() {
        let rec = reconciler();
        let records = vec![raw("-120.00", Some("MERCADO CENTRAL"), None, "20250301")];
        let mut store: Vec<Transaction> = Vec::new();

        let first = {
            let mut lookup = |key: &DedupKey| -> Result<bool> { Ok(store.iter().any(|t| key_matches(key, t))) };
            rec.reconcile_import(&records, &mut lookup).unwrap()
        };
        assert_eq!((first.imported_count, first.skipped_count), (1, 0));
        store.extend(first.accepted);

        let second = {
            let mut lookup = |key: &DedupKey| -> Result<bool> { Ok(store.iter().any(|t| key_matches(key, t))) };
            rec.reconcile_import(&records, &mut lookup).unwrap()
        };
        assert_eq!((second.imported_count, second.skipped_count), (0, 1));
    }

    #[test]
    fn test_same_batch_duplicates_with_persisting_caller() {
        let rec = reconciler();
        let record = raw("-120.00", Some("MERCADO CENTRAL"), None, "20250301");
        let mut store: Vec<Transaction> = Vec::new();
        let mut report = ImportReport::default();
        for r in [&record, &record] {
            let outcome = {
                let mut lookup = |key: &DedupKey| -> Result<bool> { Ok(store.iter().any(|t| key_matches(key, t))) };
                rec.reconcile_record(r, &mut lookup).unwrap()
            };
            if let RecordOutcome::Accepted(txn) = &outcome {
                store.push(txn.clone());
            }
            report.record(outcome);
        }
        assert_eq!(report.imported_count, 1);
        assert_eq!(report.skipped_count, 1);
    }

    #[test]
    fn test_same_description_other_day_not_duplicate() {
        let rec = reconciler();
        let mut store: Vec<Transaction> = Vec::new();
        let first = rec
            .reconcile_import(&[raw("-9.90", Some("SPOTIFY"), None, "20250101")], &mut nothing_stored)
            .unwrap();
        store.extend(first.accepted);
        let mut lookup = |key: &DedupKey| -> Result<bool> { Ok(store.iter().any(|t| key_matches(key, t))) };
        let second = rec
            .reconcile_import(&[raw("-9.90", Some("SPOTIFY"), None, "20250201")], &mut lookup)
            .unwrap();
        assert_eq!(second.imported_count, 1);
    }

    #[test]
    fn test_dedup_key_spans_calendar_day() {
        let rec = reconciler();
        let normalized = normalize_record(&raw("-5.00", Some("CAFE"), None, "20250614")).unwrap();
        let key = rec.dedup_key(&normalized);
        assert_eq!(key.day_start, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap().and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(key.day_end, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap().and_hms_opt(23, 59, 59).unwrap());
        assert_eq!(key.amount, 5.0);
        assert_eq!(key.owner, "ana");
    }

    #[test]
    fn test_unreadable_records_are_rejected_not_fatal() {
        let mut lookup = nothing_stored;
        let records = vec![
            raw("abc", Some("BROKEN"), None, "20250101"),
            raw("-10.00", Some("OK"), None, "not-a-date"),
            raw("-10.00", Some("OK"), None, "20250101"),
        ];
        let report = reconciler().reconcile_import(&records, &mut lookup).unwrap();
        assert_eq!(report.imported_count, 1);
        assert_eq!(report.rejected_count, 2);
        assert_eq!(report.skipped_count, 0);
    }

    #[test]
    fn test_empty_statement_is_no_transactions() {
        let mut lookup = nothing_stored;
        let err = reconciler().reconcile_import(&[], &mut lookup).unwrap_err();
        assert!(matches!(err, LedgerwiseError::NoTransactionsFound));
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let mut lookup = |_: &DedupKey| -> Result<bool> { Err(LedgerwiseError::Parse("lookup down".into())) };
        let result = reconciler().reconcile_import(&[raw("-1.00", Some("X"), None, "20250101")], &mut lookup);
        assert!(result.is_err());
    }
}
