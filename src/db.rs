use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{LedgerwiseError, Result};
use crate::importer::{DedupKey, ImportReport, Reconciler, RecordOutcome};
use crate::models::{RawStatementRecord, Transaction, TransactionType};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    owner TEXT NOT NULL,
    checksum TEXT NOT NULL,
    record_count INTEGER NOT NULL DEFAULT 0,
    imported_count INTEGER NOT NULL DEFAULT 0,
    skipped_count INTEGER NOT NULL DEFAULT 0,
    rejected_count INTEGER NOT NULL DEFAULT 0,
    import_date TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    owner TEXT NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount >= 0),
    kind TEXT NOT NULL CHECK (kind IN ('INCOME', 'EXPENSE')),
    category TEXT NOT NULL DEFAULT 'OTHER',
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_owner_date ON transactions (owner, date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Lookup backing the reconciler's duplicate check.
pub fn transaction_exists(conn: &Connection, key: &DedupKey) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions \
         WHERE owner = ?1 AND description = ?2 AND ABS(amount - ?3) < 0.005 \
         AND date BETWEEN ?4 AND ?5",
    )?;
    Ok(stmt.exists(rusqlite::params![
        key.owner,
        key.description,
        key.amount,
        key.day_start,
        key.day_end
    ])?)
}

pub fn insert_transaction(conn: &Connection, txn: &Transaction, import_id: Option<i64>) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (owner, date, description, amount, kind, category, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            txn.owner,
            txn.date,
            txn.description,
            txn.amount.abs(),
            txn.kind.key(),
            txn.category,
            import_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Everything `owner` recorded between `from` and `to`, both days inclusive.
pub fn load_transactions(
    conn: &Connection,
    owner: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<Transaction>> {
    // Stored dates compare as text, so open bounds must stay four-digit years.
    let earliest = NaiveDate::from_ymd_opt(1, 1, 1);
    let latest = NaiveDate::from_ymd_opt(9999, 12, 31);
    let start: NaiveDateTime = from
        .or(earliest)
        .map(|d| d.and_time(NaiveTime::MIN))
        .ok_or_else(|| LedgerwiseError::InvalidInput("start date out of range".into()))?;
    let end: NaiveDateTime = to
        .or(latest)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .ok_or_else(|| LedgerwiseError::InvalidInput("end date out of range".into()))?;

    let mut stmt = conn.prepare(
        "SELECT owner, amount, kind, category, description, date FROM transactions \
         WHERE owner = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date, id",
    )?;
    let rows = stmt.query_map(rusqlite::params![owner, start, end], |row| {
        let kind: String = row.get(2)?;
        let kind = TransactionType::parse(&kind)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
        Ok(Transaction {
            owner: row.get(0)?,
            amount: row.get(1)?,
            kind,
            category: row.get(3)?,
            description: row.get(4)?,
            date: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Statement import
// ---------------------------------------------------------------------------

pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

pub struct ImportResult {
    pub report: ImportReport,
    pub duplicate_file: bool,
}

/// Reconcile `records` against what `reconciler.owner()` already has stored,
/// writing each accepted record before the next one is checked.
pub fn import_statement(
    conn: &mut Connection,
    filename: &str,
    checksum: &str,
    reconciler: &Reconciler,
    records: &[RawStatementRecord],
) -> Result<ImportResult> {
    let owner = reconciler.owner();
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND owner = ?2")?;
        if stmt.exists(rusqlite::params![checksum, owner])? {
            info!(filename, "statement already imported");
            return Ok(ImportResult {
                report: ImportReport::default(),
                duplicate_file: true,
            });
        }
    }
    if records.is_empty() {
        return Err(LedgerwiseError::NoTransactionsFound);
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO imports (filename, owner, checksum, record_count) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![filename, owner, checksum, records.len() as i64],
    )?;
    let import_id = tx.last_insert_rowid();

    let mut report = ImportReport::default();
    for raw in records {
        let outcome = reconciler.reconcile_record(raw, &mut |key: &DedupKey| transaction_exists(&tx, key))?;
        if let RecordOutcome::Accepted(txn) = &outcome {
            insert_transaction(&tx, txn, Some(import_id))?;
        }
        report.record(outcome);
    }

    tx.execute(
        "UPDATE imports SET imported_count = ?1, skipped_count = ?2, rejected_count = ?3 WHERE id = ?4",
        rusqlite::params![
            report.imported_count as i64,
            report.skipped_count as i64,
            report.rejected_count as i64,
            import_id
        ],
    )?;
    tx.commit()?;
    debug!(import_id, imported = report.imported_count, "import committed");

    Ok(ImportResult {
        report,
        duplicate_file: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::Categorizer;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn raw(amount: &str, memo: &str, date: &str) -> RawStatementRecord {
        RawStatementRecord {
            trnamt: Some(amount.to_string()),
            memo: Some(memo.to_string()),
            dtposted: Some(date.to_string()),
            ..Default::default()
        }
    }

    fn txn(owner: &str, amount: f64, kind: TransactionType, desc: &str, day: u32) -> Transaction {
        Transaction {
            owner: owner.to_string(),
            amount,
            kind,
            category: "OTHER".to_string(),
            description: desc.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap().and_hms_opt(12, 0, 0).unwrap(),
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["transactions", "imports"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_insert_and_load_roundtrip() {
        let (_dir, conn) = test_db();
        let t = txn("ana", 42.5, TransactionType::Expense, "PADARIA", 3);
        insert_transaction(&conn, &t, None).unwrap();
        let loaded = load_transactions(&conn, "ana", None, None).unwrap();
        assert_eq!(loaded, vec![t]);
    }

    #[test]
    fn test_load_filters_owner_and_window() {
        let (_dir, conn) = test_db();
        insert_transaction(&conn, &txn("ana", 10.0, TransactionType::Expense, "A", 1), None).unwrap();
        insert_transaction(&conn, &txn("ana", 20.0, TransactionType::Expense, "B", 15), None).unwrap();
        insert_transaction(&conn, &txn("ana", 30.0, TransactionType::Income, "C", 31), None).unwrap();
        insert_transaction(&conn, &txn("bia", 40.0, TransactionType::Expense, "D", 15), None).unwrap();

        let from = NaiveDate::from_ymd_opt(2025, 1, 15);
        let to = NaiveDate::from_ymd_opt(2025, 1, 31);
        let loaded = load_transactions(&conn, "ana", from, to).unwrap();
        let descs: Vec<&str> = loaded.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["B", "C"]);
        assert_eq!(load_transactions(&conn, "bia", None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_transaction_exists_matches_same_day() {
        let (_dir, conn) = test_db();
        insert_transaction(&conn, &txn("ana", 9.9, TransactionType::Expense, "SPOTIFY", 5), None).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let mut key = DedupKey {
            owner: "ana".to_string(),
            amount: 9.9,
            description: "SPOTIFY".to_string(),
            day_start: day.and_time(NaiveTime::MIN),
            day_end: day.and_hms_opt(23, 59, 59).unwrap(),
        };
        assert!(transaction_exists(&conn, &key).unwrap());
        key.owner = "bia".to_string();
        assert!(!transaction_exists(&conn, &key).unwrap());
        key.owner = "ana".to_string();
        key.description = "spotify".to_string();
        assert!(!transaction_exists(&conn, &key).unwrap());
    }

    #[test]
    fn test_import_statement_inserts_and_dedups() {
        let (_dir, mut conn) = test_db();
        let rec = Reconciler::new("ana", Categorizer::default());
        let records = vec![
            raw("-32.50", "UBER *TRIP", "20250110"),
            raw("-32.50", "UBER *TRIP", "20250110"),
            raw("3000.00", "SALARIO", "20250105"),
        ];
        let result = import_statement(&mut conn, "jan.ofx", "abc", &rec, &records).unwrap();
        assert!(!result.duplicate_file);
        assert_eq!(result.report.imported_count, 2);
        assert_eq!(result.report.skipped_count, 1);
        assert_eq!(count(&conn, "transactions"), 2);

        let skipped: i64 = conn
            .query_row("SELECT skipped_count FROM imports LIMIT 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_import_statement_overlapping_files() {
        let (_dir, mut conn) = test_db();
        let rec = Reconciler::new("ana", Categorizer::default());
        let first = vec![raw("-100.00", "ALUGUEL", "20250101"), raw("-50.00", "MERCADO", "20250102")];
        import_statement(&mut conn, "a.ofx", "sum-a", &rec, &first).unwrap();
        let second = vec![raw("-50.00", "MERCADO", "20250102"), raw("-70.00", "FARMACIA", "20250103")];
        let result = import_statement(&mut conn, "b.ofx", "sum-b", &rec, &second).unwrap();
        assert_eq!(result.report.imported_count, 1);
        assert_eq!(result.report.skipped_count, 1);
        assert_eq!(count(&conn, "transactions"), 3);
    }

    #[test]
    fn test_import_statement_detects_duplicate_file() {
        let (_dir, mut conn) = test_db();
        let rec = Reconciler::new("ana", Categorizer::default());
        let records = vec![raw("-10.00", "PADARIA", "20250110")];
        import_statement(&mut conn, "jan.ofx", "same", &rec, &records).unwrap();
        let again = import_statement(&mut conn, "jan.ofx", "same", &rec, &records).unwrap();
        assert!(again.duplicate_file);
        assert_eq!(count(&conn, "transactions"), 1);
        assert_eq!(count(&conn, "imports"), 1);
    }

    #[test]
    fn test_import_statement_empty_records() {
        let (_dir, mut conn) = test_db();
        let rec = Reconciler::new("ana", Categorizer::default());
        let err = import_statement(&mut conn, "empty.ofx", "x", &rec, &[]).err().unwrap();
        assert!(matches!(err, LedgerwiseError::NoTransactionsFound));
        assert_eq!(count(&conn, "imports"), 0);
    }

    #[test]
    fn test_compute_checksum() {
        assert_eq!(
            compute_checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
