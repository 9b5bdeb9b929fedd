// 🗄️ Transaction Store - SQLite persistence and CSV import
// Owns every mutation; the search engine only gets read-only slices.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::transaction::{Category, Transaction};

const SELECT_COLUMNS: &str =
    "tx_uuid, description, amount, category, date, created_at, updated_at";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // row_id keeps insertion order; tx_uuid is the identity
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_uuid TEXT UNIQUE NOT NULL,
            import_hash TEXT NOT NULL,
            description TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            category TEXT NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_import_hash ON transactions(import_hash)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_date ON transactions(date)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CSV IMPORT
// ============================================================================

#[derive(Debug, Deserialize)]
struct CsvRow {
    description: String,
    amount: f64,
    category: String,
    date: String,
}

/// Read `description,amount,category,date` rows into new transactions
pub fn load_csv(csv_path: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut transactions = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row: CsvRow =
            result.with_context(|| format!("Failed to deserialize CSV line {}", line))?;

        let category: Category = row
            .category
            .parse()
            .with_context(|| format!("Invalid category on CSV line {}", line))?;

        let transaction = Transaction::new(&row.description, row.amount, category, &row.date)
            .with_context(|| format!("Invalid transaction on CSV line {}", line))?;

        transactions.push(transaction);
    }

    Ok(transactions)
}

// ============================================================================
// WRITES
// ============================================================================

pub fn insert_transaction(conn: &Connection, tx: &Transaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (
            tx_uuid, import_hash, description, amount, category, date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            tx.id,
            tx.import_hash(),
            tx.description,
            tx.amount,
            tx.category.as_str(),
            tx.date,
            tx.created_at.to_rfc3339(),
            tx.updated_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to insert transaction {}", tx.id))?;

    Ok(())
}

/// Insert a batch, skipping rows whose import hash is already stored.
/// Importing the same file twice adds nothing the second time.
pub fn insert_transactions(conn: &Connection, transactions: &[Transaction]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for tx in transactions {
        let hash = tx.import_hash();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE import_hash = ?1)",
            params![hash],
            |row| row.get(0),
        )?;

        if exists {
            debug!(id = %tx.id, "Skipping duplicate transaction");
            duplicates += 1;
            continue;
        }

        insert_transaction(conn, tx)?;
        inserted += 1;
    }

    info!(inserted, duplicates, "Transactions imported");

    Ok(inserted)
}

/// Store edited fields; returns false when the id is unknown
pub fn update_transaction(conn: &Connection, tx: &Transaction) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE transactions
         SET import_hash = ?2, description = ?3, amount = ?4, category = ?5,
             date = ?6, updated_at = ?7
         WHERE tx_uuid = ?1",
        params![
            tx.id,
            tx.import_hash(),
            tx.description,
            tx.amount,
            tx.category.as_str(),
            tx.date,
            tx.updated_at.to_rfc3339(),
        ],
    )?;

    Ok(changed > 0)
}

/// Returns false when the id is unknown
pub fn delete_transaction(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM transactions WHERE tx_uuid = ?1", params![id])?;
    Ok(changed > 0)
}

// ============================================================================
// READS
// ============================================================================

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, err.into())
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let category: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        category: category
            .parse::<Category>()
            .map_err(|e| conversion_error(3, e))?,
        date: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}

/// Every transaction, oldest insert first
pub fn get_all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions ORDER BY row_id ASC",
        SELECT_COLUMNS
    ))?;

    let transactions = stmt
        .query_map([], row_to_transaction)?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read transactions")?;

    Ok(transactions)
}

pub fn get_transaction(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    let transaction = conn
        .query_row(
            &format!("SELECT {} FROM transactions WHERE tx_uuid = ?1", SELECT_COLUMNS),
            params![id],
            row_to_transaction,
        )
        .optional()?;

    Ok(transaction)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
