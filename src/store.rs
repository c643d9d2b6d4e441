// Ledger store over SQLite
//
// All mutable shared state lives here: the store is the single source of
// truth for balances. Monetary values are stored as exact decimal TEXT,
// never as REAL, so nothing is lost between the wire and the database.
// Every function takes a `&Connection`; a rusqlite `Transaction` derefs to
// one, so the same functions compose inside `run_atomic`.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::entities::{Account, Customer, Transfer};
use crate::error::LedgerError;

pub fn setup_database(conn: &Connection) -> Result<(), LedgerError> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL REFERENCES customers(id),
            balance TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // seq preserves insertion order for per-account history listings
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transfers (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            from_account_id TEXT NOT NULL REFERENCES accounts(id),
            to_account_id TEXT NOT NULL REFERENCES accounts(id),
            amount TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_customer ON accounts(customer_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers(from_account_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers(to_account_id)",
        [],
    )?;

    Ok(())
}

/// Run `f` inside a single atomic transaction: all store calls made through
/// the handle commit together, or roll back together if `f` returns an
/// error. `BEGIN IMMEDIATE` takes the write lock up front, so a balance
/// read inside the transaction cannot be invalidated by a concurrent
/// writer before the matching write commits.
pub fn run_atomic<T, F>(conn: &mut Connection, f: F) -> Result<T, LedgerError>
where
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, LedgerError>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

// ============================================================================
// Customers
// ============================================================================

pub fn create_customer(conn: &Connection, name: &str) -> Result<Customer, LedgerError> {
    let customer = Customer::new(name.to_string());
    conn.execute(
        "INSERT INTO customers (id, name) VALUES (?1, ?2)",
        params![customer.id.to_string(), customer.name],
    )?;
    Ok(customer)
}

pub fn get_customer(conn: &Connection, id: Uuid) -> Result<Customer, LedgerError> {
    conn.query_row(
        "SELECT id, name FROM customers WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(Customer {
                id: uuid_column(row, 0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or(LedgerError::CustomerNotFound)
}

// ============================================================================
// Accounts
// ============================================================================

/// Create an account for an existing customer. The caller has already
/// validated the opening balance; the customer lookup happens here so the
/// foreign key never dangles.
pub fn create_account(
    conn: &Connection,
    customer_id: Uuid,
    initial_balance: Decimal,
) -> Result<Account, LedgerError> {
    let customer = get_customer(conn, customer_id)?;

    let account = Account::new(customer.id, initial_balance);
    conn.execute(
        "INSERT INTO accounts (id, customer_id, balance) VALUES (?1, ?2, ?3)",
        params![
            account.id.to_string(),
            account.customer_id.to_string(),
            account.balance.to_string(),
        ],
    )?;
    Ok(account)
}

pub fn get_account(conn: &Connection, id: Uuid) -> Result<Account, LedgerError> {
    conn.query_row(
        "SELECT id, customer_id, balance FROM accounts WHERE id = ?1",
        params![id.to_string()],
        account_from_row,
    )
    .optional()?
    .ok_or(LedgerError::AccountNotFound)
}

/// Apply a signed delta to an account balance within the caller's active
/// transaction. Fails with `InsufficientFunds` if the result would be
/// negative - a store-level guard in addition to the engine's own check,
/// so no code path can commit a negative balance.
pub fn adjust_balance(
    conn: &Connection,
    account_id: Uuid,
    delta: Decimal,
) -> Result<Account, LedgerError> {
    let mut account = get_account(conn, account_id)?;

    // Decimal rounds instead of overflowing when the exact sum needs more
    // than its 96-bit mantissa; a rounded sum comes back with reduced
    // scale. Either case would silently create or destroy money, so the
    // adjustment is rejected and the caller's transaction rolls back.
    let exact_scale = account.balance.scale().max(delta.scale());
    let new_balance = account
        .balance
        .checked_add(delta)
        .filter(|sum| sum.scale() >= exact_scale)
        .ok_or_else(|| {
            LedgerError::Validation("Balance arithmetic exceeds supported precision".to_string())
        })?;

    if new_balance < Decimal::ZERO {
        return Err(LedgerError::InsufficientFunds {
            available: account.balance,
            requested: -delta,
        });
    }

    conn.execute(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2",
        params![new_balance.to_string(), account_id.to_string()],
    )?;

    account.balance = new_balance;
    Ok(account)
}

// ============================================================================
// Transfers
// ============================================================================

/// Append a transfer record to the ledger. Balances are not touched here;
/// the engine pairs this with two `adjust_balance` calls inside one
/// transaction.
pub fn create_transfer(
    conn: &Connection,
    from_account_id: Uuid,
    to_account_id: Uuid,
    amount: Decimal,
    timestamp: DateTime<Utc>,
) -> Result<Transfer, LedgerError> {
    let transfer = Transfer::new(from_account_id, to_account_id, amount, timestamp);
    conn.execute(
        "INSERT INTO transfers (id, from_account_id, to_account_id, amount, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            transfer.id.to_string(),
            transfer.from_account_id.to_string(),
            transfer.to_account_id.to_string(),
            transfer.amount.to_string(),
            transfer.timestamp.to_rfc3339(),
        ],
    )?;
    Ok(transfer)
}

pub fn get_transfer(conn: &Connection, id: Uuid) -> Result<Transfer, LedgerError> {
    conn.query_row(
        "SELECT id, from_account_id, to_account_id, amount, timestamp
         FROM transfers WHERE id = ?1",
        params![id.to_string()],
        transfer_from_row,
    )
    .optional()?
    .ok_or(LedgerError::TransferNotFound)
}

/// All transfers touching an account, as source or destination, in
/// insertion order. Empty if the account has no history (the account itself
/// is not checked here - a lookup miss is the caller's concern).
pub fn list_transfers_for_account(
    conn: &Connection,
    account_id: Uuid,
) -> Result<Vec<Transfer>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT id, from_account_id, to_account_id, amount, timestamp
         FROM transfers
         WHERE from_account_id = ?1 OR to_account_id = ?1
         ORDER BY seq",
    )?;

    let transfers = stmt
        .query_map(params![account_id.to_string()], transfer_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transfers)
}

// ============================================================================
// Row mapping
// ============================================================================

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: uuid_column(row, 0)?,
        customer_id: uuid_column(row, 1)?,
        balance: decimal_column(row, 2)?,
    })
}

fn transfer_from_row(row: &Row<'_>) -> rusqlite::Result<Transfer> {
    Ok(Transfer {
        id: uuid_column(row, 0)?,
        from_account_id: uuid_column(row, 1)?,
        to_account_id: uuid_column(row, 2)?,
        amount: decimal_column(row, 3)?,
        timestamp: timestamp_column(row, 4)?,
    })
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
