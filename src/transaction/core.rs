//! Defines the core data models and database queries for transaction records.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Serialize, Serializer};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

// ============================================================================
// MODELS
// ============================================================================

/// The category label given to records when none is specified.
pub const DEFAULT_TRANSACTION_TYPE: &str = "sm积分";

/// Whether payment for a record has been received.
///
/// Stored and serialized as the Chinese display text, the same strings the
/// status select offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    /// Payment has been received (`已结款`).
    #[serde(rename = "已结款")]
    Settled,
    /// Payment is still outstanding (`未结款`).
    #[serde(rename = "未结款")]
    Unsettled,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Settled => write!(f, "已结款"),
            Status::Unsettled => write!(f, "未结款"),
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "已结款" => Ok(Status::Settled),
            "未结款" => Ok(Status::Unsettled),
            _ => Err(Error::InvalidStatus(text.to_owned())),
        }
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A points sale: an account bought a number of points at a unit price, and
/// payment for the resulting total is either settled or outstanding.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the record.
    pub id: i64,
    /// The category label for the record, e.g. the kind of points sold.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// The account the points were credited to.
    pub account: String,
    /// How many points were sold.
    pub points: f64,
    /// The price per point.
    pub unit_price: f64,
    /// The money owed for the record.
    ///
    /// Always the product of the record's own `points` and `unit_price` at
    /// the last write. There is no way to set this field directly.
    pub total_amount: f64,
    /// Who handled the sale.
    pub username: String,
    /// Whether payment has been received.
    pub status: Status,
    /// When the record was created (UTC), assigned by the server at insert.
    #[serde(serialize_with = "serialize_created_at")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction record.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account: &str,
        points: f64,
        unit_price: f64,
        username: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            transaction_type: DEFAULT_TRANSACTION_TYPE.to_owned(),
            account: account.to_owned(),
            points,
            unit_price,
            username: username.to_owned(),
            status: Status::Unsettled,
        }
    }
}

/// The format for `created_at` in the JSON export.
const EXPORT_DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

fn serialize_created_at<S: Serializer>(
    created_at: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let date_time_string = created_at
        .format(EXPORT_DATE_TIME_FORMAT)
        .map_err(serde::ser::Error::custom)?;

    serializer.serialize_str(&date_time_string)
}

/// A builder for creating [Transaction] instances.
///
/// The builder starts from the required fields and provides defaults for the
/// rest: the category label defaults to [DEFAULT_TRANSACTION_TYPE] and the
/// status to [Status::Unsettled]. The record's `id`, `total_amount` and
/// `created_at` are assigned when the builder is passed to
/// [create_transaction].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The category label for the record.
    pub transaction_type: String,
    /// The account the points were credited to.
    pub account: String,
    /// How many points were sold.
    pub points: f64,
    /// The price per point.
    pub unit_price: f64,
    /// Who handled the sale.
    pub username: String,
    /// Whether payment has been received.
    pub status: Status,
}

impl TransactionBuilder {
    /// Set the category label for the record.
    pub fn transaction_type(mut self, transaction_type: &str) -> Self {
        self.transaction_type = transaction_type.to_owned();
        self
    }

    /// Set the settlement status for the record.
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

/// The replacement values for a record's editable fields.
///
/// The inline editor submits all of these together; the fields that are not
/// listed here (`id`, `type`, `created_at`) never change after creation, and
/// `total_amount` is recomputed from `points` and `unit_price`.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionChanges {
    /// The account the points were credited to.
    pub account: String,
    /// How many points were sold.
    pub points: f64,
    /// The price per point.
    pub unit_price: f64,
    /// Who handled the sale.
    pub username: String,
    /// Whether payment has been received.
    pub status: Status,
}

/// The total money owed for a record.
///
/// The create and update queries are the only callers, so a stored
/// `total_amount` is always the product of the stored `points` and
/// `unit_price`.
pub fn compute_total_amount(points: f64, unit_price: f64) -> f64 {
    points * unit_price
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction record in the database from a builder.
///
/// The database assigns the `id` and the server assigns the creation
/// timestamp (UTC); `total_amount` is computed from the builder's `points`
/// and `unit_price`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let total_amount = compute_total_amount(builder.points, builder.unit_price);
    let created_at = OffsetDateTime::now_utc();

    let transaction = connection
        .prepare(
            "INSERT INTO transactions (type, account, points, unit_price, total_amount, username, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, type, account, points, unit_price, total_amount, username, status, created_at",
        )?
        .query_row(
            (
                builder.transaction_type,
                builder.account,
                builder.points,
                builder.unit_price,
                total_amount,
                builder.username,
                builder.status,
                created_at,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction record from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a record,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: i64, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, type, account, points, unit_price, total_amount, username, status, created_at
             FROM transactions WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve all transaction records, newest first.
///
/// The `id` tie-break keeps records created within the same timestamp in
/// insertion order.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, type, account, points, unit_price, total_amount, username, status, created_at
             FROM transactions ORDER BY created_at DESC, id DESC",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the transaction records whose account, username or category label
/// contains `keyword`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_matching_transactions(
    keyword: &str,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let pattern = format!("%{keyword}%");

    connection
        .prepare(
            "SELECT id, type, account, points, unit_price, total_amount, username, status, created_at
             FROM transactions
             WHERE account LIKE :pattern OR username LIKE :pattern OR type LIKE :pattern
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map(&[(":pattern", &pattern)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Replace a record's editable fields, recomputing its total.
///
/// Returns the updated record.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a record,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: i64,
    changes: &TransactionChanges,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let total_amount = compute_total_amount(changes.points, changes.unit_price);

    let transaction = connection
        .prepare(
            "UPDATE transactions
             SET account = ?1, points = ?2, unit_price = ?3, total_amount = ?4, username = ?5, status = ?6
             WHERE id = ?7
             RETURNING id, type, account, points, unit_price, total_amount, username, status, created_at",
        )?
        .query_row(
            (
                &changes.account,
                changes.points,
                changes.unit_price,
                total_amount,
                &changes.username,
                changes.status,
                id,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Get the number the list displays for a record: its 1-based position
/// counting from the oldest record.
///
/// The list renders newest first with numbers decreasing from the top, so the
/// newest record's number equals the record count and the oldest record's
/// number is 1.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transaction_number(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM transactions
             WHERE created_at < ?1 OR (created_at = ?1 AND id <= ?2)",
            (transaction.created_at, transaction.id),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the transactions table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                account TEXT NOT NULL,
                points REAL NOT NULL,
                unit_price REAL NOT NULL,
                total_amount REAL NOT NULL,
                username TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transactions', 0)",
        (),
    )?;

    // Index backing the newest-first list ordering.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let transaction_type = row.get(1)?;
    let account = row.get(2)?;
    let points = row.get(3)?;
    let unit_price = row.get(4)?;
    let total_amount = row.get(5)?;
    let username = row.get(6)?;
    let status = row.get(7)?;
    let created_at = row.get(8)?;

    Ok(Transaction {
        id,
        transaction_type,
        account,
        points,
        unit_price,
        total_amount,
        username,
        status,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod status_tests {
    use crate::Error;

    use super::Status;

    #[test]
    fn status_displays_as_chinese_text() {
        assert_eq!(Status::Settled.to_string(), "已结款");
        assert_eq!(Status::Unsettled.to_string(), "未结款");
    }

    #[test]
    fn status_parses_from_chinese_text() {
        assert_eq!("已结款".parse(), Ok(Status::Settled));
        assert_eq!("未结款".parse(), Ok(Status::Unsettled));
    }

    #[test]
    fn status_rejects_other_text() {
        let result = "结清".parse::<Status>();

        assert_eq!(result, Err(Error::InvalidStatus("结清".to_owned())));
    }

    #[test]
    fn status_serializes_as_chinese_text() {
        let json = serde_json::to_string(&Status::Settled).unwrap();

        assert_eq!(json, "\"已结款\"");
    }
}
