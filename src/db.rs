//! Database initialization for the application.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{Error, settings::create_app_settings_table, transaction::create_transaction_table};

/// Create the application's tables if they do not exist.
///
/// This is done in a single exclusive transaction so that two processes
/// sharing the database file cannot interleave their schema setup.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL
/// error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;
    create_app_settings_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
