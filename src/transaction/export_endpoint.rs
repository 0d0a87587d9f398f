//! Defines the endpoint for downloading the transaction records as a JSON
//! file.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::header,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error};

use super::core::get_all_transactions;

/// The state needed to export the transaction records.
#[derive(Debug, Clone)]
pub struct ExportTransactionsState {
    /// The database connection for the store of transaction records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for downloading every transaction record as a pretty
/// printed JSON file named `transactions.json`.
///
/// # Errors
///
/// This function returns a [crate::Error::DatabaseLockError] if the database
/// lock could not be acquired, or a [crate::Error::JSONSerializationError] if
/// the records could not be serialized.
pub async fn export_transactions(
    State(state): State<ExportTransactionsState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_all_transactions(&connection)
        .inspect_err(|error| tracing::error!("could not get transaction records: {error}"))?;

    let json = serde_json::to_string_pretty(&transactions)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.json\"",
            ),
        ],
        json,
    )
        .into_response())
}
