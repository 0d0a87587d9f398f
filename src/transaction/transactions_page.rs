//! Defines the route handler for the page that displays transaction records as a table.
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, endpoints, timezone::get_local_offset};

use super::{
    core::{get_all_transactions, get_matching_transactions},
    view::transactions_view,
};

/// The query parameters for the transactions page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// The keyword to filter records by. Missing shows all records.
    pub q: Option<String>,
}

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    /// The database connection for reading transaction records.
    db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Shanghai".
    local_timezone: String,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render an overview of the recorded transactions.
///
/// A non-empty `q` query parameter filters the table to records whose
/// account, username or category label contains the keyword. An empty or
/// whitespace-only `q` redirects to the unfiltered page so the URL stays
/// canonical.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Query(query_params): Query<SearchParams>,
) -> Result<Response, Error> {
    let search_keyword = match query_params.q.as_deref().map(str::trim) {
        Some("") => return Ok(Redirect::to(endpoints::TRANSACTIONS_VIEW).into_response()),
        Some(keyword) => keyword,
        None => "",
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Err(Error::InvalidTimezoneError(state.local_timezone));
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = if search_keyword.is_empty() {
        get_all_transactions(&connection)
    } else {
        get_matching_transactions(search_keyword, &connection)
    }
    .inspect_err(|error| tracing::error!("could not get transaction records: {error}"))?;

    Ok(transactions_view(&transactions, search_keyword, local_offset).into_response())
}
