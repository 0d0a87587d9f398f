//! Defines the endpoints for editing a transaction record in place.
//!
//! Editing happens inside the transactions table: one endpoint swaps a row
//! with a variant whose cells are form inputs, the other applies the edits and
//! swaps the updated row back in.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use maud::html;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, alert::Alert, timezone::get_local_offset};

use super::{
    core::{Status, TransactionChanges, get_transaction, get_transaction_number, update_transaction},
    form::{parse_non_negative_number, require_text},
    view::{edit_transaction_row_view, transaction_row_view},
};

/// The state needed to render the editing variant of a table row.
#[derive(Debug, Clone)]
pub struct EditTransactionRowState {
    /// The database connection for the store of transaction records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone to display timestamps in.
    pub local_timezone: String,
}

impl FromRef<AppState> for EditTransactionRowState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for swapping a table row with its editing variant.
///
/// The response replaces the row via its `hx-swap="outerHTML"` target, so a
/// record that has disappeared in the meantime produces an alert instead.
pub async fn get_edit_transaction_row(
    Path(transaction_id): Path<i64>,
    State(state): State<EditTransactionRowState>,
) -> Response {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transaction = match get_transaction(transaction_id, &connection) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Error::UpdateMissingTransaction.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get transaction record {transaction_id}: {error}");
            return error.into_alert_response();
        }
    };

    match get_transaction_number(&transaction, &connection) {
        Ok(row_number) => {
            edit_transaction_row_view(&transaction, row_number, local_offset).into_response()
        }
        Err(error) => {
            tracing::error!(
                "could not get the row number for transaction record {transaction_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

/// The state needed to update a transaction record.
#[derive(Debug, Clone)]
pub struct UpdateTransactionState {
    /// The database connection for the store of transaction records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone to display timestamps in.
    pub local_timezone: String,
}

impl FromRef<AppState> for UpdateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for updating a transaction record.
///
/// The save button collects these fields from the input elements in the table
/// row, so there is no form element and every field is optional at the HTTP
/// layer.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionForm {
    /// The account the points were sold from.
    pub account: Option<String>,
    /// How many points were sold.
    pub points: Option<String>,
    /// The price of a single point in yuan.
    pub unit_price: Option<String>,
    /// The person who handled the sale.
    pub username: Option<String>,
    /// Whether the sale has been paid out.
    pub status: Option<String>,
}

/// A route handler for updating a transaction record.
///
/// The total amount is recomputed from the submitted points and unit price,
/// ignoring whatever the client displayed. On success the editing row is
/// swapped back to the display variant together with an out of band success
/// alert.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<i64>,
    State(state): State<UpdateTransactionState>,
    Form(form): Form<UpdateTransactionForm>,
) -> Response {
    let changes = match build_changes(&form) {
        Ok(changes) => changes,
        Err(error) => return error.into_alert_response(),
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transaction = match update_transaction(transaction_id, &changes, &connection) {
        Ok(transaction) => transaction,
        Err(Error::UpdateMissingTransaction) => {
            return Error::UpdateMissingTransaction.into_alert_response();
        }
        Err(error) => {
            tracing::error!("could not update transaction record {transaction_id}: {error}");

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error("错误", "更新记录失败").into_markup(),
            )
                .into_response();
        }
    };

    match get_transaction_number(&transaction, &connection) {
        Ok(row_number) => html! {
            (transaction_row_view(&transaction, row_number, local_offset))
            (Alert::success("成功", "记录已更新").into_oob_markup())
        }
        .into_response(),
        Err(error) => {
            tracing::error!(
                "could not get the row number for transaction record {transaction_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn build_changes(form: &UpdateTransactionForm) -> Result<TransactionChanges, Error> {
    let account = require_text(form.account.as_deref(), "account")?;
    let points = parse_non_negative_number(form.points.as_deref(), "points")?;
    let unit_price = parse_non_negative_number(form.unit_price.as_deref(), "unit_price")?;
    let username = require_text(form.username.as_deref(), "username")?;
    let status: Status = require_text(form.status.as_deref(), "status")?.parse()?;

    Ok(TransactionChanges {
        account,
        points,
        unit_price,
        username,
        status,
    })
}

#[cfg(test)]
mod edit_transaction_row_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use scraper::{ElementRef, Html, Selector};

    use crate::{
        db::initialize,
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input_with_value, assert_hx_endpoint,
            assert_status_ok, parse_table_row_fragment,
        },
        transaction::{Status, Transaction, create_transaction},
    };

    use super::{EditTransactionRowState, get_edit_transaction_row};

    fn get_test_state() -> EditTransactionRowState {
        let db_connection = Connection::open_in_memory().expect("could not open database");
        initialize(&db_connection).expect("could not initialize database");

        EditTransactionRowState {
            db_connection: Arc::new(Mutex::new(db_connection)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[track_caller]
    fn must_get_edit_row(html: &Html) -> ElementRef<'_> {
        html.select(&Selector::parse("tr[data-transaction-edit-row='true']").unwrap())
            .next()
            .expect("No editing row found")
    }

    #[tokio::test]
    async fn edit_row_shows_inputs_with_current_values() {
        let state = get_test_state();
        let transaction = {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(Transaction::build("A1", 100.0, 0.5, "u1"), &connection)
                .expect("could not create transaction record")
        };

        let response = get_edit_transaction_row(Path(transaction.id), State(state)).await;

        assert_status_ok(&response);
        assert_content_type(&response, "text/html; charset=utf-8");

        let fragment = parse_table_row_fragment(response).await;
        let row = must_get_edit_row(&fragment);

        assert_form_input_with_value(&row, "account", "text", "A1");
        assert_form_input_with_value(&row, "points", "number", "100");
        assert_form_input_with_value(&row, "unit_price", "number", "0.5");
        assert_form_input_with_value(&row, "username", "text", "u1");

        let selected_option = row
            .select(&Selector::parse("select[name='status'] option[selected]").unwrap())
            .next()
            .expect("No selected status option found");
        assert_eq!(selected_option.text().collect::<String>().trim(), "未结款");

        let save_button = row
            .select(&Selector::parse("button").unwrap())
            .next()
            .expect("No save button found");
        assert_hx_endpoint(
            &save_button,
            &endpoints::format_endpoint(endpoints::PUT_TRANSACTION, transaction.id),
            "hx-put",
        );
        assert_eq!(save_button.value().attr("hx-include"), Some("closest tr"));
    }

    #[tokio::test]
    async fn edit_row_marks_settled_status_as_selected() {
        let state = get_test_state();
        let transaction = {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                Transaction::build("A1", 100.0, 0.5, "u1").status(Status::Settled),
                &connection,
            )
            .expect("could not create transaction record")
        };

        let response = get_edit_transaction_row(Path(transaction.id), State(state)).await;

        assert_status_ok(&response);

        let fragment = parse_table_row_fragment(response).await;
        let row = must_get_edit_row(&fragment);

        let selected_option = row
            .select(&Selector::parse("select[name='status'] option[selected]").unwrap())
            .next()
            .expect("No selected status option found");
        assert_eq!(selected_option.text().collect::<String>().trim(), "已结款");
    }

    #[tokio::test]
    async fn edit_row_numbers_records_from_oldest() {
        let state = get_test_state();
        let newest_id = {
            let connection = state.db_connection.lock().unwrap();

            let mut newest_id = 0;
            for account in ["A1", "A2", "A3"] {
                let transaction =
                    create_transaction(Transaction::build(account, 10.0, 0.5, "u1"), &connection)
                        .expect("could not create transaction record");
                newest_id = transaction.id;
            }

            newest_id
        };

        let response = get_edit_transaction_row(Path(newest_id), State(state)).await;

        assert_status_ok(&response);

        let fragment = parse_table_row_fragment(response).await;
        let row = must_get_edit_row(&fragment);

        let number_cell = row
            .select(&Selector::parse("td").unwrap())
            .next()
            .expect("No table cells found");
        assert_eq!(number_cell.text().collect::<String>().trim(), "3");
    }

    #[tokio::test]
    async fn edit_row_returns_not_found_for_missing_record() {
        let state = get_test_state();

        let response = get_edit_transaction_row(Path(999), State(state)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[cfg(test)]
mod update_transaction_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use axum_extra::extract::Form;
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        db::initialize,
        html::format_currency,
        test_utils::{assert_status_ok, parse_table_row_fragment},
        transaction::{Status, Transaction, create_transaction, get_transaction},
    };

    use super::{UpdateTransactionForm, UpdateTransactionState, update_transaction_endpoint};

    fn get_test_state() -> UpdateTransactionState {
        let db_connection = Connection::open_in_memory().expect("could not open database");
        initialize(&db_connection).expect("could not initialize database");

        UpdateTransactionState {
            db_connection: Arc::new(Mutex::new(db_connection)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    fn get_form() -> UpdateTransactionForm {
        UpdateTransactionForm {
            account: Some("A2".to_owned()),
            points: Some("20".to_owned()),
            unit_price: Some("1.5".to_owned()),
            username: Some("u2".to_owned()),
            status: Some("已结款".to_owned()),
        }
    }

    fn create_test_transaction(state: &UpdateTransactionState) -> Transaction {
        let connection = state.db_connection.lock().unwrap();

        create_transaction(Transaction::build("A1", 10.0, 1.5, "u1"), &connection)
            .expect("could not create transaction record")
    }

    #[tokio::test]
    async fn can_update_transaction() {
        let state = get_test_state();
        let transaction = create_test_transaction(&state);

        let response = update_transaction_endpoint(
            Path(transaction.id),
            State(state.clone()),
            Form(get_form()),
        )
        .await;

        assert_status_ok(&response);

        let fragment = parse_table_row_fragment(response).await;

        let row = fragment
            .select(&Selector::parse("tr[data-transaction-row='true']").unwrap())
            .next()
            .expect("No display row found");
        let cells: Vec<String> = row
            .select(&Selector::parse("td").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect();

        assert_eq!(cells[2], "A2");
        assert_eq!(cells[5], format_currency(30.0));
        assert_eq!(cells[7], "已结款");

        let alert = fragment
            .select(&Selector::parse("div[hx-swap-oob]").unwrap())
            .next()
            .expect("No out of band alert found");
        let alert_text = alert.text().collect::<String>();
        assert!(
            alert_text.contains("记录已更新"),
            "want alert with message 记录已更新, got {alert_text:?}"
        );

        let connection = state.db_connection.lock().unwrap();
        let updated =
            get_transaction(transaction.id, &connection).expect("could not get transaction record");

        assert_eq!(updated.account, "A2");
        assert_eq!(updated.points, 20.0);
        assert_eq!(updated.unit_price, 1.5);
        assert_eq!(updated.total_amount, 30.0);
        assert_eq!(updated.username, "u2");
        assert_eq!(updated.status, Status::Settled);
        assert_eq!(updated.transaction_type, transaction.transaction_type);
        assert_eq!(updated.created_at, transaction.created_at);
    }

    #[tokio::test]
    async fn update_rejects_missing_field() {
        let state = get_test_state();
        let transaction = create_test_transaction(&state);
        let mut form = get_form();
        form.username = None;

        let response =
            update_transaction_endpoint(Path(transaction.id), State(state.clone()), Form(form))
                .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let connection = state.db_connection.lock().unwrap();
        let unchanged =
            get_transaction(transaction.id, &connection).expect("could not get transaction record");

        assert_eq!(unchanged, transaction);
    }

    #[tokio::test]
    async fn update_rejects_unknown_status() {
        let state = get_test_state();
        let transaction = create_test_transaction(&state);
        let mut form = get_form();
        form.status = Some("结清".to_owned());

        let response =
            update_transaction_endpoint(Path(transaction.id), State(state.clone()), Form(form))
                .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let connection = state.db_connection.lock().unwrap();
        let unchanged =
            get_transaction(transaction.id, &connection).expect("could not get transaction record");

        assert_eq!(unchanged, transaction);
    }

    #[tokio::test]
    async fn update_requires_status_field() {
        let state = get_test_state();
        let transaction = create_test_transaction(&state);
        let mut form = get_form();
        form.status = None;

        let response =
            update_transaction_endpoint(Path(transaction.id), State(state), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_returns_not_found_for_missing_record() {
        let state = get_test_state();

        let response =
            update_transaction_endpoint(Path(999), State(state), Form(get_form())).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
