//! Defines the endpoint for creating a new transaction record.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, alert::Alert, endpoints};

use super::{
    core::{Transaction, TransactionBuilder, create_transaction},
    form::{parse_non_negative_number, parse_status_or_default, require_text},
};

/// The state needed for the create transaction endpoint.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for the store of transaction records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for creating a transaction record.
///
/// Every field is optional at the HTTP layer so that incomplete submissions
/// reach the validation step instead of being rejected by the extractor.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The category label for the record.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
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

/// A route handler for creating a new transaction record.
///
/// On success the client is redirected to the transactions page so the new
/// record shows up in the table and the entry form is reset. Invalid form data
/// produces an error alert and leaves the store untouched, and since only the
/// alert container is swapped the user keeps what they typed.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let builder = match build_transaction(&form) {
        Ok(builder) => builder,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_transaction(builder, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not create transaction record: {error}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error("错误", "添加记录失败").into_markup(),
            )
                .into_response()
        }
    }
}

fn build_transaction(form: &TransactionForm) -> Result<TransactionBuilder, Error> {
    let transaction_type = require_text(form.transaction_type.as_deref(), "type")?;
    let account = require_text(form.account.as_deref(), "account")?;
    let points = parse_non_negative_number(form.points.as_deref(), "points")?;
    let unit_price = parse_non_negative_number(form.unit_price.as_deref(), "unit_price")?;
    let username = require_text(form.username.as_deref(), "username")?;
    let status = parse_status_or_default(form.status.as_deref())?;

    Ok(Transaction::build(&account, points, unit_price, &username)
        .transaction_type(&transaction_type)
        .status(status))
}

#[cfg(test)]
mod create_transaction_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::Response};
    use axum_extra::extract::Form;
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        db::initialize,
        endpoints,
        test_utils::{assert_hx_redirect, parse_html_fragment},
        transaction::{Status, get_all_transactions, get_transaction},
    };

    use super::{CreateTransactionState, TransactionForm, create_transaction_endpoint};

    fn get_test_state() -> CreateTransactionState {
        let db_connection = Connection::open_in_memory().expect("could not open database");
        initialize(&db_connection).expect("could not initialize database");

        CreateTransactionState {
            db_connection: Arc::new(Mutex::new(db_connection)),
        }
    }

    fn get_form() -> TransactionForm {
        TransactionForm {
            transaction_type: Some("sm积分".to_owned()),
            account: Some("A1".to_owned()),
            points: Some("100".to_owned()),
            unit_price: Some("0.5".to_owned()),
            username: Some("u1".to_owned()),
            status: Some("未结款".to_owned()),
        }
    }

    async fn assert_alert_message(response: Response, want_message: &str) {
        let alert_html = parse_html_fragment(response).await;

        let paragraph_selector = Selector::parse("div[role='alert'] p").unwrap();
        let messages: Vec<String> = alert_html
            .select(&paragraph_selector)
            .map(|paragraph| paragraph.text().collect::<String>())
            .collect();

        assert!(
            messages.iter().any(|message| message == want_message),
            "want alert message {want_message}, got {messages:?}"
        );
    }

    #[tokio::test]
    async fn can_create_transaction() {
        let state = get_test_state();

        let response = create_transaction_endpoint(State(state.clone()), Form(get_form())).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::TRANSACTIONS_VIEW);

        let connection = state.db_connection.lock().unwrap();
        // We know the first transaction record will have ID 1.
        let transaction =
            get_transaction(1, &connection).expect("could not get transaction record");

        assert_eq!(transaction.transaction_type, "sm积分");
        assert_eq!(transaction.account, "A1");
        assert_eq!(transaction.points, 100.0);
        assert_eq!(transaction.unit_price, 0.5);
        assert_eq!(transaction.total_amount, 50.0);
        assert_eq!(transaction.username, "u1");
        assert_eq!(transaction.status, Status::Unsettled);
    }

    #[tokio::test]
    async fn create_defaults_status_to_unsettled() {
        let state = get_test_state();
        let mut form = get_form();
        form.status = None;

        let response = create_transaction_endpoint(State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let connection = state.db_connection.lock().unwrap();
        let transaction =
            get_transaction(1, &connection).expect("could not get transaction record");

        assert_eq!(transaction.status, Status::Unsettled);
    }

    #[tokio::test]
    async fn create_rejects_incomplete_form() {
        let state = get_test_state();
        let mut form = get_form();
        form.account = None;

        let response = create_transaction_endpoint(State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_alert_message(response, "请填写完整信息").await;

        let connection = state.db_connection.lock().unwrap();
        let transactions =
            get_all_transactions(&connection).expect("could not get transaction records");

        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_negative_points() {
        let state = get_test_state();
        let mut form = get_form();
        form.points = Some("-5".to_owned());

        let response = create_transaction_endpoint(State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_alert_message(response, "请填写完整信息").await;
    }

    #[tokio::test]
    async fn create_rejects_non_numeric_unit_price() {
        let state = get_test_state();
        let mut form = get_form();
        form.unit_price = Some("abc".to_owned());

        let response = create_transaction_endpoint(State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let connection = state.db_connection.lock().unwrap();
        let transactions =
            get_all_transactions(&connection).expect("could not get transaction records");

        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_status() {
        let state = get_test_state();
        let mut form = get_form();
        form.status = Some("已付款".to_owned());

        let response = create_transaction_endpoint(State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_alert_message(response, "状态只能是已结款或未结款。").await;
    }

    #[test]
    fn empty_form_fields_deserialize_to_none() {
        let form: TransactionForm = serde_html_form::from_str(
            "type=sm积分&account=A1&points=&unit_price=0.5&username=u1&status=",
        )
        .expect("could not parse form data");

        assert_eq!(form.transaction_type, Some("sm积分".to_owned()));
        assert_eq!(form.account, Some("A1".to_owned()));
        assert_eq!(form.points, None);
        assert_eq!(form.unit_price, Some("0.5".to_owned()));
        assert_eq!(form.status, None);
    }
}
