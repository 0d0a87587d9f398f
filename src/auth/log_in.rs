//! Defines the log-in page and the endpoint that checks the shared access
//! password. The cookie module handles the lower level cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    app_state::create_cookie_key,
    auth::cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, base, loading_spinner, log_in_card, password_input},
    settings::get_access_password,
};

/// The error message shown when the submitted password does not match the
/// access password.
pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "密码错误，请输入正确的访问密码";

/// The error message shown when the access password could not be checked at
/// all, e.g. the database is unavailable or no password has been set yet.
const LOG_IN_FAILED_ERROR_MSG: &str = "登录失败，请稍后重试";

fn log_in_form(password: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (password_input(password, error_message))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "登录"
            }
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    let content = log_in_card("SM积分记账系统", "请输入访问密码", &log_in_form("", None));

    base("登录", &content).into_response()
}

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection holding the access password.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LoginState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Password entered during log-in.
    pub password: String,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in the auth cookies are set and the client is
/// redirected to the transactions page. Otherwise, the form is returned with
/// an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(log_in_data): Form<LogInData>,
) -> Response {
    let access_password = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return log_in_form("", Some(LOG_IN_FAILED_ERROR_MSG)).into_response();
            }
        };

        match get_access_password(&connection) {
            Ok(password) => password,
            Err(Error::AccessPasswordNotSet) => {
                tracing::error!("no access password has been set, run set_password first");
                return log_in_form("", Some(LOG_IN_FAILED_ERROR_MSG)).into_response();
            }
            Err(error) => {
                tracing::error!("could not fetch the access password: {error}");
                return log_in_form("", Some(LOG_IN_FAILED_ERROR_MSG)).into_response();
            }
        }
    };

    if log_in_data.password != access_password {
        return log_in_form("", Some(INVALID_CREDENTIALS_ERROR_MSG)).into_response();
    }

    set_auth_cookie(jar.clone(), state.cookie_duration)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
                updated_jar,
            )
        })
        .map_err(|error| {
            tracing::error!("Error setting auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}
