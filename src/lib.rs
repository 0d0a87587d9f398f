//! Pointbook is a web app for keeping a ledger of points sales: which account
//! bought points, at what unit price, who handled the sale, and whether
//! payment has been settled.
//!
//! This library provides a server that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod not_found;
mod routing;
mod settings;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use settings::set_access_password;

use crate::{
    alert::Alert, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The provided password did not match the stored access password.
    #[error("invalid password")]
    InvalidCredentials,

    /// The settings row holding the access password does not exist yet, so
    /// nobody can log in. Run the `set_password` tool to create it.
    #[error("the access password has not been set")]
    AccessPasswordNotSet,

    /// Either the authenticated or expiry cookie is missing from the cookie
    /// jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// A required record form field was submitted empty.
    #[error("the field {0} must not be empty")]
    EmptyTransactionField(&'static str),

    /// A numeric record form field could not be parsed as a number.
    #[error("the field {0} must be a number")]
    InvalidTransactionNumber(&'static str),

    /// A numeric record form field was negative.
    #[error("the field {0} must be zero or greater")]
    NegativeTransactionField(&'static str),

    /// A settlement status outside the two valid values was submitted.
    ///
    /// The status select only offers the valid values, so this indicates a
    /// hand-crafted request.
    #[error("invalid settlement status \"{0}\"")]
    InvalidStatus(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical
    /// timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing records as JSON for export.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a record that does not exist
    #[error("tried to update a record that is not in the database")]
    UpdateMissingTransaction,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to a valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        match self {
            Error::UpdateMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::error("更新记录失败", "未找到该记录，请刷新页面后重试。").into_markup(),
            )
                .into_response(),
            Error::EmptyTransactionField(_)
            | Error::InvalidTransactionNumber(_)
            | Error::NegativeTransactionField(_) => (
                StatusCode::BAD_REQUEST,
                Alert::error("错误", "请填写完整信息").into_markup(),
            )
                .into_response(),
            Error::InvalidStatus(_) => (
                StatusCode::BAD_REQUEST,
                Alert::error("错误", "状态只能是已结款或未结款。").into_markup(),
            )
                .into_response(),
            Error::JSONSerializationError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error("导出失败", "无法序列化记录数据，请查看服务器日志。").into_markup(),
            )
                .into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error("出错了", "发生意外错误，请查看服务器日志。").into_markup(),
            )
                .into_response(),
        }
    }
}
