//! Defines the view and route handler for the 404 not found page.
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// Fallback route handler for requests that match no route.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

pub fn get_404_not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(
            error_view(
                "Not Found",
                "404",
                "Sorry, we can't find that page.",
                "Head back to the transactions page and try again from there.",
            )
            .into_string(),
        ),
    )
        .into_response()
}
