//! Toast-style alert fragments that htmx swaps into the page's alert container.

use maud::{Markup, html};

const SUCCESS_ALERT_STYLE: &str = "p-4 mb-4 text-sm rounded-lg shadow text-green-800 \
    bg-green-50 dark:bg-gray-800 dark:text-green-400";

const ERROR_ALERT_STYLE: &str = "p-4 mb-4 text-sm rounded-lg shadow text-red-800 \
    bg-red-50 dark:bg-gray-800 dark:text-red-400";

/// A feedback message to display to the user after an action.
///
/// Error alerts are served as the response body of failed htmx requests and
/// land in the alert container via `hx-target-error`. Success alerts ride
/// along with another fragment as an out-of-band swap, see
/// [Alert::into_oob_markup].
pub enum Alert<'a> {
    Success { title: &'a str, message: &'a str },
    Error { title: &'a str, message: &'a str },
}

impl<'a> Alert<'a> {
    pub fn success(title: &'a str, message: &'a str) -> Self {
        Self::Success { title, message }
    }

    pub fn error(title: &'a str, message: &'a str) -> Self {
        Self::Error { title, message }
    }

    /// Render the alert card.
    pub fn into_markup(self) -> Markup {
        let (style, title, message) = match self {
            Alert::Success { title, message } => (SUCCESS_ALERT_STYLE, title, message),
            Alert::Error { title, message } => (ERROR_ALERT_STYLE, title, message),
        };

        html! {
            div class=(style) role="alert"
            {
                p class="font-medium" { (title) }
                p { (message) }
            }
        }
    }

    /// Render the alert card wrapped for an out-of-band swap into the alert
    /// container, for responses whose main content targets another element.
    pub fn into_oob_markup(self) -> Markup {
        html! {
            div hx-swap-oob="innerHTML:#alert-container"
            {
                (self.into_markup())
            }
        }
    }
}
