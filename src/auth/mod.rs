//! Authentication for the app.
//!
//! This module contains everything related to the shared access password:
//! - The log-in page and the endpoint that checks the submitted password
//! - The log-out endpoint
//! - Cookie management for browser sessions
//! - Middleware that guards routes from unauthenticated clients

mod cookie;
mod log_in;
mod log_out;
mod middleware;

pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};

pub(crate) use cookie::DEFAULT_COOKIE_DURATION;

#[cfg(test)]
pub(crate) use cookie::{COOKIE_AUTH, COOKIE_EXPIRY, set_auth_cookie};
