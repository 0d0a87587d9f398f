//! Validation for the transaction form fields shared by the create and edit
//! endpoints.
//!
//! The browser marks most fields as required, but every rule here is checked
//! again on the server so that hand-crafted requests cannot create or corrupt
//! records.

use crate::Error;

use super::core::Status;

/// Extract a required text field, trimming surrounding whitespace.
///
/// # Errors
///
/// This function returns [Error::EmptyTransactionField] if the field is
/// missing or blank.
pub(super) fn require_text(field: Option<&str>, field_name: &'static str) -> Result<String, Error> {
    match field.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_owned()),
        _ => Err(Error::EmptyTransactionField(field_name)),
    }
}

/// Parse a required numeric field, rejecting negative and non-finite values.
///
/// # Errors
///
/// This function returns:
/// - [Error::EmptyTransactionField] if the field is missing or blank,
/// - [Error::InvalidTransactionNumber] if the field is not a finite number,
/// - [Error::NegativeTransactionField] if the field is a negative number.
pub(super) fn parse_non_negative_number(
    field: Option<&str>,
    field_name: &'static str,
) -> Result<f64, Error> {
    let text = require_text(field, field_name)?;

    let number: f64 = text
        .parse()
        .map_err(|_| Error::InvalidTransactionNumber(field_name))?;

    if !number.is_finite() {
        return Err(Error::InvalidTransactionNumber(field_name));
    }

    if number < 0.0 {
        return Err(Error::NegativeTransactionField(field_name));
    }

    Ok(number)
}

/// Parse the settlement status field, falling back to [Status::Unsettled] when
/// the field is missing or blank.
///
/// # Errors
///
/// This function returns [Error::InvalidStatus] if the field holds anything
/// other than the two valid status labels.
pub(super) fn parse_status_or_default(field: Option<&str>) -> Result<Status, Error> {
    match field.map(str::trim) {
        Some(text) if !text.is_empty() => text.parse(),
        _ => Ok(Status::Unsettled),
    }
}
