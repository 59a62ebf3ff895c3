//! Validation utilities.

use crate::{FieldError, ParleyError};
use validator::{Validate, ValidationErrors};

/// Extension trait for validation.
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `ParleyError` on failure.
    fn validate_request(&self) -> Result<(), ParleyError> {
        self.validate().map_err(validation_errors_to_parley_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Converts `validator::ValidationErrors` to a `ParleyError`.
#[must_use]
pub fn validation_errors_to_parley_error(errors: ValidationErrors) -> ParleyError {
    let field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: (*field).to_string(),
                message: error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), |m| m.to_string()),
                code: error.code.to_string(),
            })
        })
        .collect();

    let message = field_errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");

    ParleyError::Validation(message)
}
