//! Result envelope for form-style actions.

use serde::Serialize;

use crate::domain::error::FieldErrors;
use crate::error::{Error, Result};

/// Outcome of an action as returned to the calling form.
///
/// Validation failures become `success: false` with field-keyed messages.
/// Every other error is left for the transport to map.
#[derive(Debug, Clone, Serialize)]
pub struct ActionState<T> {
    pub success: bool,
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionState<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            errors: FieldErrors::new(),
            data: Some(data),
        }
    }

    pub fn failed(errors: FieldErrors) -> Self {
        Self {
            success: false,
            errors,
            data: None,
        }
    }

    /// Fold a service result into an action state.
    ///
    /// # Errors
    /// Returns every error other than [`Error::Validation`].
    pub fn from_result(result: Result<T>) -> Result<Self> {
        match result {
            Ok(data) => Ok(Self::ok(data)),
            Err(Error::Validation(errors)) => Ok(Self::failed(errors)),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_become_failed_state() {
        let state =
            ActionState::<()>::from_result(Err(FieldErrors::form("Group not found.").into()))
                .unwrap();
        assert!(!state.success);
        assert!(state.errors.mentions("_form", "Group not found"));
    }

    #[test]
    fn other_errors_propagate() {
        let result = ActionState::<()>::from_result(Err(Error::Forbidden("no".into())));
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[test]
    fn success_serializes_data() {
        let json = serde_json::to_value(ActionState::ok(5)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 5);
        assert!(json["errors"].as_object().unwrap().is_empty());
    }
}
