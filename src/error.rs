use thiserror::Error;

/// Failures surfaced by registry lookups, detector joins, and the dialog
/// collaborator. Per-row parse problems are never errors; they are reported as
/// invalid row indices instead.
#[derive(Debug, Error)]
pub enum ValueTypeError {
    #[error("not found: {id}")]
    NotFound { id: String },
    #[error("value type '{id}' is already registered")]
    DuplicateId { id: String },
    #[error("detector for '{id}' failed: {message}")]
    Detector { id: String, message: String },
    #[error("column '{name}' is not present in the input")]
    MissingColumn { name: String },
    #[error("dialog failed: {0}")]
    Dialog(String),
}

impl ValueTypeError {
    pub fn not_found(id: impl Into<String>) -> Self {
        ValueTypeError::NotFound { id: id.into() }
    }

    pub fn detector(id: impl Into<String>, message: impl Into<String>) -> Self {
        ValueTypeError::Detector {
            id: id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = ValueTypeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_carries_requested_id() {
        let err = ValueTypeError::not_found("idType");
        assert_eq!(err.to_string(), "not found: idType");
    }
}
