use thiserror::Error;

#[derive(Debug, Error)]
pub enum BailInError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BailInError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BailInError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BailInError {
    fn from(e: serde_json::Error) -> Self {
        BailInError::SerializationError(e.to_string())
    }
}
