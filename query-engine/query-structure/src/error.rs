use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("Type `{name}` not found")]
    TypeNotFound { name: String },

    #[error("Field `{field}` on type `{type_name}` not found")]
    FieldNotFound { type_name: String, field: String },

    /// The schema definition itself is inconsistent.
    #[error("Invalid schema at `{path}`: {message}")]
    InvalidSchema { path: String, message: String },

    /// An argument does not fit the field or comparator it targets.
    #[error("Invalid argument at `{path}`: {message}")]
    Validation { path: String, message: String },

    #[error("Failed to parse the schema definition: {0}")]
    Deserialization(String),
}

impl DomainError {
    pub fn invalid_schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}
