use cypher_query_builder::BuildError;
use query_structure::DomainError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// The type metadata does not describe what the operation refers to.
    #[error("Error in schema at `{path}`: {message}")]
    SchemaError { path: String, message: String },

    #[error("Invalid argument at `{path}`: {message}")]
    ValidationError { path: String, message: String },

    /// Never names the rule or claim that failed.
    #[error("Unauthenticated")]
    AuthorizationContextError,

    #[error("Invalid query at `{path}`: {message}")]
    QueryShapeError { path: String, message: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl CoreError {
    pub fn query_shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryShapeError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::TypeNotFound { name } => CoreError::schema(name, "type not found"),
            DomainError::FieldNotFound { type_name, field } => {
                CoreError::schema(format!("{type_name}.{field}"), "field not found")
            }
            DomainError::InvalidSchema { path, message } => CoreError::SchemaError { path, message },
            DomainError::Validation { path, message } => CoreError::ValidationError { path, message },
            DomainError::Deserialization(message) => CoreError::schema("", message),
        }
    }
}

impl From<BuildError> for CoreError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Domain(err) => err.into(),
            BuildError::Render(err) => CoreError::InvariantViolation(err.to_string()),
            BuildError::AuthorizationContext => CoreError::AuthorizationContextError,
            BuildError::QueryShape { path, message } => CoreError::QueryShapeError { path, message },
            BuildError::MissingCallback { name } => {
                CoreError::schema(name, "no callback with this name is registered")
            }
            BuildError::InvariantViolation(message) => CoreError::InvariantViolation(message),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_claims_stay_generic() {
        let err = CoreError::from(BuildError::AuthorizationContext);

        assert_eq!(err, CoreError::AuthorizationContextError);
        assert_eq!(err.to_string(), "Unauthenticated");
    }

    #[test]
    fn comparator_mismatches_are_validation_errors() {
        let err = CoreError::from(BuildError::Domain(DomainError::validation(
            "where.title_GT",
            "`_GT` is not supported on String fields",
        )));

        assert_eq!(
            err.to_string(),
            "Invalid argument at `where.title_GT`: `_GT` is not supported on String fields"
        );
    }

    #[test]
    fn unknown_types_are_schema_errors() {
        let err = CoreError::from(DomainError::TypeNotFound { name: "Genre".into() });

        assert!(matches!(err, CoreError::SchemaError { ref path, .. } if path == "Genre"));
    }
}
