use graphql_parser::query::ParseError;
use query_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{}", _0)]
    Core(#[from] CoreError),

    #[error("Error parsing GraphQL query: {}", _0)]
    Parse(String),

    #[error("{}", _0)]
    QueryConversion(String),

    #[error("Variable `${}` of type `{}` was not provided.", name, type_name)]
    MissingVariable { name: String, type_name: String },

    #[error("Unsupported feature: {}. {}", feature_name, message)]
    UnsupportedFeature {
        feature_name: &'static str,
        message: String,
    },

    #[error("Query execution failed: {}", _0)]
    Executor(String),
}

impl HandlerError {
    pub fn query_conversion(message: impl ToString) -> Self {
        Self::QueryConversion(message.to_string())
    }

    pub fn unsupported_feature(feature_name: &'static str, message: impl ToString) -> Self {
        let message = message.to_string();

        Self::UnsupportedFeature { feature_name, message }
    }

    pub fn executor(message: impl ToString) -> Self {
        Self::Executor(message.to_string())
    }

    /// Stable machine-readable code reported next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            HandlerError::Core(err) => match err {
                CoreError::SchemaError { .. } => "SCHEMA_ERROR",
                CoreError::ValidationError { .. } => "VALIDATION_ERROR",
                CoreError::AuthorizationContextError => "UNAUTHENTICATED",
                CoreError::QueryShapeError { .. } => "QUERY_SHAPE_ERROR",
                CoreError::InvariantViolation(_) => "INTERNAL_ERROR",
            },
            HandlerError::Parse(_) => "GRAPHQL_PARSE_FAILED",
            HandlerError::QueryConversion(_) | HandlerError::MissingVariable { .. } => "BAD_USER_INPUT",
            HandlerError::UnsupportedFeature { .. } => "UNSUPPORTED_FEATURE",
            HandlerError::Executor(_) => "EXECUTION_FAILED",
        }
    }
}

impl From<ParseError> for HandlerError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e.to_string())
    }
}
