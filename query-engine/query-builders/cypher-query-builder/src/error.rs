use query_structure::DomainError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Render(#[from] cypher_ast::Error),

    /// The caller context lacks what an applicable `@auth` rule needs. The message never
    /// names the rule or the claim.
    #[error("Unauthenticated")]
    AuthorizationContext,

    #[error("Invalid query at `{path}`: {message}")]
    QueryShape { path: String, message: String },

    #[error("No `@populatedBy` callback named `{name}` is registered.")]
    MissingCallback { name: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl BuildError {
    pub fn query_shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryShape {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
