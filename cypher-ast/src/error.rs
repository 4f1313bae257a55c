use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Two different values were bound under the same parameter name. Parameter names are
    /// allocated collision-free, so this is a bug in the code building the statement.
    #[error("Parameter `${name}` was bound twice with different values.")]
    ParameterCollision { name: String },

    #[error("Statement is malformed: {0}")]
    MalformedStatement(String),

    #[error("Failed to render the statement text.")]
    Render,
}

impl From<std::fmt::Error> for Error {
    fn from(_: std::fmt::Error) -> Self {
        Self::Render
    }
}

pub type Result<T> = std::result::Result<T, Error>;
