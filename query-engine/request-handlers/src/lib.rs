//! GraphQL requests in, GraphQL responses out. Parses request documents into operations,
//! hands the translated statements to a [`QueryExecutor`] and shapes the returned rows.

mod error;
mod executor;
mod handler;
mod protocols;
mod response;

#[cfg(test)]
mod tests;

pub use error::HandlerError;
pub use executor::{QueryExecutor, Row};
pub use handler::RequestHandler;
pub use protocols::graphql::*;
pub use response::{GQLError, GQLResponse};

pub type Result<T> = std::result::Result<T, HandlerError>;
