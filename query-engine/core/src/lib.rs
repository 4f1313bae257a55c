//! Compiles GraphQL operations into parameterized Cypher statements.
//!
//! A [`Translator`] holds the type metadata, the configuration and the `@populatedBy`
//! callbacks. Protocol adapters lower incoming documents into [`Operation`]s, one per
//! top-level field, and every [`Operation`] becomes one statement.
pub mod config;
pub mod error;
pub mod extractors;
pub mod query_document;

mod translator;

pub use config::TranslatorConfig;
pub use cypher_query_builder::CypherStatement;
pub use error::{CoreError, CoreResult};
pub use query_document::*;
pub use translator::*;
