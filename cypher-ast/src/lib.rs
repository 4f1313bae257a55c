//! # cypher-ast
//!
//! An abstract syntax tree for the subset of Cypher the translation engine emits, and a
//! single serializer turning it into statement text plus the bound parameters.
//!
//! Values never appear inline in the statement text. Every user supplied value is an
//! [`ast::Parameter`] carrying its name and value; the visitor writes `$name` and collects
//! the value into [`visitor::Parameters`].
//!
//! ```rust
//! # use cypher_ast::{ast::*, visitor::{Cypher, Visitor}};
//! let this = Variable::new("this");
//! let statement = Statement::new()
//!     .clause(Match::new(NodePattern::new(this.clone()).label("Movie")).so_that(
//!         this.property("title").equals(Parameter::new("this_param0", "The Matrix")),
//!     ))
//!     .clause(Return::new().item(this.clone().project([MapItem::property("title")]), Some(this)));
//!
//! let (cypher, params) = Cypher::build(statement).unwrap();
//!
//! assert_eq!("MATCH (this:Movie)\nWHERE this.title = $this_param0\nRETURN this { .title } AS this", cypher);
//! assert_eq!(params.len(), 1);
//! ```

pub mod ast;
pub mod error;
pub mod visitor;

pub use error::{Error, Result};
