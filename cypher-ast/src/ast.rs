//! Clause and expression nodes.
mod clause;
mod expression;
mod ordering;
mod pattern;
mod statement;

pub use clause::*;
pub use expression::*;
pub use ordering::*;
pub use pattern::*;
pub use statement::*;

pub use graph_value::GraphValue;
