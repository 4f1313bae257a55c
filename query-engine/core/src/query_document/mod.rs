//! The protocol independent form of an incoming GraphQL operation.
//!
//! Protocol adapters lower their documents into [`Operation`]s: variables are already
//! substituted, fragments spread into the selections they apply to.
mod operation;
mod selection;

pub use operation::*;
pub use selection::*;
