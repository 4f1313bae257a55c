mod auth;
mod error;
mod field;
mod model;
mod order_by;
mod query_arguments;
mod schema;

pub mod filter;
pub mod selection;
pub mod write_args;

pub use auth::*;
pub use error::*;
pub use field::*;
pub use filter::*;
pub use model::*;
pub use order_by::*;
pub use query_arguments::*;
pub use schema::*;

pub use graph_value::{GraphObjectValue, GraphValue};

pub mod prelude {
    pub use super::{
        filter::*, selection::*, write_args::*, AuthOperation, AuthRule, FieldRef, GraphSchema, TypeRef, WriteTrigger,
    };
    pub use graph_value::GraphValue;
}
