//! Extractors turn the arguments and sub-selections of a [`Selection`] into the
//! translation IR of `query-structure`, resolving every name against the type metadata.
//!
//! [`Selection`]: crate::query_document::Selection
mod filters;
mod query_arguments;
mod selection;
mod write_args;

pub use filters::*;
pub use query_arguments::*;
pub use selection::*;
pub use write_args::*;

use crate::{CoreError, CoreResult};
use cypher_query_builder::Settings;
use graph_value::{GraphObjectValue, GraphValue};
use query_structure::GraphSchema;

/// What every extractor reads from.
#[derive(Clone, Copy)]
pub struct ExtractorContext<'a> {
    pub schema: &'a GraphSchema,
    pub settings: &'a Settings,
}

impl<'a> ExtractorContext<'a> {
    pub fn new(schema: &'a GraphSchema, settings: &'a Settings) -> Self {
        Self { schema, settings }
    }
}

pub(crate) fn expect_object<'v>(value: &'v GraphValue, path: &str) -> CoreResult<&'v GraphObjectValue> {
    value
        .as_object()
        .ok_or_else(|| CoreError::validation(path, format!("expected an input object, found {}", value.type_name())))
}

pub(crate) fn expect_int(value: &GraphValue, path: &str) -> CoreResult<i64> {
    match value.as_i64() {
        Some(int) if int >= 0 => Ok(int),
        Some(_) => Err(CoreError::validation(path, "must not be negative")),
        None => Err(CoreError::validation(
            path,
            format!("expected an Int, found {}", value.type_name()),
        )),
    }
}

/// Single values given for list inputs count as one element lists, `null` as none.
pub(crate) fn list_items(value: &GraphValue) -> Vec<&GraphValue> {
    match value {
        GraphValue::List(items) => items.iter().collect(),
        GraphValue::Null => Vec::new(),
        single => vec![single],
    }
}

/// The non-null entry `key` of `object`.
pub(crate) fn entry<'v>(object: &'v GraphObjectValue, key: &str) -> Option<&'v GraphValue> {
    object.get(key).filter(|value| !value.is_null())
}
