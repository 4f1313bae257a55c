use crate::{filter::Filter, order_by::OrderBy};
use graph_value::GraphValue;

/// `fulltext: { MovieTitle: { phrase: "matrix" } }`
#[derive(Debug, Clone, PartialEq)]
pub struct FulltextSearch {
    pub index: String,
    pub phrase: GraphValue,
}

/// Arguments of a list read: `where`, `options` and `fulltext`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryArguments {
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub fulltext: Option<FulltextSearch>,
}

impl QueryArguments {
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    pub fn has_ordering(&self) -> bool {
        !self.order_by.is_empty()
    }
}

impl From<Filter> for QueryArguments {
    fn from(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }
}

/// Arguments of a connection read: `where`, `sort`, `first` and `after`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionArguments {
    pub filter: Option<Filter>,
    /// Condition on the relationship properties, nested connections only.
    pub edge_filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub first: Option<i64>,
    /// Position decoded from the `after` cursor.
    pub after: Option<i64>,
}

impl ConnectionArguments {
    /// Number of edges skipped before the window, the position after the cursor.
    pub fn skip(&self) -> i64 {
        self.after.map(|offset| offset.saturating_add(1)).unwrap_or(0)
    }
}
