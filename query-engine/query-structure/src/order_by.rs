use crate::FieldRef;

#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One key of `options.sort` or a connection's `sort`. Keys apply in the order given.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    /// A property of the node.
    Node { field: FieldRef, sort_order: SortOrder },
    /// A property of the relationship, only in connections.
    Edge { field: FieldRef, sort_order: SortOrder },
}

impl OrderBy {
    pub fn node(field: FieldRef, sort_order: SortOrder) -> Self {
        OrderBy::Node { field, sort_order }
    }

    pub fn field(&self) -> &FieldRef {
        match self {
            OrderBy::Node { field, .. } | OrderBy::Edge { field, .. } => field,
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        match self {
            OrderBy::Node { sort_order, .. } | OrderBy::Edge { sort_order, .. } => *sort_order,
        }
    }
}
