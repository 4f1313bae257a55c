//! What a read returns, resolved against the type metadata. Abstract types are already
//! split per concrete type here, so translators never look at fragments.
use crate::{ConnectionArguments, FieldRef, Filter, QueryArguments, TypeRef};

/// The selection on one concrete type.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSelection {
    pub type_ref: TypeRef,
    pub fields: Vec<SelectedField>,
    /// Condition given for this member only, from the per-member `where` of unions.
    pub filter: Option<Filter>,
}

impl ObjectSelection {
    pub fn new(type_ref: TypeRef, fields: Vec<SelectedField>) -> Self {
        Self {
            type_ref,
            fields,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    /// Whether a `__typename` or aliased entry named `key` is already projected.
    pub fn projects(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.alias() == key)
    }
}

/// The selection of a relationship or root field: one entry for node types, one per
/// implementer or member for interfaces and unions, in declaration order.
pub type BranchSelection = Vec<ObjectSelection>;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectedField {
    Scalar { alias: String, field: FieldRef },
    Typename { alias: String },
    Relation(RelationSelection),
    Connection(ConnectionSelection),
    Aggregate(AggregateSelection),
}

impl SelectedField {
    pub fn alias(&self) -> &str {
        match self {
            SelectedField::Scalar { alias, .. } | SelectedField::Typename { alias } => alias,
            SelectedField::Relation(r) => &r.alias,
            SelectedField::Connection(c) => &c.alias,
            SelectedField::Aggregate(a) => &a.alias,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationSelection {
    pub alias: String,
    pub field: FieldRef,
    /// The declared target, possibly abstract.
    pub target: TypeRef,
    pub args: QueryArguments,
    pub branches: BranchSelection,
}

/// `xConnection { totalCount edges { … } pageInfo { … } }`, at the root (`field` is
/// `None`) or on a relationship field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSelection {
    pub alias: String,
    pub field: Option<FieldRef>,
    pub target: TypeRef,
    pub args: ConnectionArguments,
    pub fields: Vec<ConnectionField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionField {
    TotalCount { alias: String },
    Edges { alias: String, fields: Vec<EdgeField> },
    PageInfo { alias: String, fields: Vec<(String, PageInfoField)> },
    Typename { alias: String, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeField {
    Cursor { alias: String },
    Node { alias: String, branches: BranchSelection },
    Properties { alias: String, fields: Vec<SelectedField> },
    Typename { alias: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageInfoField {
    HasNextPage,
    HasPreviousPage,
    StartCursor,
    EndCursor,
    /// Always `PageInfo`.
    Typename,
}

/// `xAggregate { count title { shortest } }` at the root, or on a relationship field
/// with `node` and `edge` groups.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSelection {
    pub alias: String,
    pub field: Option<FieldRef>,
    pub target: TypeRef,
    pub filter: Option<Filter>,
    pub items: Vec<AggregateItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateItem {
    Count { alias: String },
    /// Aggregates of one property of the root nodes.
    Field(FieldAggregate),
    /// Aggregates of the related nodes.
    Node { alias: String, fields: Vec<FieldAggregate> },
    /// Aggregates of the relationship properties.
    Edge { alias: String, fields: Vec<FieldAggregate> },
    Typename { alias: String, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAggregate {
    pub alias: String,
    pub field: FieldRef,
    pub ops: Vec<(String, AggregateOp)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Average,
    Sum,
    Shortest,
    Longest,
}

impl PageInfoField {
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "hasNextPage" => PageInfoField::HasNextPage,
            "hasPreviousPage" => PageInfoField::HasPreviousPage,
            "startCursor" => PageInfoField::StartCursor,
            "endCursor" => PageInfoField::EndCursor,
            "__typename" => PageInfoField::Typename,
            _ => return None,
        };

        Some(field)
    }
}

impl AggregateOp {
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "min" => AggregateOp::Min,
            "max" => AggregateOp::Max,
            "average" => AggregateOp::Average,
            "sum" => AggregateOp::Sum,
            "shortest" => AggregateOp::Shortest,
            "longest" => AggregateOp::Longest,
            _ => return None,
        };

        Some(op)
    }
}
