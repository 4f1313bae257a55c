//! Filter trees as extracted from `where` arguments and `@auth` rule templates.
mod compare;
mod parse;
mod relation;
mod scalar;

pub use compare::*;
pub use parse::FilterParser;
pub use relation::*;
pub use scalar::*;

use crate::TypeRef;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Scalar(ScalarFilter),
    Relation(RelationFilter),
    RelationCount(RelationCountFilter),
    /// The node is one of the given concrete types.
    Typename(Vec<TypeRef>),
}

impl Filter {
    /// Conjunction collapsing to the only child when given one.
    pub fn and(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Filter::And(filters)
        }
    }

    /// Disjunction collapsing to the only child when given one.
    pub fn or(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Filter::Or(filters)
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// An empty conjunction, disjunction or negation of one constrains nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::And(filters) | Filter::Or(filters) => filters.iter().all(Filter::is_empty),
            Filter::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Whether any leaf of this filter refers to a caller claim.
    pub fn references_claims(&self) -> bool {
        match self {
            Filter::And(filters) | Filter::Or(filters) => filters.iter().any(Filter::references_claims),
            Filter::Not(inner) => inner.references_claims(),
            Filter::Scalar(scalar) => scalar.condition.value().is_some_and(ConditionValue::is_claim),
            Filter::Relation(relation) => {
                relation.node.as_deref().is_some_and(Filter::references_claims)
                    || relation.edge.as_deref().is_some_and(Filter::references_claims)
            }
            Filter::RelationCount(count) => count.condition.value().is_some_and(ConditionValue::is_claim),
            Filter::Typename(_) => false,
        }
    }
}

impl From<ScalarFilter> for Filter {
    fn from(sf: ScalarFilter) -> Self {
        Filter::Scalar(sf)
    }
}

impl From<RelationFilter> for Filter {
    fn from(rf: RelationFilter) -> Self {
        Filter::Relation(rf)
    }
}

impl From<RelationCountFilter> for Filter {
    fn from(rc: RelationCountFilter) -> Self {
        Filter::RelationCount(rc)
    }
}
