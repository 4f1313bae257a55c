use super::{Filter, ScalarCondition};
use crate::{FieldRef, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationQuantifier {
    /// The singular related node exists and matches.
    ToOne,
    /// At least one related node matches.
    Some,
    /// Every related node matches.
    All,
    /// No related node matches.
    None,
    /// Exactly one related node matches.
    Single,
}

/// A filter on the nodes (and edges) behind a relationship field.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationFilter {
    pub field: FieldRef,
    /// The related type. For union fields this is the member the filter was given for.
    pub target: TypeRef,
    pub quantifier: RelationQuantifier,
    /// `None` only tests for existence.
    pub node: Option<Box<Filter>>,
    /// Condition on the relationship properties.
    pub edge: Option<Box<Filter>>,
}

impl RelationFilter {
    pub fn new(field: FieldRef, target: TypeRef, quantifier: RelationQuantifier) -> Self {
        Self {
            field,
            target,
            quantifier,
            node: None,
            edge: None,
        }
    }

    pub fn with_node(mut self, filter: Filter) -> Self {
        self.node = Some(Box::new(filter));
        self
    }

    pub fn with_edge(mut self, filter: Filter) -> Self {
        self.edge = Some(Box::new(filter));
        self
    }
}

/// `actorsAggregate: { count_GT: 2 }`
#[derive(Debug, Clone, PartialEq)]
pub struct RelationCountFilter {
    pub field: FieldRef,
    pub target: TypeRef,
    /// One of the equality or ordering conditions.
    pub condition: ScalarCondition,
}
