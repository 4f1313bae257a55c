use cypher_ast::ast::{Direction, NodePattern, Pattern, RelationshipPattern, Variable};
use query_structure::{FieldDescriptor, RelationDirection};

pub(crate) trait RelationshipFieldExt {
    /// `-[rel:TYPE]->` in the direction the field traverses.
    fn as_relationship_pattern(&self, variable: Option<&Variable>) -> RelationshipPattern;

    /// `(source)-[rel:TYPE]->(target)`
    fn hop(&self, source: &Variable, relationship: Option<&Variable>, target: NodePattern) -> Pattern {
        Pattern::new(source).related(self.as_relationship_pattern(relationship), target)
    }
}

impl RelationshipFieldExt for FieldDescriptor {
    fn as_relationship_pattern(&self, variable: Option<&Variable>) -> RelationshipPattern {
        let Some(rel) = self.relationship() else {
            return RelationshipPattern::new(Direction::Undirected);
        };

        let direction = match rel.direction {
            RelationDirection::Out => Direction::Outgoing,
            RelationDirection::In => Direction::Incoming,
        };

        let pattern = RelationshipPattern::new(direction).rel_type(&rel.rel_type);

        match variable {
            Some(var) => pattern.variable(var.clone()),
            None => pattern,
        }
    }
}
