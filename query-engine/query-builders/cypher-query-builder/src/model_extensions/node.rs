use crate::{BuildResult, Context};
use cypher_ast::ast::{NodePattern, Variable};
use query_structure::TypeDescriptor;

pub(crate) trait AsNodePattern {
    /// `(var:Label)`, with an `(var:A|B)` label alternative for interfaces and unions.
    fn as_node_pattern(&self, variable: Option<&Variable>, ctx: &Context<'_>) -> BuildResult<NodePattern>;

    /// Labels a concrete node of this type carries.
    fn node_labels(&self) -> &[String];
}

impl AsNodePattern for TypeDescriptor {
    fn as_node_pattern(&self, variable: Option<&Variable>, ctx: &Context<'_>) -> BuildResult<NodePattern> {
        let pattern = match variable {
            Some(var) => NodePattern::new(var.clone()),
            None => NodePattern::anonymous(),
        };

        if !self.is_abstract() {
            return Ok(pattern.labels(self.node_labels()));
        }

        let labels = ctx
            .schema()
            .concrete_types(self)?
            .iter()
            .filter_map(|concrete| concrete.labels.first().cloned())
            .collect::<Vec<_>>();

        Ok(pattern.labels(labels).any_label())
    }

    fn node_labels(&self) -> &[String] {
        &self.labels
    }
}
