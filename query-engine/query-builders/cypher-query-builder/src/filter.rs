use crate::{BuildError, BuildResult, Context, model_extensions::*};
use cypher_ast::ast::*;
use query_structure::*;

/// Renders [`Filter`] trees into `WHERE` conditions.
///
/// Every parameter bound by one visitor shares the namespace `{scope}{token}_param{n}`,
/// including those of conditions nested inside relationship subqueries.
pub(crate) struct FilterVisitor<'c, 'a> {
    ctx: &'c Context<'a>,
    scope: Variable,
    token: &'static str,
}

impl<'c, 'a> FilterVisitor<'c, 'a> {
    pub(crate) fn new(ctx: &'c Context<'a>, scope: &Variable, token: &'static str) -> Self {
        Self {
            ctx,
            scope: scope.clone(),
            token,
        }
    }

    /// A filter constraining nothing yields no condition.
    pub(crate) fn visit_filter(&self, filter: &Filter, var: &Variable) -> BuildResult<Option<Expression>> {
        match filter {
            Filter::And(filters) => {
                let parts = self.visit_all(filters, var)?;
                Ok(Expression::conjunction(parts.into_iter().flatten()))
            }
            Filter::Or(filters) => {
                let parts = self.visit_all(filters, var)?;

                // One unconstrained alternative makes the whole disjunction true.
                if parts.iter().any(Option::is_none) {
                    return Ok(None);
                }

                Ok(Expression::disjunction(parts.into_iter().flatten()))
            }
            Filter::Not(inner) => Ok(self.visit_filter(inner, var)?.map(Expression::not)),
            Filter::Scalar(filter) => self.visit_scalar_filter(filter, var).map(Some),
            Filter::Relation(filter) => self.visit_relation_filter(filter, var),
            Filter::RelationCount(filter) => self.visit_relation_count_filter(filter, var).map(Some),
            Filter::Typename(types) => Ok(Expression::disjunction(
                types.iter().map(|t| var.has_labels(t.node_labels())),
            )),
        }
    }

    fn visit_all(&self, filters: &[Filter], var: &Variable) -> BuildResult<Vec<Option<Expression>>> {
        filters.iter().map(|f| self.visit_filter(f, var)).collect()
    }

    fn visit_scalar_filter(&self, filter: &ScalarFilter, var: &Variable) -> BuildResult<Expression> {
        let property = filter.field.property_of(var);

        let condition = match &filter.condition {
            ScalarCondition::Equals(value) => property.equals(self.parameter(value)?),
            ScalarCondition::Contains(value) => property.contains(self.parameter(value)?),
            ScalarCondition::StartsWith(value) => property.starts_with(self.parameter(value)?),
            ScalarCondition::EndsWith(value) => property.ends_with(self.parameter(value)?),
            ScalarCondition::Matches(value) => property.matches(self.parameter(value)?),
            ScalarCondition::LessThan(value) => property.less_than(self.parameter(value)?),
            ScalarCondition::LessThanOrEquals(value) => property.less_than_or_equals(self.parameter(value)?),
            ScalarCondition::GreaterThan(value) => property.greater_than(self.parameter(value)?),
            ScalarCondition::GreaterThanOrEquals(value) => property.greater_than_or_equals(self.parameter(value)?),
            ScalarCondition::In(value) => property.is_in(self.parameter(value)?),
            ScalarCondition::IncludesElement(value) => self.parameter(value)?.is_in(property),
            ScalarCondition::IsNull => property.is_null(),
        };

        Ok(condition)
    }

    fn visit_relation_filter(&self, filter: &RelationFilter, var: &Variable) -> BuildResult<Option<Expression>> {
        let target_var = self.ctx.allocate(&[var.name(), &filter.field.name]);
        let edge_var = filter.edge.as_ref().map(|_| target_var.suffixed("relationship"));

        let target = filter.target.as_node_pattern(Some(&target_var), self.ctx)?;
        let pattern = filter.field.hop(var, edge_var.as_ref(), target);

        let node_condition = match &filter.node {
            Some(node) => self.visit_filter(node, &target_var)?,
            None => None,
        };

        let edge_condition = match (&filter.edge, &edge_var) {
            (Some(edge), Some(edge_var)) => self.visit_filter(edge, edge_var)?,
            _ => None,
        };

        let condition = Expression::conjunction(node_condition.into_iter().chain(edge_condition));

        let expression = match filter.quantifier {
            RelationQuantifier::ToOne | RelationQuantifier::Some => {
                Expression::exists(PatternQuery::new(pattern).so_that_opt(condition))
            }
            RelationQuantifier::None => Expression::exists(PatternQuery::new(pattern).so_that_opt(condition)).not(),
            RelationQuantifier::All => match condition {
                Some(condition) => Expression::exists(PatternQuery::new(pattern).so_that(condition.not())).not(),
                None => return Ok(None),
            },
            RelationQuantifier::Single => {
                Expression::count_of(PatternQuery::new(pattern).so_that_opt(condition)).equals(Expression::int(1))
            }
        };

        Ok(Some(expression))
    }

    fn visit_relation_count_filter(&self, filter: &RelationCountFilter, var: &Variable) -> BuildResult<Expression> {
        let target = filter.target.as_node_pattern(None, self.ctx)?;
        let count = Expression::count_of(PatternQuery::new(filter.field.hop(var, None, target)));

        let condition = match &filter.condition {
            ScalarCondition::Equals(value) => count.equals(self.parameter(value)?),
            ScalarCondition::LessThan(value) => count.less_than(self.parameter(value)?),
            ScalarCondition::LessThanOrEquals(value) => count.less_than_or_equals(self.parameter(value)?),
            ScalarCondition::GreaterThan(value) => count.greater_than(self.parameter(value)?),
            ScalarCondition::GreaterThanOrEquals(value) => count.greater_than_or_equals(self.parameter(value)?),
            condition => {
                return Err(BuildError::InvariantViolation(format!(
                    "unsupported count condition {condition:?} on `{}`",
                    filter.field.name
                )));
            }
        };

        Ok(condition)
    }

    fn parameter(&self, value: &ConditionValue) -> BuildResult<Parameter> {
        let value = match value {
            ConditionValue::Value(value) => value.clone(),
            ConditionValue::Claim(path) => self.ctx.claim(path)?,
        };

        let name = self.ctx.predicate_parameter(&self.scope, self.token);

        Ok(Parameter::new(name, value))
    }
}

/// The `WHERE` condition of a match site: authorization first, then the caller's filters.
pub(crate) fn where_condition<'f>(
    ctx: &Context<'_>,
    var: &Variable,
    auth: Option<Expression>,
    filters: impl IntoIterator<Item = &'f Filter>,
) -> BuildResult<Option<Expression>> {
    let visitor = FilterVisitor::new(ctx, var, "");
    let mut parts: Vec<Expression> = auth.into_iter().collect();

    for filter in filters {
        parts.extend(visitor.visit_filter(filter, var)?);
    }

    Ok(Expression::conjunction(parts))
}
