pub(crate) mod aggregate;
pub(crate) mod connection;
mod fulltext;

use crate::{
    BuildError, BuildResult, Context,
    model_extensions::*,
    projection::{project, read_condition},
};
use cypher_ast::ast::*;
use query_structure::{prelude::*, OrderBy, QueryArguments, SortOrder};
use tracing::trace;

/// `MATCH (this:Movie)` or `MATCH (parent)-[:T]->(this_f0:Movie)`, with the read rules of
/// the selection and the given filters in its `WHERE`.
pub(crate) fn branch_match(
    ctx: &Context<'_>,
    parent: Option<(&Variable, &FieldRef)>,
    selection: &ObjectSelection,
    node: &Variable,
    filter: Option<&Filter>,
) -> BuildResult<Match> {
    let target = selection.type_ref.as_node_pattern(Some(node), ctx)?;

    let pattern = match parent {
        Some((parent, field)) => field.hop(parent, None, target),
        None => Pattern::from(target),
    };

    let condition = read_condition(ctx, selection, node, filter)?;

    Ok(Match::new(pattern).so_that_opt(condition))
}

pub(crate) fn order(sort_order: SortOrder) -> Order {
    match sort_order {
        SortOrder::Ascending => Order::Asc,
        SortOrder::Descending => Order::Desc,
    }
}

/// Sort keys on matched variables. Edge keys need the relationship variable.
pub(crate) fn order_definitions(order_by: &[OrderBy], node: &Variable, edge: Option<&Variable>) -> Vec<OrderDefinition> {
    order_by
        .iter()
        .filter_map(|key| match key {
            OrderBy::Node { field, sort_order } => Some(field.property_of(node).order(order(*sort_order))),
            OrderBy::Edge { field, sort_order } => edge.map(|edge| field.property_of(edge).order(order(*sort_order))),
        })
        .collect()
}

/// Sort keys on already projected maps, addressed by field name.
pub(crate) fn projected_order_definitions(order_by: &[OrderBy], projected: &Variable) -> Vec<OrderDefinition> {
    order_by
        .iter()
        .filter_map(|key| match key {
            OrderBy::Node { field, sort_order } => Some(projected.property(&field.name).order(order(*sort_order))),
            OrderBy::Edge { .. } => None,
        })
        .collect()
}

/// `WITH * ORDER BY … SKIP … LIMIT …`, only when there is something to apply.
pub(crate) fn paging(ordering: Vec<OrderDefinition>, skip: Option<i64>, limit: Option<i64>) -> Option<Clause> {
    if ordering.is_empty() && skip.is_none() && limit.is_none() {
        return None;
    }

    let mut with = ordering.into_iter().fold(With::star(), With::order_by);

    if let Some(skip) = skip {
        with = with.skip(Expression::int(skip));
    }

    if let Some(limit) = limit {
        with = with.limit(Expression::int(limit));
    }

    Some(with.into())
}

/// A root list read: `movies(where:, options:, fulltext:) { … }`.
pub(crate) fn read(
    ctx: &Context<'_>,
    target: &TypeRef,
    args: &QueryArguments,
    selection: &BranchSelection,
) -> BuildResult<Statement> {
    let limit = ctx.settings().cap(args.limit.or(ctx.settings().default_limit));

    if target.is_abstract() {
        return abstract_read(ctx, args, selection, limit);
    }

    let branch = selection
        .iter()
        .find(|branch| branch.type_ref.name == target.name)
        .ok_or_else(|| BuildError::InvariantViolation(format!("no selection for `{}`", target.name)))?;

    let this = Variable::new("this");
    let mut statement = Statement::new();
    let mut ordering = order_definitions(&args.order_by, &this, None);

    match &args.fulltext {
        Some(search) => {
            statement.append(fulltext::search(ctx, branch, search, &this, args.filter.as_ref())?);

            if ordering.is_empty() {
                ordering.push(fulltext::score().descend());
            }
        }
        None => statement.push(branch_match(ctx, None, branch, &this, args.filter.as_ref())?),
    }

    statement.extend(paging(ordering, args.offset, limit));

    let (subqueries, map) = project(ctx, branch, &this)?.into_map(&this);
    statement.extend(subqueries);
    statement.push(Return::new().item(map, Some(this)));

    Ok(statement)
}

/// Interface roots: `CALL { MATCH (this0:A) … RETURN this0 {…} AS this UNION … }`.
fn abstract_read(
    ctx: &Context<'_>,
    args: &QueryArguments,
    selection: &BranchSelection,
    limit: Option<i64>,
) -> BuildResult<Statement> {
    if args.fulltext.is_some() {
        return Err(BuildError::query_shape("fulltext", "full-text search needs a node type"));
    }

    let this = Variable::new("this");
    let nodes: Vec<Variable> = selection.iter().map(|_| ctx.allocate(&["this"])).collect();
    let mut branches = Vec::with_capacity(nodes.len());

    for (branch, node) in selection.iter().zip(&nodes) {
        trace!(concrete = %branch.type_ref.name, "root fan-out branch");

        let mut statement = Statement::new().clause(branch_match(ctx, None, branch, node, args.filter.as_ref())?);

        let (subqueries, map) = project(ctx, branch, node)?
            .with_type_name(&branch.type_ref)
            .with_sort_keys(&args.order_by, branch, node)
            .into_map(node);

        statement.extend(subqueries);
        statement.push(Return::new().item(map, Some(this.clone())));
        branches.push(statement);
    }

    let mut statement = Statement::new().clause(Call::union(branches));
    statement.extend(paging(
        projected_order_definitions(&args.order_by, &this),
        args.offset,
        limit,
    ));
    statement.push(Return::new().item(&this, None));

    Ok(statement)
}
