use crate::{
    BuildError, BuildResult, Context,
    auth::auth_predicate,
    filter::where_condition,
    model_extensions::*,
    read::{self, aggregate, connection},
};
use cypher_ast::ast::*;
use query_structure::{prelude::*, OrderBy};
use tracing::trace;

const RESOLVE_TYPE: &str = "__resolveType";

/// The map a selection projects to and the subqueries computing its nested values.
#[derive(Debug, Default)]
pub(crate) struct Projection {
    pub(crate) subqueries: Vec<Clause>,
    pub(crate) items: Vec<MapItem>,
}

impl Projection {
    /// Tags the projection with its concrete type, for rows of abstract fields.
    pub(crate) fn with_type_name(mut self, type_ref: &TypeRef) -> Self {
        self.items
            .insert(0, MapItem::entry(RESOLVE_TYPE, Expression::string(&type_ref.name)));
        self
    }

    /// Adds the sort keys of `order_by` missing from the selection, so rows can be
    /// ordered after they were projected.
    pub(crate) fn with_sort_keys(mut self, order_by: &[OrderBy], selection: &ObjectSelection, var: &Variable) -> Self {
        for order in order_by {
            if let OrderBy::Node { field, .. } = order {
                if !selection.projects(&field.name) {
                    self.items.push(MapItem::entry(&field.name, field.property_of(var)));
                }
            }
        }

        self
    }

    pub(crate) fn into_map(self, var: &Variable) -> (Vec<Clause>, Expression) {
        (self.subqueries, var.clone().project(self.items))
    }
}

/// Fields whose `@auth` rules take part in reading `selection`.
pub(crate) fn authorized_fields(selection: &ObjectSelection) -> Vec<&FieldRef> {
    selection
        .fields
        .iter()
        .filter_map(|field| match field {
            SelectedField::Scalar { field, .. } => Some(field),
            SelectedField::Relation(rs) => Some(&rs.field),
            SelectedField::Connection(cs) => cs.field.as_ref(),
            SelectedField::Aggregate(agg) => agg.field.as_ref(),
            SelectedField::Typename { .. } => None,
        })
        .collect()
}

pub(crate) fn project(ctx: &Context<'_>, selection: &ObjectSelection, var: &Variable) -> BuildResult<Projection> {
    let mut projection = Projection::default();

    for field in &selection.fields {
        match field {
            SelectedField::Scalar { alias, field } if alias == &field.db_name => {
                projection.items.push(MapItem::property(&field.db_name));
            }
            SelectedField::Scalar { alias, field } => {
                projection.items.push(MapItem::entry(alias, field.property_of(var)));
            }
            SelectedField::Typename { alias } => {
                projection
                    .items
                    .push(MapItem::entry(alias, Expression::string(&selection.type_ref.name)));
            }
            SelectedField::Relation(rs) => {
                let (subquery, result) = relation_subquery(ctx, rs, var)?;
                projection.subqueries.push(subquery);
                projection.items.push(MapItem::entry(&rs.alias, result));
            }
            SelectedField::Connection(cs) => {
                let (subquery, result) = connection::nested(ctx, cs, var)?;
                projection.subqueries.push(subquery);
                projection.items.push(MapItem::entry(&cs.alias, result));
            }
            SelectedField::Aggregate(agg) => {
                let (subqueries, result) = aggregate::nested(ctx, agg, var)?;
                projection.subqueries.extend(subqueries);
                projection.items.push(MapItem::entry(&agg.alias, result));
            }
        }
    }

    Ok(projection)
}

/// `CALL { WITH parent MATCH (parent)-[:T]->(node) … RETURN collect(node {…}) AS node }`
fn relation_subquery(ctx: &Context<'_>, rs: &RelationSelection, parent: &Variable) -> BuildResult<(Clause, Variable)> {
    if rs.target.is_abstract() {
        return abstract_relation_subquery(ctx, rs, parent);
    }

    let branch = rs
        .branches
        .first()
        .ok_or_else(|| BuildError::InvariantViolation(format!("no selection for `{}`", rs.field.name)))?;

    let node = ctx.allocate(&[parent.name(), &rs.field.name]);
    let mut body = Statement::new();

    body.push(read::branch_match(ctx, Some((parent, &rs.field)), branch, &node, rs.args.filter.as_ref())?);
    body.extend(read::paging(
        read::order_definitions(&rs.args.order_by, &node, None),
        rs.args.offset,
        ctx.settings().cap(rs.args.limit),
    ));

    let (subqueries, map) = project(ctx, branch, &node)?.into_map(&node);
    body.extend(subqueries);
    body.push(With::new().item(map, Some(node.clone())));
    body.push(Return::new().item(collect_result(&rs.field, &node), Some(node.clone())));

    Ok((Call::new(body).import(parent).into(), node))
}

/// One `UNION` branch per concrete type, each returning its projection under a common
/// variable that the outer subquery orders, pages and collects.
fn abstract_relation_subquery(
    ctx: &Context<'_>,
    rs: &RelationSelection,
    parent: &Variable,
) -> BuildResult<(Clause, Variable)> {
    let nodes: Vec<Variable> = rs
        .branches
        .iter()
        .map(|_| ctx.allocate(&[parent.name(), &rs.field.name]))
        .collect();

    let result = ctx.allocate(&[parent.name(), &rs.field.name]);
    let mut branches = Vec::with_capacity(nodes.len());

    for (branch, node) in rs.branches.iter().zip(&nodes) {
        trace!(field = %rs.field.name, concrete = %branch.type_ref.name, "relationship fan-out branch");

        let mut statement = Statement::new();
        statement.push(read::branch_match(ctx, Some((parent, &rs.field)), branch, node, rs.args.filter.as_ref())?);

        let (subqueries, map) = project(ctx, branch, node)?
            .with_type_name(&branch.type_ref)
            .with_sort_keys(&rs.args.order_by, branch, node)
            .into_map(node);

        statement.extend(subqueries);
        statement.push(Return::new().item(map, Some(result.clone())));
        branches.push(statement);
    }

    let mut body = Statement::new().clause(Call::union(branches).import(parent));

    body.extend(read::paging(
        read::projected_order_definitions(&rs.args.order_by, &result),
        rs.args.offset,
        ctx.settings().cap(rs.args.limit),
    ));

    body.push(Return::new().item(collect_result(&rs.field, &result), Some(result.clone())));

    Ok((Call::new(body).import(parent).into(), result))
}

fn collect_result(field: &FieldRef, var: &Variable) -> Expression {
    if field.list {
        collect(var)
    } else {
        head(collect(var))
    }
}

/// The `WHERE` of a hop reading `selection`: its read rules, then the filters.
pub(crate) fn read_condition(
    ctx: &Context<'_>,
    selection: &ObjectSelection,
    node: &Variable,
    filter: Option<&query_structure::Filter>,
) -> BuildResult<Option<Expression>> {
    let auth = auth_predicate(
        ctx,
        &selection.type_ref,
        authorized_fields(selection),
        AuthOperation::Read,
        node,
    )?;

    where_condition(ctx, node, auth, filter.into_iter().chain(selection.filter.as_ref()))
}
