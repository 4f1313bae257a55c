//! Root mutations: `createX`, `updateX` and `deleteX`.
mod cardinality;
mod nested;
mod properties;

use self::{
    cardinality::group,
    properties::{create_items, set_clause, update_items},
};
use crate::{
    BuildError, BuildResult, Context,
    auth::{auth_predicate, create_validation},
    filter::where_condition,
    model_extensions::*,
    projection::{project, read_condition},
};
use cypher_ast::ast::*;
use query_structure::prelude::*;

const DATA: &str = "data";
const NODES_DELETED: &str = "nodesDeleted";
const RELATIONSHIPS_DELETED: &str = "relationshipsDeleted";

/// `CREATE (var:Label)` followed by the `SET` of its properties.
pub(super) fn create_node(ctx: &Context<'_>, input: &CreateInput, var: &Variable) -> BuildResult<Vec<Clause>> {
    let pattern = input.type_ref.as_node_pattern(Some(var), ctx)?;
    let mut clauses = vec![Create::new(pattern).into()];

    clauses.extend(set_clause(create_items(ctx, &input.type_ref, var, &input.scalars, &Vec::new())?));

    Ok(clauses)
}

/// The `CREATE` rules and singular relationship checks of a created node.
pub(super) fn creation_checks(ctx: &Context<'_>, input: &CreateInput, var: &Variable) -> BuildResult<Vec<Clause>> {
    let written = input
        .scalars
        .iter()
        .map(|(field, _)| field)
        .chain(input.relations.iter().map(|relation| &relation.field));

    let mut checks: Vec<Clause> = create_validation(ctx, &input.type_ref, written, var)?
        .into_iter()
        .collect();

    checks.extend(cardinality::all_singular(ctx, &input.type_ref, var)?);

    Ok(group(checks))
}

/// `createX(input: [...])`: one subquery per input object, then the created nodes read
/// back through `selection`.
pub(crate) fn create(ctx: &Context<'_>, inputs: &[CreateInput], selection: &ObjectSelection) -> BuildResult<Statement> {
    let this = Variable::new("this");
    let mut statement = Statement::new();
    let mut created = Vec::with_capacity(inputs.len());

    for input in inputs {
        if input.type_ref.is_abstract() {
            return Err(BuildError::query_shape(&input.type_ref.name, "only node types can be created"));
        }

        let node = ctx.allocate(&["this"]);
        let mut body: Statement = create_node(ctx, input, &node)?.into_iter().collect();

        let nested = nested::relation_writes(ctx, &input.type_ref, &node, &input.relations)?;

        if !nested.is_empty() {
            body.push(With::star());
            body.extend(nested);
        }

        body.extend(creation_checks(ctx, input, &node)?);
        body.push(Return::new().item(&node, None));

        statement.push(Call::new(body));
        created.push(Expression::from(&node));
    }

    statement.push(Unwind::new(Expression::List(created), this.clone()));
    statement.extend(response(ctx, selection, &this)?);

    Ok(statement)
}

/// `updateX(where:, update:)`, including the relationship arguments of the update.
pub(crate) fn update(ctx: &Context<'_>, target: &TypeRef, args: &UpdateArgs, selection: &ObjectSelection) -> BuildResult<Statement> {
    if target.is_abstract() {
        return Err(BuildError::query_shape(&target.name, "only node types can be updated"));
    }

    let this = Variable::new("this");
    let update = &args.update;

    let written = update
        .scalars
        .iter()
        .map(|write| &write.field)
        .chain(update.relations.iter().map(|relation| &relation.field));

    let auth = auth_predicate(ctx, target, written, AuthOperation::Update, &this)?;
    let condition = where_condition(ctx, &this, auth, args.filter.as_ref())?;

    let mut statement =
        Statement::new().clause(Match::new(target.as_node_pattern(Some(&this), ctx)?).so_that_opt(condition));

    if !update.is_empty() {
        statement.extend(set_clause(update_items(ctx, target, &this, &update.scalars)?));
    }

    let nested = nested::relation_writes(ctx, target, &this, &update.relations)?;

    if !nested.is_empty() {
        statement.push(With::star());
        statement.extend(nested);
    }

    statement.extend(group(cardinality::touched(ctx, target, &update.relations, &this)?));
    statement.extend(response(ctx, selection, &this)?);

    Ok(statement)
}

/// `deleteX(where:, delete:)`: the matched nodes and their nested deletes are collected
/// into one list, children before their parents, and removed together.
pub(crate) fn delete(ctx: &Context<'_>, target: &TypeRef, args: &DeleteArgs) -> BuildResult<Statement> {
    if target.is_abstract() {
        return Err(BuildError::query_shape(&target.name, "only node types can be deleted"));
    }

    let this = Variable::new("this");
    let deleted = this.suffixed("deleted");
    let deleted_node = deleted.suffixed("node");
    let deleted_relationship = deleted.suffixed("relationship");

    let auth = auth_predicate(ctx, target, [], AuthOperation::Delete, &this)?;
    let condition = where_condition(ctx, &this, auth, args.filter.as_ref())?;

    let mut branches = Vec::new();
    deletion_branches(ctx, target, &this, &Statement::new(), &args.nested, &deleted, &mut branches)?;
    branches.push(Statement::new().clause(Return::new().item(&this, Some(deleted.clone()))));

    let counted = Statement::new()
        .clause(Unwind::new(&deleted, deleted_node.clone()))
        .clause(Match::optional(
            Pattern::new(&deleted_node).related(
                RelationshipPattern::new(Direction::Undirected).variable(deleted_relationship.clone()),
                NodePattern::anonymous(),
            ),
        ))
        .clause(Return::new().item(
            count_distinct(&deleted_relationship),
            Some(Variable::new(RELATIONSHIPS_DELETED)),
        ));

    let removed = Statement::new()
        .clause(Unwind::new(&deleted, deleted_node.clone()))
        .clause(Delete::detach(&deleted_node))
        .clause(Return::new().item(count_star(), Some(Variable::new(NODES_DELETED))));

    let statement = Statement::new()
        .clause(Match::new(target.as_node_pattern(Some(&this), ctx)?).so_that_opt(condition))
        .clause(Call::union(branches).import(&this))
        .clause(With::new().item(collect_distinct(&deleted), Some(deleted.clone())))
        .clause(Call::new(counted).import(&deleted))
        .clause(Call::new(removed).import(&deleted))
        .clause(
            Return::new()
                .item(Variable::new(NODES_DELETED), None)
                .item(Variable::new(RELATIONSHIPS_DELETED), None),
        );

    Ok(statement)
}

/// One `UNION` branch per nested delete, each matching the chain of hops from the root
/// down to the deleted node.
fn deletion_branches(
    ctx: &Context<'_>,
    owner_type: &TypeRef,
    owner: &Variable,
    path: &Statement,
    relations: &[DeleteRelation],
    deleted: &Variable,
    branches: &mut Vec<Statement>,
) -> BuildResult<()> {
    for relation in relations {
        for input in &relation.deletes {
            let node = ctx.allocate(&[owner.name(), &relation.field.name, "delete"]);
            let rel = node.suffixed("relationship");

            let auth = Expression::conjunction(
                auth_predicate(ctx, &input.target, [], AuthOperation::Delete, &node)?
                    .into_iter()
                    .chain(auth_predicate(ctx, owner_type, [&relation.field], AuthOperation::Delete, owner)?),
            );

            let node_condition = where_condition(ctx, &node, auth, input.filter.as_ref())?;
            let edge_condition = where_condition(ctx, &rel, None, input.edge_filter.as_ref())?;
            let condition = Expression::conjunction(node_condition.into_iter().chain(edge_condition));

            let relationship = input.edge_filter.as_ref().map(|_| &rel);
            let pattern = relation
                .field
                .hop(owner, relationship, input.target.as_node_pattern(Some(&node), ctx)?);

            let mut chain = path.clone();
            chain.push(Match::new(pattern).so_that_opt(condition));

            deletion_branches(ctx, &input.target, &node, &chain, &input.nested, deleted, branches)?;

            branches.push(chain.clause(Return::new().item(&node, Some(deleted.clone()))));
        }
    }

    Ok(())
}

/// The written nodes bound to `this`, filtered by their read rules and projected as
/// `data`.
fn response(ctx: &Context<'_>, selection: &ObjectSelection, this: &Variable) -> BuildResult<Vec<Clause>> {
    let mut clauses = Vec::new();

    if let Some(condition) = read_condition(ctx, selection, this, None)? {
        clauses.push(With::star().so_that(condition).into());
    }

    let (subqueries, map) = project(ctx, selection, this)?.into_map(this);

    clauses.extend(subqueries);
    clauses.push(Return::new().item(collect_distinct(map), Some(Variable::new(DATA))).into());

    Ok(clauses)
}
