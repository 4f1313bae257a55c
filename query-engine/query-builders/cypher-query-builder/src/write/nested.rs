//! Nested writes on relationship fields, shared by creates and updates.
//!
//! Every operation runs in its own subquery importing the owner node, finishing with
//! `RETURN count(*)` so the owner row survives operations that match nothing. Targets
//! are concrete here, operations on interface and union fields arrive split per type.
use super::{
    cardinality::{self, group},
    creation_checks, create_node,
    properties::{create_items, set_clause, update_items},
};
use crate::{
    BuildResult, Context,
    auth::auth_predicate,
    filter::where_condition,
    model_extensions::*,
    validation::{FORBIDDEN, validate},
};
use cypher_ast::ast::*;
use query_structure::prelude::*;
use tracing::trace;

/// The edge an operation writes: `owner` of `owner_type` through `field`.
#[derive(Clone, Copy)]
struct Hop<'h> {
    owner_type: &'h TypeRef,
    owner: &'h Variable,
    field: &'h FieldRef,
}

impl Hop<'_> {
    fn variable(&self, ctx: &Context<'_>, kind: &str) -> Variable {
        ctx.allocate(&[self.owner.name(), &self.field.name, kind])
    }

    /// The relationship variable, when the edge carries properties.
    fn relationship(&self, ctx: &Context<'_>, target: &Variable) -> BuildResult<Option<(Variable, TypeRef)>> {
        let properties = ctx.schema().properties_type(self.field)?;
        Ok(properties.map(|properties| (target.suffixed("relationship"), properties.clone())))
    }

    fn pattern(&self, relationship: Option<&Variable>, target: NodePattern) -> Pattern {
        self.field.hop(self.owner, relationship, target)
    }

    /// Rules of `op` on the owner and the written field.
    fn owner_auth(&self, ctx: &Context<'_>, op: AuthOperation) -> BuildResult<Option<Expression>> {
        auth_predicate(ctx, self.owner_type, [self.field], op, self.owner)
    }

    fn subquery(&self, mut body: Statement, target: &Variable) -> Clause {
        body.push(Return::new().item(count_star(), Some(target.suffixed("count"))));
        Call::new(body).import(self.owner).into()
    }
}

/// The subqueries of `writes` on the node bound to `owner`: fields in declaration order,
/// operations of a field by kind, operations of one kind in input order.
pub(crate) fn relation_writes(
    ctx: &Context<'_>,
    owner_type: &TypeRef,
    owner: &Variable,
    writes: &[RelationWrite],
) -> BuildResult<Vec<Clause>> {
    let mut ordered: Vec<&RelationWrite> = writes.iter().collect();
    ordered.sort_by_key(|write| {
        owner_type
            .fields
            .iter()
            .position(|field| field.name == write.field.name)
            .unwrap_or(usize::MAX)
    });

    let mut clauses = Vec::new();

    for write in ordered {
        let hop = Hop {
            owner_type,
            owner,
            field: &write.field,
        };

        let mut ops: Vec<&NestedWrite> = write.ops.iter().collect();
        ops.sort_by_key(|op| op.rank());

        for op in ops {
            trace!(field = %write.field.name, target = %op.target().name, rank = op.rank(), "nested write");

            let clause = match op {
                NestedWrite::Disconnect(input) => Some(disconnect(ctx, hop, input)?),
                NestedWrite::Connect(input) => Some(connect(ctx, hop, input)?),
                NestedWrite::Update(input) => update(ctx, hop, input)?,
                NestedWrite::Delete(input) => Some(delete(ctx, hop, input)?),
                NestedWrite::Create(input) => Some(create(ctx, hop, input)?),
                NestedWrite::ConnectOrCreate(input) => Some(connect_or_create(ctx, hop, input)?),
            };

            clauses.extend(clause);
        }
    }

    Ok(clauses)
}

/// `OPTIONAL MATCH` of the candidates, collected and unwound so a missing side connects
/// nothing instead of failing.
fn connect(ctx: &Context<'_>, hop: Hop<'_>, input: &ConnectInput) -> BuildResult<Clause> {
    let node = hop.variable(ctx, "connect");
    let nodes = node.suffixed("nodes");
    let relationship = hop.relationship(ctx, &node)?;

    let auth = Expression::conjunction(
        auth_predicate(ctx, &input.target, [], AuthOperation::Connect, &node)?
            .into_iter()
            .chain(hop.owner_auth(ctx, AuthOperation::Connect)?),
    );

    let condition = where_condition(ctx, &node, auth, input.filter.as_ref())?;

    let mut body = Statement::new()
        .clause(Match::optional(input.target.as_node_pattern(Some(&node), ctx)?).so_that_opt(condition))
        .clause(With::variables([hop.owner]).item(collect(&node), Some(nodes.clone())))
        .clause(Unwind::new(&nodes, node.clone()))
        .clause(Merge::new(hop.pattern(
            relationship.as_ref().map(|(rel, _)| rel),
            NodePattern::from(&node),
        )));

    if let Some((rel, properties)) = &relationship {
        body.extend(set_clause(create_items(ctx, properties, rel, &input.edge, &Vec::new())?));
    }

    let nested = relation_writes(ctx, &input.target, &node, &input.connect)?;

    if !nested.is_empty() {
        body.push(With::star());
        body.extend(nested);
    }

    let mut checks = cardinality::inverse(ctx, hop.owner_type, hop.field, &input.target, &node, false)?;
    checks.extend(cardinality::touched(ctx, &input.target, &input.connect, &node)?);
    body.extend(group(checks));

    Ok(hop.subquery(body, &node))
}

/// Removes the matched edges, leaving both nodes in place.
fn disconnect(ctx: &Context<'_>, hop: Hop<'_>, input: &DisconnectInput) -> BuildResult<Clause> {
    let node = hop.variable(ctx, "disconnect");
    let rel = node.suffixed("relationship");

    let auth = Expression::conjunction(
        auth_predicate(ctx, &input.target, [], AuthOperation::Disconnect, &node)?
            .into_iter()
            .chain(hop.owner_auth(ctx, AuthOperation::Disconnect)?),
    );

    let node_condition = where_condition(ctx, &node, auth, input.filter.as_ref())?;
    let edge_condition = where_condition(ctx, &rel, None, input.edge_filter.as_ref())?;
    let condition = Expression::conjunction(node_condition.into_iter().chain(edge_condition));

    let target = input.target.as_node_pattern(Some(&node), ctx)?;

    let mut body = Statement::new()
        .clause(Match::new(hop.pattern(Some(&rel), target)).so_that_opt(condition))
        .clause(Delete::new(&rel));

    body.extend(group(cardinality::inverse(
        ctx,
        hop.owner_type,
        hop.field,
        &input.target,
        &node,
        true,
    )?));

    Ok(hop.subquery(body, &node))
}

fn create(ctx: &Context<'_>, hop: Hop<'_>, input: &NestedCreateInput) -> BuildResult<Clause> {
    let node = hop.variable(ctx, "create");
    let relationship = hop.relationship(ctx, &node)?;

    let mut body: Statement = create_node(ctx, &input.node, &node)?.into_iter().collect();

    body.push(Create::new(hop.pattern(
        relationship.as_ref().map(|(rel, _)| rel),
        NodePattern::from(&node),
    )));

    if let Some((rel, properties)) = &relationship {
        body.extend(set_clause(create_items(ctx, properties, rel, &input.edge, &Vec::new())?));
    }

    let nested = relation_writes(ctx, &input.node.type_ref, &node, &input.node.relations)?;

    if !nested.is_empty() {
        body.push(With::star());
        body.extend(nested);
    }

    body.extend(creation_checks(ctx, &input.node, &node)?);

    Ok(hop.subquery(body, &node))
}

/// Skipped when neither the node nor the edge is written.
fn update(ctx: &Context<'_>, hop: Hop<'_>, input: &NestedUpdateInput) -> BuildResult<Option<Clause>> {
    let node_update = input.node.as_ref().filter(|node| !node.is_empty());

    if node_update.is_none() && input.edge.is_empty() {
        return Ok(None);
    }

    let node = hop.variable(ctx, "update");
    let relationship = hop.relationship(ctx, &node)?;

    let written = node_update
        .into_iter()
        .flat_map(|update| update.scalars.iter().map(|write| &write.field).chain(update.relations.iter().map(|rel| &rel.field)));

    let auth = auth_predicate(ctx, &input.target, written, AuthOperation::Update, &node)?;
    let node_condition = where_condition(ctx, &node, auth, input.filter.as_ref())?;

    let edge_condition = match &relationship {
        Some((rel, _)) => where_condition(ctx, rel, None, input.edge_filter.as_ref())?,
        None => None,
    };

    let condition = Expression::conjunction(node_condition.into_iter().chain(edge_condition));
    let target = input.target.as_node_pattern(Some(&node), ctx)?;

    let mut body = Statement::new().clause(
        Match::new(hop.pattern(relationship.as_ref().map(|(rel, _)| rel), target)).so_that_opt(condition),
    );

    let mut items = Vec::new();

    if let Some(update) = node_update {
        items.extend(update_items(ctx, &input.target, &node, &update.scalars)?);
    }

    if let Some((rel, properties)) = relationship.as_ref().filter(|_| !input.edge.is_empty()) {
        items.extend(update_items(ctx, properties, rel, &input.edge)?);
    }

    body.extend(set_clause(items));

    if let Some(update) = node_update {
        let nested = relation_writes(ctx, &input.target, &node, &update.relations)?;

        if !nested.is_empty() {
            body.push(With::star());
            body.extend(nested);
        }

        body.extend(group(cardinality::touched(ctx, &input.target, &update.relations, &node)?));
    }

    Ok(Some(hop.subquery(body, &node)))
}

/// Deletes the related nodes of deeper `delete` arguments first, then the matched ones.
fn delete(ctx: &Context<'_>, hop: Hop<'_>, input: &NestedDeleteInput) -> BuildResult<Clause> {
    let node = hop.variable(ctx, "delete");
    let rel = node.suffixed("relationship");
    let auth = auth_predicate(ctx, &input.target, [], AuthOperation::Delete, &node)?;

    let node_condition = where_condition(ctx, &node, auth, input.filter.as_ref())?;
    let edge_condition = where_condition(ctx, &rel, None, input.edge_filter.as_ref())?;
    let condition = Expression::conjunction(node_condition.into_iter().chain(edge_condition));

    let relationship = input.edge_filter.as_ref().map(|_| &rel);
    let target = input.target.as_node_pattern(Some(&node), ctx)?;

    let mut body = Statement::new().clause(Match::new(hop.pattern(relationship, target)).so_that_opt(condition));

    let mut nested = Vec::new();

    for relation in &input.nested {
        let inner = Hop {
            owner_type: &input.target,
            owner: &node,
            field: &relation.field,
        };

        for child in &relation.deletes {
            nested.push(delete(ctx, inner, child)?);
        }
    }

    if !nested.is_empty() {
        body.push(With::star());
        body.extend(nested);
    }

    body.push(Delete::detach(&node));

    Ok(hop.subquery(body, &node))
}

/// `MERGE` on the unique key, setting the remaining properties only when the node is new.
/// Rules of `CREATE` hold for new nodes only, so the key is matched before the merge.
fn connect_or_create(ctx: &Context<'_>, hop: Hop<'_>, input: &ConnectOrCreateInput) -> BuildResult<Clause> {
    let node = hop.variable(ctx, "connectOrCreate");
    let existed = node.suffixed("existed");
    let relationship = hop.relationship(ctx, &node)?;

    let key: Vec<(&str, Parameter)> = input
        .unique
        .iter()
        .map(|(field, value)| (field.db_name.as_str(), field.write_parameter(&node, value.clone(), ctx)))
        .collect();

    let mut pattern = input.target.as_node_pattern(Some(&node), ctx)?;
    let mut existing = input.target.as_node_pattern(None, ctx)?;

    for (name, parameter) in &key {
        pattern = pattern.property(*name, parameter.clone());
        existing = existing.property(*name, parameter.clone());
    }

    let on_create = create_items(ctx, &input.target, &node, &input.on_create, &input.unique)?;

    let mut body = Statement::new()
        .clause(With::star().item(Expression::exists(PatternQuery::new(existing)), Some(existed.clone())))
        .clause(Merge::new(pattern).on_create(on_create))
        .clause(Merge::new(hop.pattern(
            relationship.as_ref().map(|(rel, _)| rel),
            NodePattern::from(&node),
        )));

    if let Some((rel, properties)) = &relationship {
        body.extend(set_clause(create_items(ctx, properties, rel, &input.edge, &Vec::new())?));
    }

    let auth = Expression::conjunction(
        auth_predicate(ctx, &input.target, [], AuthOperation::Connect, &node)?
            .into_iter()
            .chain(hop.owner_auth(ctx, AuthOperation::Connect)?),
    );

    let written = input.unique.iter().chain(&input.on_create).map(|(field, _)| field);
    let create_auth = auth_predicate(ctx, &input.target, written, AuthOperation::Create, &node)?;

    let mut checks: Vec<Clause> = auth.map(|auth| validate(ctx, auth.not(), FORBIDDEN)).into_iter().collect();
    checks.extend(create_auth.map(|auth| validate(ctx, Expression::from(&existed).or(auth).not(), FORBIDDEN)));
    checks.extend(cardinality::inverse(ctx, hop.owner_type, hop.field, &input.target, &node, false)?);
    body.extend(group(checks));

    Ok(hop.subquery(body, &node))
}
