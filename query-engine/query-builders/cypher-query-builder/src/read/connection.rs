//! Relay connections.
//!
//! The matched edges are ordered and collected into one list first, so `totalCount`
//! covers every edge passing the filters. The requested window is then cut from that
//! list, its position in the list giving the offset cursor of every edge.
use crate::{
    BuildError, BuildResult, Context,
    auth::auth_predicate,
    filter::where_condition,
    model_extensions::*,
    projection::{project, read_condition},
    read::order_definitions,
};
use cypher_ast::ast::*;
use query_structure::{prelude::*, ConnectionArguments};
use tracing::trace;

/// The variables one connection is built with.
struct Names {
    node: Variable,
    relationship: Option<Variable>,
    edges: Variable,
    total_count: Variable,
    index: Variable,
    cursors: Variable,
}

impl Names {
    fn new(prefix: &Variable, node: Variable, relationship: Option<Variable>) -> Self {
        Self {
            node,
            relationship,
            edges: prefix.suffixed("edges"),
            total_count: prefix.suffixed("totalCount"),
            index: prefix.suffixed("index"),
            cursors: prefix.suffixed("cursors"),
        }
    }
}

/// `moviesConnection`: the connection map is returned as `this`.
pub(crate) fn root(ctx: &Context<'_>, cs: &ConnectionSelection) -> BuildResult<Statement> {
    let this = Variable::new("this");
    let names = Names::new(&this, this.clone(), None);

    let mut statement = collect_edges(ctx, cs, None, &names)?;
    statement.append(window_and_result(ctx, cs, &names, &this)?);

    Ok(statement)
}

/// `actorsConnection` on a node bound to `parent`, returning the subquery and the variable
/// holding the connection map.
pub(crate) fn nested(ctx: &Context<'_>, cs: &ConnectionSelection, parent: &Variable) -> BuildResult<(Clause, Variable)> {
    let field = cs
        .field
        .as_ref()
        .ok_or_else(|| BuildError::InvariantViolation(format!("connection `{}` without a field", cs.alias)))?;

    let node = ctx.allocate(&[parent.name(), &field.name]);
    let result = ctx.allocate(&[parent.name(), &cs.alias]);

    let relationship = ctx
        .schema()
        .properties_type(field)?
        .map(|_| node.suffixed("relationship"));

    let names = Names::new(&result, node, relationship);

    let mut body = collect_edges(ctx, cs, Some((parent, field)), &names)?;
    body.append(window_and_result(ctx, cs, &names, &result)?);

    Ok((Call::new(body).import(parent).into(), result))
}

/// `MATCH … WITH * ORDER BY … WITH collect({ node: n, relationship: r }) AS edges`
fn collect_edges(
    ctx: &Context<'_>,
    cs: &ConnectionSelection,
    parent: Option<(&Variable, &FieldRef)>,
    names: &Names,
) -> BuildResult<Statement> {
    let mut statement = Statement::new();

    if cs.target.is_abstract() {
        statement.push(union_match(ctx, cs, parent, names)?);
    } else {
        statement.push(edge_match(ctx, cs, &cs.target, parent, &names.node, names.relationship.as_ref())?);
    }

    let ordering = order_definitions(&cs.args.order_by, &names.node, names.relationship.as_ref());

    if !ordering.is_empty() {
        statement.push(ordering.into_iter().fold(With::star(), With::order_by));
    }

    let mut edge = vec![("node", Expression::from(&names.node))];

    if let Some(rel) = &names.relationship {
        edge.push(("relationship", Expression::from(rel)));
    }

    statement.push(With::new().item(collect(Expression::map(edge)), Some(names.edges.clone())));
    statement.push(With::variables([&names.edges]).item(size(&names.edges), Some(names.total_count.clone())));

    Ok(statement)
}

fn edge_match(
    ctx: &Context<'_>,
    cs: &ConnectionSelection,
    type_ref: &TypeRef,
    parent: Option<(&Variable, &FieldRef)>,
    node: &Variable,
    relationship: Option<&Variable>,
) -> BuildResult<Match> {
    let target = type_ref.as_node_pattern(Some(node), ctx)?;

    let pattern = match parent {
        Some((parent, field)) => field.hop(parent, relationship, target),
        None => Pattern::from(target),
    };

    let condition = match_condition(ctx, cs, type_ref, node, relationship)?;

    Ok(Match::new(pattern).so_that_opt(condition))
}

/// Interface and union connections match every concrete type in its own branch and
/// return the branch variables under the common names.
fn union_match(
    ctx: &Context<'_>,
    cs: &ConnectionSelection,
    parent: Option<(&Variable, &FieldRef)>,
    names: &Names,
) -> BuildResult<Call> {
    let concrete = ctx.schema().concrete_types(&cs.target)?;
    let mut branches = Vec::with_capacity(concrete.len());

    for type_ref in &concrete {
        trace!(connection = %cs.alias, concrete = %type_ref.name, "connection fan-out branch");

        let node = ctx.allocate(&[names.node.name()]);
        let relationship = names.relationship.as_ref().map(|_| node.suffixed("relationship"));

        let mut ret = Return::new().item(&node, Some(names.node.clone()));

        if let (Some(branch_rel), Some(rel)) = (&relationship, &names.relationship) {
            ret = ret.item(branch_rel, Some(rel.clone()));
        }

        branches.push(
            Statement::new()
                .clause(edge_match(ctx, cs, type_ref, parent, &node, relationship.as_ref())?)
                .clause(ret),
        );
    }

    let call = Call::union(branches);

    Ok(match parent {
        Some((parent, _)) => call.import(parent),
        None => call,
    })
}

/// Read rules and filters of the node, then the edge filter.
fn match_condition(
    ctx: &Context<'_>,
    cs: &ConnectionSelection,
    type_ref: &TypeRef,
    node: &Variable,
    relationship: Option<&Variable>,
) -> BuildResult<Option<Expression>> {
    let args: &ConnectionArguments = &cs.args;

    let node_condition = match node_branch(cs, type_ref) {
        Some(branch) => read_condition(ctx, branch, node, args.filter.as_ref())?,
        None => {
            let auth = auth_predicate(ctx, type_ref, [], AuthOperation::Read, node)?;
            where_condition(ctx, node, auth, args.filter.as_ref())?
        }
    };

    let edge_condition = match (&args.edge_filter, relationship) {
        (Some(filter), Some(rel)) => where_condition(ctx, rel, None, Some(filter))?,
        (Some(_), None) => {
            return Err(BuildError::query_shape(
                format!("{}.where.edge", cs.alias),
                "the relationship has no properties",
            ));
        }
        (None, _) => None,
    };

    Ok(Expression::conjunction(node_condition.into_iter().chain(edge_condition)))
}

fn node_branches(cs: &ConnectionSelection) -> impl Iterator<Item = &ObjectSelection> {
    cs.fields
        .iter()
        .filter_map(|field| match field {
            ConnectionField::Edges { fields, .. } => Some(fields),
            _ => None,
        })
        .flatten()
        .filter_map(|field| match field {
            EdgeField::Node { branches, .. } => Some(branches),
            _ => None,
        })
        .flatten()
}

fn node_branch<'s>(cs: &'s ConnectionSelection, type_ref: &TypeRef) -> Option<&'s ObjectSelection> {
    node_branches(cs).find(|branch| branch.type_ref.name == type_ref.name)
}

/// The page subquery, when edges or page info are requested, and the `RETURN` of the
/// connection map.
fn window_and_result(
    ctx: &Context<'_>,
    cs: &ConnectionSelection,
    names: &Names,
    result: &Variable,
) -> BuildResult<Statement> {
    let skip = cs.args.skip();
    let first = ctx.settings().cap(cs.args.first);

    let needs_window = cs
        .fields
        .iter()
        .any(|field| matches!(field, ConnectionField::Edges { .. } | ConnectionField::PageInfo { .. }));

    let mut statement = Statement::new();
    let mut pages = Vec::new();

    if needs_window {
        let mut window = Statement::new();

        let range = Function::new("range")
            .arg(Expression::int(0))
            .arg(size(&names.edges).arithmetic(ArithmeticOp::Subtract, Expression::int(1)));

        window.push(Unwind::new(range, names.index.clone()));

        let edge = Expression::from(&names.edges).index(&names.index);
        let mut with = With::new().item(edge.clone().property("node"), Some(names.node.clone()));

        if let Some(rel) = &names.relationship {
            with = with.item(edge.property("relationship"), Some(rel.clone()));
        }

        with = with.item(&names.index, None);

        if skip > 0 {
            with = with.skip(Expression::int(skip));
        }

        if let Some(first) = first {
            with = with.limit(Expression::int(first));
        }

        window.push(with);

        let cursor = cursor(ctx, &names.index);
        let mut ret = Return::new();

        for (position, field) in cs.fields.iter().enumerate() {
            let ConnectionField::Edges { fields, .. } = field else {
                continue;
            };

            let (subqueries, map) = edge_map(ctx, cs, fields, names, &cursor)?;
            let page = result.suffixed(&format!("page{position}"));

            window.extend(subqueries);
            ret = ret.item(collect(map), Some(page.clone()));
            pages.push((position, page));
        }

        ret = ret.item(collect(cursor), Some(names.cursors.clone()));
        window.push(ret);

        statement.push(Call::new(window).import(&names.edges));
    }

    let mut entries = Vec::with_capacity(cs.fields.len());

    for (position, field) in cs.fields.iter().enumerate() {
        match field {
            ConnectionField::TotalCount { alias } => entries.push((alias.clone(), Expression::from(&names.total_count))),
            ConnectionField::Edges { alias, .. } => {
                let page = pages
                    .iter()
                    .find(|(p, _)| *p == position)
                    .map(|(_, page)| Expression::from(page))
                    .ok_or_else(|| BuildError::InvariantViolation(format!("no page for `{alias}`")))?;

                entries.push((alias.clone(), page));
            }
            ConnectionField::PageInfo { alias, fields } => {
                entries.push((alias.clone(), page_info(fields, names, skip)));
            }
            ConnectionField::Typename { alias, name } => entries.push((alias.clone(), Expression::string(name))),
        }
    }

    statement.push(Return::new().item(Expression::map(entries), Some(result.clone())));

    Ok(statement)
}

/// `apoc.text.base64Encode("arrayconnection:" + toString(index))`
fn cursor(ctx: &Context<'_>, index: &Variable) -> Expression {
    let offset = Expression::string(&ctx.settings().cursor_prefix)
        .arithmetic(ArithmeticOp::Add, Function::new("toString").arg(index));

    Function::new("apoc.text.base64Encode").arg(offset).into()
}

fn edge_map(
    ctx: &Context<'_>,
    cs: &ConnectionSelection,
    fields: &[EdgeField],
    names: &Names,
    cursor: &Expression,
) -> BuildResult<(Vec<Clause>, Expression)> {
    let mut subqueries = Vec::new();
    let mut entries = Vec::with_capacity(fields.len());

    for field in fields {
        match field {
            EdgeField::Cursor { alias } => entries.push((alias.clone(), cursor.clone())),
            EdgeField::Typename { alias, name } => entries.push((alias.clone(), Expression::string(name))),
            EdgeField::Node { alias, branches } if cs.target.is_abstract() => {
                let (subquery, projection) = abstract_node(ctx, branches, &names.node)?;
                subqueries.push(subquery);
                entries.push((alias.clone(), Expression::from(projection)));
            }
            EdgeField::Node { alias, branches } => {
                let branch = branches
                    .first()
                    .ok_or_else(|| BuildError::InvariantViolation(format!("no selection for `{alias}`")))?;

                let (nested, map) = project(ctx, branch, &names.node)?.into_map(&names.node);
                subqueries.extend(nested);
                entries.push((alias.clone(), map));
            }
            EdgeField::Properties { alias, fields } => {
                let Some(rel) = &names.relationship else {
                    return Err(BuildError::query_shape(
                        format!("{}.edges.{alias}", cs.alias),
                        "the relationship has no properties",
                    ));
                };

                let properties_type = cs
                    .field
                    .as_ref()
                    .map(|field| ctx.schema().properties_type(field))
                    .transpose()?
                    .flatten()
                    .ok_or_else(|| BuildError::InvariantViolation(format!("no properties type for `{alias}`")))?;

                let selection = ObjectSelection::new(properties_type.clone(), fields.clone());
                let (nested, map) = project(ctx, &selection, rel)?.into_map(rel);

                subqueries.extend(nested);
                entries.push((alias.clone(), map));
            }
        }
    }

    Ok((subqueries, Expression::map(entries)))
}

/// Projects a node of an abstract type with the branch of its concrete type.
fn abstract_node(ctx: &Context<'_>, branches: &BranchSelection, node: &Variable) -> BuildResult<(Clause, Variable)> {
    let projection = node.suffixed("projection");
    let mut union = Vec::with_capacity(branches.len());

    for branch in branches {
        let (subqueries, map) = project(ctx, branch, node)?
            .with_type_name(&branch.type_ref)
            .into_map(node);

        let mut statement = Statement::new().clause(With::star().so_that(node.has_labels(&branch.type_ref.labels)));
        statement.extend(subqueries);
        statement.push(Return::new().item(map, Some(projection.clone())));
        union.push(statement);
    }

    Ok((Call::union(union).import(node).into(), projection))
}

fn page_info(fields: &[(String, PageInfoField)], names: &Names, skip: i64) -> Expression {
    let entries = fields.iter().map(|(alias, field)| {
        let value = match field {
            PageInfoField::HasNextPage => {
                let seen = if skip > 0 {
                    Expression::int(skip).arithmetic(ArithmeticOp::Add, size(&names.cursors))
                } else {
                    size(&names.cursors)
                };

                seen.less_than(&names.total_count)
            }
            PageInfoField::HasPreviousPage => Expression::boolean(skip > 0),
            PageInfoField::StartCursor => head(&names.cursors),
            PageInfoField::EndCursor => last(&names.cursors),
            PageInfoField::Typename => Expression::string("PageInfo"),
        };

        (alias.clone(), value)
    });

    Expression::map(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Callbacks, Settings};
    use cypher_ast::visitor::{Cypher, Visitor};
    use expect_test::expect;
    use query_structure::{OrderBy, SortOrder};
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Movie",
                    "fields": [
                        { "name": "title", "type": "String" },
                        {
                            "name": "actors",
                            "type": "Actor",
                            "list": true,
                            "relationship": { "type": "ACTED_IN", "direction": "IN", "properties": "ActedIn" }
                        }
                    ]
                },
                { "name": "Actor", "fields": [{ "name": "name", "type": "String" }] },
                { "name": "ActedIn", "kind": "relationshipProperties", "fields": [{ "name": "screenTime", "type": "Int" }] }
            ]
        }))
        .unwrap()
    }

    fn render(statement: Statement) -> String {
        Cypher::build(statement).unwrap().0
    }

    #[test]
    fn root_counts_need_no_window() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();

        let cs = ConnectionSelection {
            alias: "moviesConnection".into(),
            field: None,
            target: movie.clone(),
            args: ConnectionArguments::default(),
            fields: vec![ConnectionField::TotalCount { alias: "totalCount".into() }],
        };

        expect![[r#"
            MATCH (this:Movie)
            WITH collect({ node: this }) AS this_edges
            WITH this_edges, size(this_edges) AS this_totalCount
            RETURN { totalCount: this_totalCount } AS this"#]]
        .assert_eq(&render(root(&ctx, &cs).unwrap()));
    }

    #[test]
    fn nested_connections_page_over_sorted_edges() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();
        let actor = schema.find_type("Actor").unwrap();
        let acted_in = schema.find_type("ActedIn").unwrap();

        let cs = ConnectionSelection {
            alias: "actorsConnection".into(),
            field: Some(movie.find_field("actors").unwrap().clone()),
            target: actor.clone(),
            args: ConnectionArguments {
                order_by: vec![OrderBy::Edge {
                    field: acted_in.find_field("screenTime").unwrap().clone(),
                    sort_order: SortOrder::Descending,
                }],
                first: Some(2),
                after: Some(0),
                ..Default::default()
            },
            fields: vec![
                ConnectionField::Edges {
                    alias: "edges".into(),
                    fields: vec![
                        EdgeField::Cursor { alias: "cursor".into() },
                        EdgeField::Properties {
                            alias: "properties".into(),
                            fields: vec![SelectedField::Scalar {
                                alias: "screenTime".into(),
                                field: acted_in.find_field("screenTime").unwrap().clone(),
                            }],
                        },
                        EdgeField::Node {
                            alias: "node".into(),
                            branches: vec![ObjectSelection::new(
                                actor.clone(),
                                vec![SelectedField::Scalar {
                                    alias: "name".into(),
                                    field: actor.find_field("name").unwrap().clone(),
                                }],
                            )],
                        },
                    ],
                },
                ConnectionField::PageInfo {
                    alias: "pageInfo".into(),
                    fields: vec![
                        ("hasNextPage".into(), PageInfoField::HasNextPage),
                        ("hasPreviousPage".into(), PageInfoField::HasPreviousPage),
                        ("endCursor".into(), PageInfoField::EndCursor),
                    ],
                },
            ],
        };

        let this = Variable::new("this");
        let (call, _) = nested(&ctx, &cs, &this).unwrap();

        expect![[r#"
            CALL {
                WITH this
                MATCH (this)<-[this_actors0_relationship:ACTED_IN]-(this_actors0:Actor)
                WITH *
                ORDER BY this_actors0_relationship.screenTime DESC
                WITH collect({ node: this_actors0, relationship: this_actors0_relationship }) AS this_actorsConnection0_edges
                WITH this_actorsConnection0_edges, size(this_actorsConnection0_edges) AS this_actorsConnection0_totalCount
                CALL {
                    WITH this_actorsConnection0_edges
                    UNWIND range(0, size(this_actorsConnection0_edges) - 1) AS this_actorsConnection0_index
                    WITH this_actorsConnection0_edges[this_actorsConnection0_index].node AS this_actors0, this_actorsConnection0_edges[this_actorsConnection0_index].relationship AS this_actors0_relationship, this_actorsConnection0_index
                    SKIP 1
                    LIMIT 2
                    RETURN collect({ cursor: apoc.text.base64Encode("arrayconnection:" + toString(this_actorsConnection0_index)), properties: this_actors0_relationship { .screenTime }, node: this_actors0 { .name } }) AS this_actorsConnection0_page0, collect(apoc.text.base64Encode("arrayconnection:" + toString(this_actorsConnection0_index))) AS this_actorsConnection0_cursors
                }
                RETURN { edges: this_actorsConnection0_page0, pageInfo: { hasNextPage: 1 + size(this_actorsConnection0_cursors) < this_actorsConnection0_totalCount, hasPreviousPage: true, endCursor: last(this_actorsConnection0_cursors) } } AS this_actorsConnection0
            }"#]]
        .assert_eq(&render(Statement::from(call)));
    }

    #[test]
    fn edge_filters_need_relationship_properties() {
        let schema = GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Movie",
                    "fields": [{ "name": "actors", "type": "Actor", "list": true, "relationship": { "type": "ACTED_IN", "direction": "IN" } }]
                },
                { "name": "Actor", "fields": [{ "name": "name", "type": "String" }] }
            ]
        }))
        .unwrap();

        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();
        let actor = schema.find_type("Actor").unwrap();

        let cs = ConnectionSelection {
            alias: "actorsConnection".into(),
            field: Some(movie.find_field("actors").unwrap().clone()),
            target: actor.clone(),
            args: ConnectionArguments {
                edge_filter: Some(Filter::And(Vec::new())),
                ..Default::default()
            },
            fields: vec![ConnectionField::TotalCount { alias: "totalCount".into() }],
        };

        let result = nested(&ctx, &cs, &Variable::new("this"));

        assert!(matches!(result, Err(BuildError::QueryShape { .. })));
    }
}
