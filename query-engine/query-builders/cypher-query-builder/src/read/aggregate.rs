use crate::{BuildError, BuildResult, Context, auth::auth_predicate, filter::where_condition, model_extensions::*};
use cypher_ast::ast::*;
use query_structure::{prelude::*, ScalarKind};

/// Where the aggregated nodes come from: the root label or a relationship of `parent`.
#[derive(Clone, Copy)]
struct Source<'s> {
    parent: Option<(&'s Variable, &'s FieldRef)>,
    agg: &'s AggregateSelection,
}

/// `moviesAggregate`: one subquery per item, the aggregate map returned as `this`.
pub(crate) fn root(ctx: &Context<'_>, agg: &AggregateSelection) -> BuildResult<Statement> {
    let source = Source { parent: None, agg };
    let (subqueries, map) = aggregate(ctx, source, &["this"])?;

    let mut statement: Statement = subqueries.into_iter().collect();
    statement.push(Return::new().item(map, Some(Variable::new("this"))));

    Ok(statement)
}

/// `actorsAggregate` on a node bound to `parent`.
pub(crate) fn nested(ctx: &Context<'_>, agg: &AggregateSelection, parent: &Variable) -> BuildResult<(Vec<Clause>, Expression)> {
    let field = agg
        .field
        .as_ref()
        .ok_or_else(|| BuildError::InvariantViolation(format!("aggregate `{}` without a field", agg.alias)))?;

    let source = Source {
        parent: Some((parent, field)),
        agg,
    };

    aggregate(ctx, source, &[parent.name(), &agg.alias])
}

fn aggregate(ctx: &Context<'_>, source: Source<'_>, prefix: &[&str]) -> BuildResult<(Vec<Clause>, Expression)> {
    let mut subqueries = Vec::new();
    let mut entries = Vec::with_capacity(source.agg.items.len());

    for item in &source.agg.items {
        match item {
            AggregateItem::Count { alias } => {
                let result = result_variable(ctx, prefix, alias);
                let node = node_variable(ctx, source);

                let body = Statement::new()
                    .clause(source_match(ctx, source, &node, None)?)
                    .clause(Return::new().item(count(&node), Some(result.clone())));

                subqueries.push(subquery(source, body));
                entries.push((alias.clone(), Expression::from(result)));
            }
            AggregateItem::Field(fa) => {
                let (subquery, result) = field_aggregate(ctx, source, prefix, fa, false)?;
                subqueries.push(subquery);
                entries.push((fa.alias.clone(), Expression::from(result)));
            }
            AggregateItem::Node { alias, fields } | AggregateItem::Edge { alias, fields } => {
                let on_edge = matches!(item, AggregateItem::Edge { .. });

                if source.parent.is_none() {
                    return Err(BuildError::query_shape(
                        format!("{}.{alias}", source.agg.alias),
                        "only relationship aggregates have node and edge groups",
                    ));
                }

                let mut group = Vec::with_capacity(fields.len());

                for fa in fields {
                    let (subquery, result) = field_aggregate(ctx, source, prefix, fa, on_edge)?;
                    subqueries.push(subquery);
                    group.push((fa.alias.clone(), Expression::from(result)));
                }

                entries.push((alias.clone(), Expression::map(group)));
            }
            AggregateItem::Typename { alias, name } => entries.push((alias.clone(), Expression::string(name))),
        }
    }

    Ok((subqueries, Expression::map(entries)))
}

/// Aggregates of one property of the matched nodes, or of their relationships when
/// `on_edge` is set.
fn field_aggregate(
    ctx: &Context<'_>,
    source: Source<'_>,
    prefix: &[&str],
    fa: &FieldAggregate,
    on_edge: bool,
) -> BuildResult<(Clause, Variable)> {
    let path = format!("{}.{}", source.agg.alias, fa.alias);

    for (_, op) in &fa.ops {
        check_operation(&path, &fa.field, *op)?;
    }

    let result = result_variable(ctx, prefix, &fa.alias);
    let node = node_variable(ctx, source);

    let relationship = if on_edge {
        let has_properties = match source.parent {
            Some((_, field)) => ctx.schema().properties_type(field)?.is_some(),
            None => false,
        };

        if !has_properties {
            return Err(BuildError::query_shape(path, "the relationship has no properties"));
        }

        Some(node.suffixed("relationship"))
    } else {
        None
    };

    let owner = relationship.as_ref().unwrap_or(&node);
    let property = fa.field.property_of(owner);

    let mut body = Statement::new().clause(source_match(ctx, source, &node, relationship.as_ref())?);

    let textual = fa.field.scalar_kind().is_some_and(|kind| kind.is_textual());

    let map = if textual {
        let list = result.suffixed("list");

        body.push(With::variables([owner]).order_by(size(property.clone()).ascend()));
        body.push(With::new().item(collect(property), Some(list.clone())));

        Expression::map(fa.ops.iter().map(|(alias, op)| {
            let value = match op {
                AggregateOp::Longest => last(&list),
                _ => head(&list),
            };

            (alias.clone(), value)
        }))
    } else {
        Expression::map(fa.ops.iter().map(|(alias, op)| {
            let function = match op {
                AggregateOp::Min => "min",
                AggregateOp::Max => "max",
                AggregateOp::Average => "avg",
                _ => "sum",
            };

            (alias.clone(), Expression::from(Function::new(function).arg(property.clone())))
        }))
    };

    body.push(Return::new().item(map, Some(result.clone())));

    Ok((subquery(source, body), result))
}

/// Rejects operations the kind of the field does not support.
fn check_operation(path: &str, field: &FieldRef, op: AggregateOp) -> BuildResult<()> {
    let kind = match field.scalar_kind() {
        Some(ScalarKind::Boolean | ScalarKind::Point) | None => None,
        Some(_) if field.list => None,
        kind => kind,
    };

    let Some(kind) = kind else {
        return Err(BuildError::query_shape(path, format!("`{}` cannot be aggregated", field.name)));
    };

    let supported = match op {
        AggregateOp::Sum | AggregateOp::Average => kind.is_numeric(),
        AggregateOp::Min | AggregateOp::Max => kind.is_ordered(),
        AggregateOp::Shortest | AggregateOp::Longest => kind.is_textual(),
    };

    if supported {
        Ok(())
    } else {
        Err(BuildError::query_shape(
            path,
            format!("`{op:?}` is not available on `{}` fields", kind),
        ))
    }
}

fn node_variable(ctx: &Context<'_>, source: Source<'_>) -> Variable {
    match source.parent {
        Some((parent, field)) => ctx.allocate(&[parent.name(), &field.name]),
        None => ctx.allocate(&["this"]),
    }
}

fn result_variable(ctx: &Context<'_>, prefix: &[&str], alias: &str) -> Variable {
    let mut path = prefix.to_vec();
    path.push(alias);
    ctx.allocate(&path)
}

/// The match every item re-runs: the nodes passing the read rules and the aggregate's
/// `where`.
fn source_match(ctx: &Context<'_>, source: Source<'_>, node: &Variable, relationship: Option<&Variable>) -> BuildResult<Match> {
    let agg = source.agg;
    let target = agg.target.as_node_pattern(Some(node), ctx)?;

    let pattern = match source.parent {
        Some((parent, field)) => field.hop(parent, relationship, target),
        None => Pattern::from(target),
    };

    let fields = agg.items.iter().flat_map(node_fields);

    let auth = auth_predicate(ctx, &agg.target, fields.map(|fa| &fa.field), AuthOperation::Read, node)?;
    let condition = where_condition(ctx, node, auth, agg.filter.as_ref())?;

    Ok(Match::new(pattern).so_that_opt(condition))
}

/// Node properties an item aggregates, whose read rules apply.
fn node_fields(item: &AggregateItem) -> &[FieldAggregate] {
    match item {
        AggregateItem::Field(fa) => std::slice::from_ref(fa),
        AggregateItem::Node { fields, .. } => fields,
        _ => &[],
    }
}

fn subquery(source: Source<'_>, body: Statement) -> Clause {
    let call = Call::new(body);

    match source.parent {
        Some((parent, _)) => call.import(parent).into(),
        None => call.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Callbacks, Settings};
    use cypher_ast::visitor::{Cypher, Visitor};
    use expect_test::expect;
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Movie",
                    "fields": [
                        { "name": "title", "type": "String" },
                        { "name": "released", "type": "Int" },
                        {
                            "name": "actors",
                            "type": "Actor",
                            "list": true,
                            "relationship": { "type": "ACTED_IN", "direction": "IN", "properties": "ActedIn" }
                        }
                    ]
                },
                { "name": "Actor", "fields": [{ "name": "name", "type": "String" }, { "name": "active", "type": "Boolean" }] },
                { "name": "ActedIn", "kind": "relationshipProperties", "fields": [{ "name": "screenTime", "type": "Int" }] }
            ]
        }))
        .unwrap()
    }

    fn field_aggregate(schema: &GraphSchema, type_name: &str, field: &str, ops: &[(&str, AggregateOp)]) -> FieldAggregate {
        FieldAggregate {
            alias: field.to_owned(),
            field: schema.find_field(type_name, field).unwrap().clone(),
            ops: ops.iter().map(|(alias, op)| (alias.to_string(), *op)).collect(),
        }
    }

    #[test]
    fn root_aggregates_run_one_subquery_per_item() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();

        let agg = AggregateSelection {
            alias: "moviesAggregate".into(),
            field: None,
            target: movie.clone(),
            filter: None,
            items: vec![
                AggregateItem::Count { alias: "count".into() },
                AggregateItem::Field(field_aggregate(
                    &schema,
                    "Movie",
                    "title",
                    &[("shortest", AggregateOp::Shortest), ("longest", AggregateOp::Longest)],
                )),
                AggregateItem::Field(field_aggregate(&schema, "Movie", "released", &[("max", AggregateOp::Max)])),
            ],
        };

        expect![[r#"
            CALL {
                MATCH (this0:Movie)
                RETURN count(this0) AS this_count0
            }
            CALL {
                MATCH (this1:Movie)
                WITH this1
                ORDER BY size(this1.title) ASC
                WITH collect(this1.title) AS this_title0_list
                RETURN { shortest: head(this_title0_list), longest: last(this_title0_list) } AS this_title0
            }
            CALL {
                MATCH (this2:Movie)
                RETURN { max: max(this2.released) } AS this_released0
            }
            RETURN { count: this_count0, title: this_title0, released: this_released0 } AS this"#]]
        .assert_eq(&Cypher::build(root(&ctx, &agg).unwrap()).unwrap().0);
    }

    #[test]
    fn relationship_aggregates_group_node_and_edge_values() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();
        let actor = schema.find_type("Actor").unwrap();

        let agg = AggregateSelection {
            alias: "actorsAggregate".into(),
            field: Some(movie.find_field("actors").unwrap().clone()),
            target: actor.clone(),
            filter: None,
            items: vec![
                AggregateItem::Count { alias: "count".into() },
                AggregateItem::Edge {
                    alias: "edge".into(),
                    fields: vec![field_aggregate(&schema, "ActedIn", "screenTime", &[("sum", AggregateOp::Sum)])],
                },
            ],
        };

        let this = Variable::new("this");
        let (subqueries, map) = nested(&ctx, &agg, &this).unwrap();

        let mut statement: Statement = subqueries.into_iter().collect();
        statement.push(Return::new().item(map, None));

        expect![[r#"
            CALL {
                WITH this
                MATCH (this)<-[:ACTED_IN]-(this_actors0:Actor)
                RETURN count(this_actors0) AS this_actorsAggregate_count0
            }
            CALL {
                WITH this
                MATCH (this)<-[this_actors1_relationship:ACTED_IN]-(this_actors1:Actor)
                RETURN { sum: sum(this_actors1_relationship.screenTime) } AS this_actorsAggregate_screenTime0
            }
            RETURN { count: this_actorsAggregate_count0, edge: { screenTime: this_actorsAggregate_screenTime0 } }"#]]
        .assert_eq(&Cypher::build(statement).unwrap().0);
    }

    #[test]
    fn unsupported_operations_are_rejected() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();

        for (field, op) in [("title", AggregateOp::Sum), ("released", AggregateOp::Shortest)] {
            let agg = AggregateSelection {
                alias: "moviesAggregate".into(),
                field: None,
                target: movie.clone(),
                filter: None,
                items: vec![AggregateItem::Field(field_aggregate(&schema, "Movie", field, &[("x", op)]))],
            };

            let error = root(&ctx, &agg).unwrap_err();
            assert!(matches!(error, BuildError::QueryShape { ref path, .. } if path == &format!("moviesAggregate.{field}")));
        }
    }
}
