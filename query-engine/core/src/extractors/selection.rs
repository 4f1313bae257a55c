use super::*;
use crate::query_document::Selection;
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use query_structure::{
    FieldRef, Filter, TypeDescriptor, TypeKind, TypeRef,
    prelude::{
        AggregateItem, AggregateOp, AggregateSelection, BranchSelection, ConnectionField, ConnectionSelection,
        EdgeField, FieldAggregate, ObjectSelection, PageInfoField, RelationSelection, SelectedField,
    },
};
use tracing::trace;

const TYPENAME: &str = "__typename";

/// One [`ObjectSelection`] per concrete type behind `target`, in declaration order.
/// A sub-selection applies to a concrete type when it has no type condition or its
/// condition covers the type. Union members get their entry of `member_filters`.
pub fn extract_branches(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    selection: &Selection,
    member_filters: &IndexMap<String, Filter>,
    path: &str,
) -> CoreResult<BranchSelection> {
    let concrete = ctx.schema.concrete_types(target)?;
    let mut branches = Vec::with_capacity(concrete.len());

    for type_ref in concrete {
        let mut object = ObjectSelection::new(type_ref.clone(), Vec::new());

        for nested in selection.nested_selections() {
            let applies = nested
                .type_condition()
                .is_none_or(|condition| condition == target.name || ctx.schema.covers(condition, &type_ref));

            if !applies || object.projects(nested.response_key()) {
                continue;
            }

            let path = format!("{path}.{}", nested.response_key());

            // Untyped selections on unions can only ask for the type name.
            if target.kind == TypeKind::Union && nested.type_condition().is_none() && nested.name() != TYPENAME {
                return Err(CoreError::query_shape(
                    path,
                    format!("fields of `{}` must be selected in a fragment on one of its members", target.name),
                ));
            }

            object.fields.push(extract_field(ctx, &type_ref, nested, &path)?);
        }

        trace!(target = %target.name, concrete = %type_ref.name, fields = object.fields.len(), "selection branch");

        let filter = member_filters.get(&type_ref.name).cloned();
        branches.push(object.with_filter(filter));
    }

    Ok(branches)
}

fn extract_field(
    ctx: ExtractorContext<'_>,
    owner: &TypeRef,
    selection: &Selection,
    path: &str,
) -> CoreResult<SelectedField> {
    let alias = selection.response_key().to_owned();
    let name = selection.name();

    if name == TYPENAME {
        return Ok(SelectedField::Typename { alias });
    }

    if let Some(field) = owner.find_field(name) {
        if !field.is_relationship() {
            return Ok(SelectedField::Scalar {
                alias,
                field: field.clone(),
            });
        }

        return extract_relation(ctx, field, selection, path).map(SelectedField::Relation);
    }

    if let Some(field) = relationship_with_suffix(owner, name, "Connection") {
        let target = ctx.schema.related_type(field)?;
        return extract_connection(ctx, Some((&**owner, field)), target, selection, path).map(SelectedField::Connection);
    }

    if let Some(field) = relationship_with_suffix(owner, name, "Aggregate") {
        let target = ctx.schema.related_type(field)?;
        return extract_aggregate(ctx, Some((&**owner, field)), target, selection, path).map(SelectedField::Aggregate);
    }

    Err(CoreError::query_shape(
        path,
        format!("`{}` has no field `{name}`", owner.name),
    ))
}

/// `actorsConnection` and `actorsAggregate` for the relationship field `actors`.
fn relationship_with_suffix<'t>(owner: &'t TypeDescriptor, name: &str, suffix: &str) -> Option<&'t FieldRef> {
    name.strip_suffix(suffix)
        .and_then(|base| owner.find_field(base))
        .filter(|field| field.is_relationship())
}

fn extract_relation(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    selection: &Selection,
    path: &str,
) -> CoreResult<RelationSelection> {
    let target = ctx.schema.related_type(field)?;
    let args = extract_query_args(ctx, target, selection.arguments(), path)?;
    let member_filters = union_filters(ctx, target, selection, path)?;
    let branches = extract_branches(ctx, target, selection, &member_filters, path)?;

    Ok(RelationSelection {
        alias: selection.response_key().to_owned(),
        field: field.clone(),
        target: target.clone(),
        args,
        branches,
    })
}

fn union_filters(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    selection: &Selection,
    path: &str,
) -> CoreResult<IndexMap<String, Filter>> {
    match selection.argument("where") {
        Some(value) if target.kind == TypeKind::Union => {
            extract_member_filters(ctx, target, value, &format!("{path}.where"))
        }
        _ => Ok(IndexMap::new()),
    }
}

/// A root connection (`owner` is `None`) or the connection of a relationship field.
pub fn extract_connection(
    ctx: ExtractorContext<'_>,
    owner: Option<(&TypeDescriptor, &FieldRef)>,
    target: &TypeRef,
    selection: &Selection,
    path: &str,
) -> CoreResult<ConnectionSelection> {
    let field = owner.map(|(_, field)| field);
    let args = extract_connection_args(ctx, target, field, selection.arguments(), path)?;
    let member_filters = connection_union_filters(ctx, target, selection, path)?;

    let (connection_name, edge_name) = match owner {
        Some((owner, field)) => {
            let stem = format!("{}{}", owner.name, field.name.to_upper_camel_case());
            (format!("{stem}Connection"), format!("{stem}Relationship"))
        }
        None => (
            format!("{}Connection", target.plural.to_upper_camel_case()),
            format!("{}Edge", target.name),
        ),
    };

    let mut fields = Vec::new();

    for nested in selection.nested_selections() {
        let alias = nested.response_key().to_owned();
        let path = format!("{path}.{alias}");

        let connection_field = match nested.name() {
            "totalCount" => ConnectionField::TotalCount { alias },
            "edges" => ConnectionField::Edges {
                fields: extract_edge_fields(ctx, field, target, nested, &member_filters, &edge_name, &path)?,
                alias,
            },
            "pageInfo" => ConnectionField::PageInfo {
                fields: extract_page_info(nested, &path)?,
                alias,
            },
            TYPENAME => ConnectionField::Typename {
                alias,
                name: connection_name.clone(),
            },
            other => return Err(CoreError::query_shape(path, format!("connections have no field `{other}`"))),
        };

        fields.push(connection_field);
    }

    Ok(ConnectionSelection {
        alias: selection.response_key().to_owned(),
        field: field.cloned(),
        target: target.clone(),
        args,
        fields,
    })
}

/// `where: { Movie: { node: { … } } }` of connections over unions. Edge conditions are
/// shared by all members and cannot be given per member.
fn connection_union_filters(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    selection: &Selection,
    path: &str,
) -> CoreResult<IndexMap<String, Filter>> {
    let mut filters = IndexMap::new();

    let Some(value) = selection.argument("where").filter(|_| target.kind == TypeKind::Union) else {
        return Ok(filters);
    };

    let path = format!("{path}.where");

    for (member, condition) in expect_object(value, &path)? {
        let path = format!("{path}.{member}");

        if !target.implementers.contains(member) {
            return Err(CoreError::query_shape(
                path,
                format!("`{member}` is not a member of `{}`", target.name),
            ));
        }

        let member_type = ctx.schema.find_type(member)?;

        for (key, value) in expect_object(condition, &path)? {
            match key.as_str() {
                "node" => {
                    if let Some(filter) = extract_filter(ctx, member_type, value, &format!("{path}.node"))? {
                        filters.insert(member.clone(), filter);
                    }
                }
                _ => {
                    return Err(CoreError::query_shape(
                        format!("{path}.{key}"),
                        "union members only take `node` conditions",
                    ));
                }
            }
        }
    }

    Ok(filters)
}

fn extract_edge_fields(
    ctx: ExtractorContext<'_>,
    field: Option<&FieldRef>,
    target: &TypeRef,
    edges: &Selection,
    member_filters: &IndexMap<String, Filter>,
    edge_name: &str,
    path: &str,
) -> CoreResult<Vec<EdgeField>> {
    let mut fields = Vec::new();

    for nested in edges.nested_selections() {
        let alias = nested.response_key().to_owned();
        let path = format!("{path}.{alias}");

        let edge_field = match nested.name() {
            "cursor" => EdgeField::Cursor { alias },
            "node" => EdgeField::Node {
                branches: extract_branches(ctx, target, nested, member_filters, &path)?,
                alias,
            },
            "properties" => {
                let properties = field
                    .map(|field| ctx.schema.properties_type(field))
                    .transpose()?
                    .flatten()
                    .ok_or_else(|| CoreError::query_shape(&path, "the relationship has no properties"))?;

                EdgeField::Properties {
                    fields: extract_property_fields(properties, nested, &path)?,
                    alias,
                }
            }
            TYPENAME => EdgeField::Typename {
                alias,
                name: edge_name.to_owned(),
            },
            other => return Err(CoreError::query_shape(path, format!("edges have no field `{other}`"))),
        };

        fields.push(edge_field);
    }

    Ok(fields)
}

fn extract_property_fields(properties: &TypeRef, selection: &Selection, path: &str) -> CoreResult<Vec<SelectedField>> {
    selection
        .nested_selections()
        .iter()
        .map(|nested| {
            let alias = nested.response_key().to_owned();

            if nested.name() == TYPENAME {
                return Ok(SelectedField::Typename { alias });
            }

            properties
                .find_field(nested.name())
                .map(|field| SelectedField::Scalar {
                    alias,
                    field: field.clone(),
                })
                .ok_or_else(|| {
                    CoreError::query_shape(
                        format!("{path}.{}", nested.response_key()),
                        format!("`{}` has no field `{}`", properties.name, nested.name()),
                    )
                })
        })
        .collect()
}

fn extract_page_info(selection: &Selection, path: &str) -> CoreResult<Vec<(String, PageInfoField)>> {
    selection
        .nested_selections()
        .iter()
        .map(|nested| {
            PageInfoField::from_name(nested.name())
                .map(|field| (nested.response_key().to_owned(), field))
                .ok_or_else(|| {
                    CoreError::query_shape(
                        format!("{path}.{}", nested.response_key()),
                        format!("page info has no field `{}`", nested.name()),
                    )
                })
        })
        .collect()
}

/// A root aggregate (`owner` is `None`) or the aggregate of a relationship field.
pub fn extract_aggregate(
    ctx: ExtractorContext<'_>,
    owner: Option<(&TypeDescriptor, &FieldRef)>,
    target: &TypeRef,
    selection: &Selection,
    path: &str,
) -> CoreResult<AggregateSelection> {
    let mut filter = None;

    for (name, value) in selection.arguments().iter().filter(|(_, v)| !v.is_null()) {
        match name.as_str() {
            "where" => filter = extract_filter(ctx, target, value, &format!("{path}.where"))?,
            _ => return Err(CoreError::query_shape(format!("{path}.{name}"), "unknown argument")),
        }
    }

    let typename = match owner {
        Some((owner, field)) => format!(
            "{}{}{}AggregationSelection",
            owner.name,
            target.name,
            field.name.to_upper_camel_case()
        ),
        None => format!("{}AggregateSelection", target.name),
    };

    let mut items = Vec::new();

    for nested in selection.nested_selections() {
        let alias = nested.response_key().to_owned();
        let path = format!("{path}.{alias}");

        let item = match (nested.name(), owner) {
            ("count", _) => AggregateItem::Count { alias },
            (TYPENAME, _) => AggregateItem::Typename {
                alias,
                name: typename.clone(),
            },
            ("node", Some(_)) => AggregateItem::Node {
                fields: extract_field_aggregates(target, nested, &path)?,
                alias,
            },
            ("edge", Some((_, field))) => {
                let properties = ctx
                    .schema
                    .properties_type(field)?
                    .ok_or_else(|| CoreError::query_shape(&path, "the relationship has no properties"))?;

                AggregateItem::Edge {
                    fields: extract_field_aggregates(properties, nested, &path)?,
                    alias,
                }
            }
            (name, None) => match target.find_field(name) {
                Some(field) => AggregateItem::Field(extract_field_aggregate(field, nested, &path)?),
                None => {
                    return Err(CoreError::query_shape(
                        path,
                        format!("`{}` has no field `{name}`", target.name),
                    ));
                }
            },
            (name, Some(_)) => {
                return Err(CoreError::query_shape(
                    path,
                    format!("relationship aggregates have no field `{name}`"),
                ));
            }
        };

        items.push(item);
    }

    Ok(AggregateSelection {
        alias: selection.response_key().to_owned(),
        field: owner.map(|(_, field)| field.clone()),
        target: target.clone(),
        filter,
        items,
    })
}

fn extract_field_aggregates(type_ref: &TypeRef, selection: &Selection, path: &str) -> CoreResult<Vec<FieldAggregate>> {
    selection
        .nested_selections()
        .iter()
        .filter(|nested| nested.name() != TYPENAME)
        .map(|nested| {
            let path = format!("{path}.{}", nested.response_key());

            let field = type_ref
                .find_field(nested.name())
                .ok_or_else(|| CoreError::query_shape(&path, format!("`{}` has no field `{}`", type_ref.name, nested.name())))?;

            extract_field_aggregate(field, nested, &path)
        })
        .collect()
}

/// `title { shortest longest }`
fn extract_field_aggregate(field: &FieldRef, selection: &Selection, path: &str) -> CoreResult<FieldAggregate> {
    let mut ops = Vec::new();

    for nested in selection.nested_selections().iter().filter(|n| n.name() != TYPENAME) {
        let op = AggregateOp::from_name(nested.name()).ok_or_else(|| {
            CoreError::query_shape(
                format!("{path}.{}", nested.response_key()),
                format!("`{}` is not an aggregation", nested.name()),
            )
        })?;

        ops.push((nested.response_key().to_owned(), op));
    }

    Ok(FieldAggregate {
        alias: selection.response_key().to_owned(),
        field: field.clone(),
        ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cypher_query_builder::Settings;
    use pretty_assertions::assert_eq;
    use query_structure::GraphSchema;
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Production",
                    "kind": "interface",
                    "fields": [{ "name": "title", "type": "String" }]
                },
                {
                    "name": "Movie",
                    "implements": ["Production"],
                    "fields": [
                        { "name": "title", "type": "String" },
                        { "name": "runtime", "type": "Int" },
                        { "name": "actors", "type": "Actor", "list": true, "relationship": { "type": "ACTED_IN", "direction": "IN", "properties": "ActedIn" } }
                    ]
                },
                {
                    "name": "Series",
                    "implements": ["Production"],
                    "fields": [
                        { "name": "title", "type": "String" },
                        { "name": "episodes", "type": "Int" }
                    ]
                },
                { "name": "Actor", "fields": [{ "name": "name", "type": "String" }] },
                { "name": "ActedIn", "kind": "relationshipProperties", "fields": [{ "name": "screenTime", "type": "Int" }] }
            ]
        }))
        .unwrap()
    }

    fn field(name: &str, nested: Vec<Selection>) -> Selection {
        Selection::new(name, None, Vec::new(), nested)
    }

    #[test]
    fn interface_selections_fan_out_per_implementer() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let production = schema.find_type("Production").unwrap();

        let selection = field(
            "productions",
            vec![
                Selection::with_name("__typename"),
                Selection::with_name("title"),
                Selection::with_name("runtime").on_type(Some("Movie".into())),
                Selection::with_name("episodes").on_type(Some("Series".into())),
            ],
        );

        let branches = extract_branches(ctx, production, &selection, &IndexMap::new(), "productions").unwrap();

        let shape: Vec<(&str, Vec<&str>)> = branches
            .iter()
            .map(|b| (b.type_ref.name.as_str(), b.fields.iter().map(SelectedField::alias).collect()))
            .collect();

        assert_eq!(
            shape,
            vec![
                ("Movie", vec!["__typename", "title", "runtime"]),
                ("Series", vec!["__typename", "title", "episodes"]),
            ]
        );
    }

    #[test]
    fn connection_type_names_follow_the_owner() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let movie = schema.find_type("Movie").unwrap();

        let selection = field(
            "movies",
            vec![field(
                "actorsConnection",
                vec![
                    Selection::with_name("__typename"),
                    Selection::with_name("totalCount"),
                    field(
                        "edges",
                        vec![
                            Selection::with_name("__typename"),
                            field("properties", vec![Selection::with_name("screenTime")]),
                            field("node", vec![Selection::with_name("name")]),
                        ],
                    ),
                    field("pageInfo", vec![Selection::with_name("hasNextPage")]),
                ],
            )],
        );

        let branches = extract_branches(ctx, movie, &selection, &IndexMap::new(), "movies").unwrap();

        let SelectedField::Connection(connection) = &branches[0].fields[0] else {
            panic!("expected a connection");
        };

        assert_eq!(connection.field.as_ref().map(|f| f.name.as_str()), Some("actors"));
        assert!(matches!(&connection.fields[0], ConnectionField::Typename { name, .. } if name == "MovieActorsConnection"));

        let ConnectionField::Edges { fields, .. } = &connection.fields[2] else {
            panic!("expected edges");
        };

        assert!(matches!(&fields[0], EdgeField::Typename { name, .. } if name == "MovieActorsRelationship"));
        assert!(matches!(&fields[1], EdgeField::Properties { fields, .. } if fields.len() == 1));
    }

    #[test]
    fn aggregates_group_node_and_edge_items() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let movie = schema.find_type("Movie").unwrap();
        let actor = schema.find_type("Actor").unwrap();
        let actors = movie.find_field("actors").unwrap();

        let selection = field(
            "actorsAggregate",
            vec![
                Selection::with_name("count"),
                field("node", vec![field("name", vec![Selection::with_name("shortest")])]),
                field("edge", vec![field("screenTime", vec![Selection::with_name("max")])]),
            ],
        );

        let aggregate = extract_aggregate(ctx, Some((&**movie, actors)), actor, &selection, "actorsAggregate").unwrap();

        assert!(matches!(&aggregate.items[0], AggregateItem::Count { .. }));
        assert!(matches!(&aggregate.items[1], AggregateItem::Node { fields, .. } if fields[0].ops == vec![("shortest".to_owned(), AggregateOp::Shortest)]));
        assert!(matches!(&aggregate.items[2], AggregateItem::Edge { fields, .. } if fields[0].field.name == "screenTime"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let movie = schema.find_type("Movie").unwrap();

        let selection = field("movies", vec![Selection::with_name("budget")]);
        let result = extract_branches(ctx, movie, &selection, &IndexMap::new(), "movies");

        assert_eq!(
            result,
            Err(CoreError::query_shape("movies.budget", "`Movie` has no field `budget`"))
        );
    }
}
