use super::*;
use base64::{Engine, engine::general_purpose::STANDARD};
use query_structure::{
    ConnectionArguments, FieldRef, FulltextSearch, OrderBy, QueryArguments, SortOrder, TypeDescriptor, TypeRef,
};

/// `where`, `options: { sort, limit, offset }` and `fulltext` of a list read. The
/// `where` of union targets is per member and extracted with the selection.
pub fn extract_query_args(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    arguments: &[(String, GraphValue)],
    path: &str,
) -> CoreResult<QueryArguments> {
    arguments
        .iter()
        .filter(|(_, value)| !value.is_null())
        .try_fold(QueryArguments::default(), |res, (name, value)| {
            let path = format!("{path}.{name}");

            match name.as_str() {
                "where" if target.kind == query_structure::TypeKind::Union => Ok(res),
                "where" => Ok(QueryArguments {
                    filter: extract_filter(ctx, target, value, &path)?,
                    ..res
                }),
                "options" => extract_options(target, value, &path, res),
                "fulltext" => Ok(QueryArguments {
                    fulltext: Some(extract_fulltext(target, value, &path)?),
                    ..res
                }),
                _ => Err(CoreError::query_shape(path, "unknown argument")),
            }
        })
}

fn extract_options(
    target: &TypeDescriptor,
    value: &GraphValue,
    path: &str,
    args: QueryArguments,
) -> CoreResult<QueryArguments> {
    let mut args = args;

    for (key, value) in expect_object(value, path)?.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{key}");

        match key.as_str() {
            "sort" => {
                for (index, item) in list_items(value).into_iter().enumerate() {
                    args.order_by
                        .extend(extract_sort(target, item, &format!("{path}.{index}"))?.into_iter().map(
                            |(field, order)| OrderBy::node(field, order),
                        ));
                }
            }
            "limit" => args.limit = Some(expect_int(value, &path)?),
            "offset" => args.offset = Some(expect_int(value, &path)?),
            _ => return Err(CoreError::query_shape(path, "unknown option")),
        }
    }

    Ok(args)
}

/// `{ title: ASC, released: DESC }`, keys apply in the order given.
fn extract_sort(target: &TypeDescriptor, value: &GraphValue, path: &str) -> CoreResult<Vec<(FieldRef, SortOrder)>> {
    let mut order_by = Vec::new();

    for (key, direction) in expect_object(value, path)? {
        let path = format!("{path}.{key}");

        let field = target
            .find_field(key)
            .ok_or_else(|| CoreError::query_shape(&path, format!("`{}` has no field `{key}`", target.name)))?;

        if field.is_relationship() || field.list {
            return Err(CoreError::query_shape(path, "only scalar properties can be sorted on"));
        }

        let sort_order = match direction.as_str() {
            Some("ASC") => SortOrder::Ascending,
            Some("DESC") => SortOrder::Descending,
            _ => return Err(CoreError::validation(path, "expected ASC or DESC")),
        };

        order_by.push((field.clone(), sort_order));
    }

    Ok(order_by)
}

/// `{ MovieTitle: { phrase: "matrix" } }`, naming exactly one index of the target.
fn extract_fulltext(target: &TypeDescriptor, value: &GraphValue, path: &str) -> CoreResult<FulltextSearch> {
    let object = expect_object(value, path)?;

    let Some((index, search)) = object.iter().next().filter(|_| object.len() == 1) else {
        return Err(CoreError::query_shape(path, "exactly one full-text index must be given"));
    };

    let path = format!("{path}.{index}");

    if target.fulltext_index(index).is_none() {
        return Err(CoreError::query_shape(
            path,
            format!("`{}` has no full-text index `{index}`", target.name),
        ));
    }

    let phrase = entry(expect_object(search, &path)?, "phrase")
        .filter(|phrase| phrase.as_str().is_some())
        .cloned()
        .ok_or_else(|| CoreError::validation(format!("{path}.phrase"), "expected a String phrase"))?;

    Ok(FulltextSearch {
        index: index.clone(),
        phrase,
    })
}

/// `where`, `sort`, `first` and `after` of a connection. On relationship fields
/// (`field` is set) `where` and `sort` take `{ node, edge }` objects.
pub fn extract_connection_args(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    field: Option<&FieldRef>,
    arguments: &[(String, GraphValue)],
    path: &str,
) -> CoreResult<ConnectionArguments> {
    let mut args = ConnectionArguments::default();

    for (name, value) in arguments.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{name}");

        match (name.as_str(), field) {
            ("where", _) if target.kind == query_structure::TypeKind::Union => (),
            ("where", None) => args.filter = extract_filter(ctx, target, value, &path)?,
            ("where", Some(field)) => {
                (args.filter, args.edge_filter) = extract_node_edge_filter(ctx, field, target, value, &path)?;
            }
            ("sort", None) => {
                for (index, item) in list_items(value).into_iter().enumerate() {
                    let sort = extract_sort(target, item, &format!("{path}.{index}"))?;
                    args.order_by.extend(sort.into_iter().map(|(f, o)| OrderBy::node(f, o)));
                }
            }
            ("sort", Some(field)) => args.order_by = extract_edge_sort(ctx, target, field, value, &path)?,
            ("first", _) => args.first = Some(expect_int(value, &path)?),
            ("after", _) => args.after = Some(decode_cursor(ctx, value, &path)?),
            _ => return Err(CoreError::query_shape(path, "unknown argument")),
        }
    }

    Ok(args)
}

/// `[{ node: { name: ASC } }, { edge: { screenTime: DESC } }]`
fn extract_edge_sort(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    field: &FieldRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<Vec<OrderBy>> {
    let mut order_by = Vec::new();

    for (index, item) in list_items(value).into_iter().enumerate() {
        let path = format!("{path}.{index}");

        for (key, sort) in expect_object(item, &path)? {
            let path = format!("{path}.{key}");

            match key.as_str() {
                "node" => order_by.extend(
                    extract_sort(target, sort, &path)?
                        .into_iter()
                        .map(|(field, sort_order)| OrderBy::Node { field, sort_order }),
                ),
                "edge" => {
                    let properties = ctx
                        .schema
                        .properties_type(field)?
                        .ok_or_else(|| CoreError::query_shape(&path, "the relationship has no properties"))?;

                    order_by.extend(
                        extract_sort(properties, sort, &path)?
                            .into_iter()
                            .map(|(field, sort_order)| OrderBy::Edge { field, sort_order }),
                    );
                }
                _ => return Err(CoreError::query_shape(path, "expected `node` or `edge`")),
            }
        }
    }

    Ok(order_by)
}

/// Offset cursors: base64 of the configured prefix followed by the edge position.
pub fn decode_cursor(ctx: ExtractorContext<'_>, value: &GraphValue, path: &str) -> CoreResult<i64> {
    let malformed = || CoreError::query_shape(path, "malformed cursor");

    let cursor = value.as_str().ok_or_else(malformed)?;
    let decoded = STANDARD.decode(cursor).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;

    decoded
        .strip_prefix(&ctx.settings.cursor_prefix)
        .and_then(|offset| offset.parse::<i64>().ok())
        // The window starts one past the cursor, so the last offset cannot be paged after.
        .filter(|offset| (0..i64::MAX).contains(offset))
        .ok_or_else(malformed)
}

pub fn encode_cursor(ctx: ExtractorContext<'_>, offset: i64) -> String {
    STANDARD.encode(format!("{}{offset}", ctx.settings.cursor_prefix))
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
                    "name": "Movie",
                    "fulltext": [{ "name": "MovieTitle", "fields": ["title"] }],
                    "fields": [
                        { "name": "title", "type": "String" },
                        { "name": "released", "type": "Int" },
                        { "name": "actors", "type": "Actor", "list": true, "relationship": { "type": "ACTED_IN", "direction": "IN", "properties": "ActedIn" } }
                    ]
                },
                { "name": "Actor", "fields": [{ "name": "name", "type": "String" }] },
                { "name": "ActedIn", "kind": "relationshipProperties", "fields": [{ "name": "screenTime", "type": "Int" }] }
            ]
        }))
        .unwrap()
    }

    fn args(pairs: serde_json::Value) -> Vec<(String, GraphValue)> {
        match GraphValue::try_from(pairs).unwrap() {
            GraphValue::Object(object) => object.into_iter().collect(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn sort_keys_keep_their_order() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let movie = schema.find_type("Movie").unwrap();

        let args = extract_query_args(
            ctx,
            movie,
            &args(json!({ "options": { "sort": [{ "released": "DESC" }, { "title": "ASC" }], "limit": 10, "offset": 5 } })),
            "movies",
        )
        .unwrap();

        let order: Vec<_> = args
            .order_by
            .iter()
            .map(|o| (o.field().name.as_str(), o.sort_order()))
            .collect();

        assert_eq!(order, vec![("released", SortOrder::Descending), ("title", SortOrder::Ascending)]);
        assert_eq!((args.limit, args.offset), (Some(10), Some(5)));
    }

    #[test]
    fn relationship_fields_cannot_be_sorted_on() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let movie = schema.find_type("Movie").unwrap();

        let result = extract_query_args(ctx, movie, &args(json!({ "options": { "sort": [{ "actors": "ASC" }] } })), "movies");

        assert!(matches!(result, Err(CoreError::QueryShapeError { .. })));
    }

    #[test]
    fn fulltext_names_a_known_index() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let movie = schema.find_type("Movie").unwrap();

        let args_ok = extract_query_args(
            ctx,
            movie,
            &args(json!({ "fulltext": { "MovieTitle": { "phrase": "matrix" } } })),
            "movies",
        )
        .unwrap();

        assert_eq!(
            args_ok.fulltext,
            Some(FulltextSearch {
                index: "MovieTitle".into(),
                phrase: GraphValue::from("matrix"),
            })
        );

        let unknown = extract_query_args(ctx, movie, &args(json!({ "fulltext": { "Plot": { "phrase": "x" } } })), "movies");
        assert!(matches!(unknown, Err(CoreError::QueryShapeError { .. })));
    }

    #[test]
    fn cursors_decode_to_offsets() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);

        let cursor = encode_cursor(ctx, 4);
        assert_eq!(cursor, "YXJyYXljb25uZWN0aW9uOjQ=");
        assert_eq!(decode_cursor(ctx, &GraphValue::from(cursor), "after"), Ok(4));

        let garbage = STANDARD.encode("somethingelse:4");
        assert_eq!(
            decode_cursor(ctx, &GraphValue::from(garbage), "after"),
            Err(CoreError::query_shape("after", "malformed cursor"))
        );
        assert!(decode_cursor(ctx, &GraphValue::from("%%%"), "after").is_err());
    }

    #[test]
    fn cursors_past_the_last_offset_are_malformed() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);

        for offset in [i64::MAX.to_string(), "-1".to_owned(), "9223372036854775808".to_owned()] {
            let cursor = STANDARD.encode(format!("arrayconnection:{offset}"));

            assert_eq!(
                decode_cursor(ctx, &GraphValue::from(cursor), "after"),
                Err(CoreError::query_shape("after", "malformed cursor"))
            );
        }

        let last = STANDARD.encode(format!("arrayconnection:{}", i64::MAX - 1));
        assert_eq!(decode_cursor(ctx, &GraphValue::from(last), "after"), Ok(i64::MAX - 1));
    }

    #[test]
    fn nested_connections_sort_on_node_and_edge() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let actor = schema.find_type("Actor").unwrap();
        let actors = schema.find_field("Movie", "actors").unwrap();

        let args = extract_connection_args(
            ctx,
            actor,
            Some(actors),
            &args(json!({
                "where": { "edge": { "screenTime_GT": 10 } },
                "sort": [{ "edge": { "screenTime": "DESC" } }, { "node": { "name": "ASC" } }],
                "first": 2
            })),
            "actorsConnection",
        )
        .unwrap();

        assert!(args.filter.is_none());
        assert!(args.edge_filter.is_some());
        assert!(matches!(&args.order_by[0], OrderBy::Edge { field, .. } if field.name == "screenTime"));
        assert!(matches!(&args.order_by[1], OrderBy::Node { field, .. } if field.name == "name"));
        assert_eq!(args.first, Some(2));
    }
}
