use super::*;
use indexmap::IndexMap;
use query_structure::{FieldRef, Filter, FilterParser, TypeRef};

/// The client filter given as `where` for `type_ref`. Empty conditions yield `None`.
///
/// Client filters never reference claims, only `@auth` templates do.
pub fn extract_filter(
    ctx: ExtractorContext<'_>,
    type_ref: &TypeRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<Option<Filter>> {
    if value.is_null() {
        return Ok(None);
    }

    let filter = FilterParser::new(ctx.schema)
        .allow_regex(ctx.settings.enable_regex)
        .parse(type_ref, value, path)?;

    Ok((!filter.is_empty()).then_some(filter))
}

/// The `edge` condition on the relationship properties of `field`.
pub fn extract_edge_filter(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<Option<Filter>> {
    match ctx.schema.properties_type(field)? {
        Some(properties) => extract_filter(ctx, properties, value, path),
        None if value.is_null() => Ok(None),
        None => Err(CoreError::query_shape(path, "the relationship has no properties")),
    }
}

/// Per-member conditions of a union `where`: `{ Movie: { title: "Alien" } }`. Members
/// not mentioned stay unfiltered.
pub fn extract_member_filters(
    ctx: ExtractorContext<'_>,
    union: &TypeRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<IndexMap<String, Filter>> {
    let mut filters = IndexMap::new();

    if value.is_null() {
        return Ok(filters);
    }

    for (member, condition) in expect_object(value, path)? {
        let path = format!("{path}.{member}");

        if !union.implementers.contains(member) {
            return Err(CoreError::query_shape(
                path,
                format!("`{member}` is not a member of `{}`", union.name),
            ));
        }

        let member_type = ctx.schema.find_type(member)?;

        if let Some(filter) = extract_filter(ctx, member_type, condition, &path)? {
            filters.insert(member.clone(), filter);
        }
    }

    Ok(filters)
}

/// The `{ node, edge }` condition of nested connections, connects and disconnects.
pub fn extract_node_edge_filter(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<(Option<Filter>, Option<Filter>)> {
    if value.is_null() {
        return Ok((None, None));
    }

    let object = expect_object(value, path)?;
    let mut node = None;
    let mut edge = None;

    for (key, condition) in object {
        let path = format!("{path}.{key}");

        match key.as_str() {
            "node" => node = extract_filter(ctx, target, condition, &path)?,
            "edge" => edge = extract_edge_filter(ctx, field, condition, &path)?,
            _ => return Err(CoreError::query_shape(path, "expected `node` or `edge`")),
        }
    }

    Ok((node, edge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::ExtractorContext;
    use cypher_query_builder::Settings;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Movie",
                    "fields": [
                        { "name": "title", "type": "String" },
                        { "name": "actors", "type": "Actor", "list": true, "relationship": { "type": "ACTED_IN", "direction": "IN" } }
                    ]
                },
                { "name": "Series", "fields": [{ "name": "episodes", "type": "Int" }] },
                { "name": "Actor", "fields": [{ "name": "name", "type": "String" }] },
                { "name": "Production", "kind": "union", "members": ["Movie", "Series"] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn empty_conditions_are_no_filter() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let movie = schema.find_type("Movie").unwrap();

        assert_eq!(extract_filter(ctx, movie, &GraphValue::object::<_, String>([]), "where").unwrap(), None);
        assert_eq!(extract_filter(ctx, movie, &GraphValue::Null, "where").unwrap(), None);
    }

    #[test]
    fn regex_needs_to_be_enabled() {
        let schema = schema();
        let movie = schema.find_type("Movie").unwrap();
        let value = GraphValue::object([("title_MATCHES", GraphValue::from("A.*"))]);

        let settings = Settings::default();
        let disabled = extract_filter(ExtractorContext::new(&schema, &settings), movie, &value, "where");
        assert!(matches!(disabled, Err(CoreError::ValidationError { .. })));

        let settings = Settings {
            enable_regex: true,
            ..Default::default()
        };
        let enabled = extract_filter(ExtractorContext::new(&schema, &settings), movie, &value, "where").unwrap();
        assert!(enabled.is_some());
    }

    #[test]
    fn union_members_are_filtered_independently() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let production = schema.find_type("Production").unwrap();

        let value = GraphValue::object([("Series", GraphValue::object([("episodes_GT", GraphValue::Int(10))]))]);
        let filters = extract_member_filters(ctx, production, &value, "where").unwrap();

        assert_eq!(filters.keys().collect::<Vec<_>>(), vec!["Series"]);

        let value = GraphValue::object([("Actor", GraphValue::object([("name", GraphValue::from("x"))]))]);
        assert!(matches!(
            extract_member_filters(ctx, production, &value, "where"),
            Err(CoreError::QueryShapeError { .. })
        ));
    }

    #[test]
    fn edge_conditions_need_relationship_properties() {
        let schema = schema();
        let settings = Settings::default();
        let ctx = ExtractorContext::new(&schema, &settings);
        let actors = schema.find_field("Movie", "actors").unwrap();

        let value = GraphValue::object([("screenTime", GraphValue::Int(1))]);

        assert_eq!(
            extract_edge_filter(ctx, actors, &value, "where.edge"),
            Err(CoreError::query_shape("where.edge", "the relationship has no properties"))
        );
    }
}
