use super::*;
use crate::{DomainError, FieldRef, GraphSchema, TypeKind, TypeRef};
use graph_value::{GraphObjectValue, GraphValue};

type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equals,
    Not,
    In,
    NotIn,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Matches,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Includes,
    NotIncludes,
    Some,
    None,
    All,
    Single,
}

impl Operator {
    fn is_negated(self) -> bool {
        matches!(
            self,
            Operator::Not
                | Operator::NotIn
                | Operator::NotContains
                | Operator::NotStartsWith
                | Operator::NotEndsWith
                | Operator::NotIncludes
        )
    }
}

/// Longer suffixes first, `_NOT_IN` must win over `_IN`.
const SUFFIXES: &[(&str, Operator)] = &[
    ("_NOT_STARTS_WITH", Operator::NotStartsWith),
    ("_NOT_ENDS_WITH", Operator::NotEndsWith),
    ("_NOT_CONTAINS", Operator::NotContains),
    ("_NOT_INCLUDES", Operator::NotIncludes),
    ("_NOT_IN", Operator::NotIn),
    ("_STARTS_WITH", Operator::StartsWith),
    ("_ENDS_WITH", Operator::EndsWith),
    ("_CONTAINS", Operator::Contains),
    ("_INCLUDES", Operator::Includes),
    ("_MATCHES", Operator::Matches),
    ("_SINGLE", Operator::Single),
    ("_SOME", Operator::Some),
    ("_NONE", Operator::None),
    ("_NOT", Operator::Not),
    ("_ALL", Operator::All),
    ("_LTE", Operator::LessThanOrEquals),
    ("_GTE", Operator::GreaterThanOrEquals),
    ("_LT", Operator::LessThan),
    ("_GT", Operator::GreaterThan),
    ("_IN", Operator::In),
];

enum FilterKey {
    Field(FieldRef, Operator),
    Connection(FieldRef, Operator),
    Aggregate(FieldRef),
}

/// Turns `where` shaped input objects into [`Filter`] trees, checking every comparator
/// against the kind of the field it is applied to.
pub struct FilterParser<'a> {
    schema: &'a GraphSchema,
    claim_prefix: Option<&'a str>,
    allow_regex: bool,
}

impl<'a> FilterParser<'a> {
    pub fn new(schema: &'a GraphSchema) -> Self {
        Self {
            schema,
            claim_prefix: None,
            allow_regex: false,
        }
    }

    /// String leaves starting with `prefix` become claim references.
    pub fn with_claim_prefix(mut self, prefix: &'a str) -> Self {
        self.claim_prefix = Some(prefix);
        self
    }

    pub fn allow_regex(mut self, allow: bool) -> Self {
        self.allow_regex = allow;
        self
    }

    pub fn parse(&self, type_ref: &TypeRef, value: &GraphValue, path: &str) -> Result<Filter> {
        let object = value
            .as_object()
            .ok_or_else(|| DomainError::validation(path, "expected an input object"))?;

        self.parse_object(type_ref, object, path)
    }

    fn parse_object(&self, type_ref: &TypeRef, object: &GraphObjectValue, path: &str) -> Result<Filter> {
        let mut filters = Vec::with_capacity(object.len());

        for (key, value) in object {
            let path = format!("{path}.{key}");

            let filter = match key.as_str() {
                "AND" => Filter::and(self.parse_list(type_ref, value, &path)?),
                "OR" => Filter::or(self.parse_list(type_ref, value, &path)?),
                "NOT" => Filter::not(self.parse(type_ref, value, &path)?),
                "typename_IN" => self.parse_typename(type_ref, value, &path)?,
                _ => match self.split_key(type_ref, key) {
                    Some(FilterKey::Field(field, op)) if field.is_relationship() => {
                        self.parse_relation(&field, op, value, &path)?
                    }
                    Some(FilterKey::Field(field, op)) => self.parse_scalar(&field, op, value, &path)?,
                    Some(FilterKey::Connection(field, op)) => self.parse_connection(&field, op, value, &path)?,
                    Some(FilterKey::Aggregate(field)) => self.parse_aggregate(&field, value, &path)?,
                    None => {
                        return Err(DomainError::FieldNotFound {
                            type_name: type_ref.name.clone(),
                            field: key.clone(),
                        })
                    }
                },
            };

            filters.push(filter);
        }

        Ok(Filter::and(filters))
    }

    fn parse_list(&self, type_ref: &TypeRef, value: &GraphValue, path: &str) -> Result<Vec<Filter>> {
        let items = value
            .as_list()
            .ok_or_else(|| DomainError::validation(path, "expected a list of input objects"))?;

        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.parse(type_ref, item, &format!("{path}.{i}")))
            .collect()
    }

    fn split_key(&self, type_ref: &TypeRef, key: &str) -> Option<FilterKey> {
        if let Some(field) = type_ref.find_field(key) {
            return Some(FilterKey::Field(field.clone(), Operator::Equals));
        }

        let relationship = |name: &str| type_ref.find_field(name).filter(|f| f.is_relationship()).cloned();

        if let Some(base) = key.strip_suffix("Aggregate") {
            if let Some(field) = relationship(base) {
                return Some(FilterKey::Aggregate(field));
            }
        }

        if let Some(base) = key.strip_suffix("Connection") {
            if let Some(field) = relationship(base) {
                return Some(FilterKey::Connection(field, Operator::Equals));
            }
        }

        SUFFIXES.iter().find_map(|(suffix, op)| {
            let base = key.strip_suffix(suffix)?;

            if let Some(field) = type_ref.find_field(base) {
                return Some(FilterKey::Field(field.clone(), *op));
            }

            base.strip_suffix("Connection")
                .and_then(relationship)
                .map(|field| FilterKey::Connection(field, *op))
        })
    }

    fn condition_value(&self, value: &GraphValue) -> ConditionValue {
        match (self.claim_prefix, value) {
            (Some(prefix), GraphValue::String(s)) if s.starts_with(prefix) => {
                ConditionValue::Claim(s[prefix.len()..].to_owned())
            }
            _ => ConditionValue::Value(value.clone()),
        }
    }

    fn parse_scalar(&self, field: &FieldRef, op: Operator, value: &GraphValue, path: &str) -> Result<Filter> {
        let Some(kind) = field.scalar_kind() else {
            return Err(DomainError::validation(path, "expected a scalar field"));
        };

        let unsupported = |what: &str| {
            Err(DomainError::validation(
                path,
                format!("{what} is not supported on `{}` ({}{kind})", field.name, if field.list { "list of " } else { "" }),
            ))
        };

        if value.is_null() && !matches!(op, Operator::Equals | Operator::Not) {
            return Err(DomainError::validation(path, "null is only allowed for equality filters"));
        }

        let value = self.condition_value(value);

        let condition = match op {
            Operator::Equals | Operator::Not => match value {
                ConditionValue::Value(GraphValue::Null) => ScalarCondition::IsNull,
                value => ScalarCondition::Equals(value),
            },
            Operator::In | Operator::NotIn => {
                if field.list {
                    return unsupported("`_IN`");
                }

                if matches!(&value, ConditionValue::Value(v) if v.as_list().is_none()) {
                    return Err(DomainError::validation(path, "expected a list of values"));
                }

                ScalarCondition::In(value)
            }
            Operator::Contains
            | Operator::NotContains
            | Operator::StartsWith
            | Operator::NotStartsWith
            | Operator::EndsWith
            | Operator::NotEndsWith
            | Operator::Matches => {
                if field.list || !kind.is_textual() {
                    return unsupported("String comparison");
                }

                match op {
                    Operator::Contains | Operator::NotContains => ScalarCondition::Contains(value),
                    Operator::StartsWith | Operator::NotStartsWith => ScalarCondition::StartsWith(value),
                    Operator::EndsWith | Operator::NotEndsWith => ScalarCondition::EndsWith(value),
                    _ if self.allow_regex => ScalarCondition::Matches(value),
                    _ => return Err(DomainError::validation(path, "regular expression matching is not enabled")),
                }
            }
            Operator::LessThan | Operator::LessThanOrEquals | Operator::GreaterThan | Operator::GreaterThanOrEquals => {
                if field.list || !kind.is_ordered() {
                    return unsupported("Ordering comparison");
                }

                match op {
                    Operator::LessThan => ScalarCondition::LessThan(value),
                    Operator::LessThanOrEquals => ScalarCondition::LessThanOrEquals(value),
                    Operator::GreaterThan => ScalarCondition::GreaterThan(value),
                    _ => ScalarCondition::GreaterThanOrEquals(value),
                }
            }
            Operator::Includes | Operator::NotIncludes => {
                if !field.list {
                    return unsupported("`_INCLUDES`");
                }

                ScalarCondition::IncludesElement(value)
            }
            Operator::Some | Operator::None | Operator::All | Operator::Single => {
                return unsupported("A relationship quantifier");
            }
        };

        let filter = Filter::Scalar(ScalarFilter::new(field.clone(), condition));

        Ok(if op.is_negated() { Filter::not(filter) } else { filter })
    }

    fn quantifier(field: &FieldRef, op: Operator, path: &str) -> Result<(RelationQuantifier, bool)> {
        let quantified = match (op, field.list) {
            (Operator::Equals, false) => (RelationQuantifier::ToOne, false),
            (Operator::Not, false) => (RelationQuantifier::ToOne, true),
            (Operator::Equals | Operator::Some, true) => (RelationQuantifier::Some, false),
            (Operator::Not | Operator::None, true) => (RelationQuantifier::None, false),
            (Operator::All, true) => (RelationQuantifier::All, false),
            (Operator::Single, true) => (RelationQuantifier::Single, false),
            (Operator::Some | Operator::None | Operator::All | Operator::Single, false) => {
                return Err(DomainError::validation(
                    path,
                    format!("`{}` is a singular relationship and cannot be quantified", field.name),
                ))
            }
            _ => {
                return Err(DomainError::validation(
                    path,
                    format!("comparator is not supported on relationship `{}`", field.name),
                ))
            }
        };

        Ok(quantified)
    }

    fn relation_target(&self, field: &FieldRef, path: &str) -> Result<TypeRef> {
        let rel = field
            .relationship()
            .ok_or_else(|| DomainError::validation(path, format!("`{}` is not a relationship", field.name)))?;

        Ok(self.schema.find_type(&rel.target)?.clone())
    }

    /// Per member objects for union targets, the value itself for everything else.
    fn per_member<'v>(&self, target: &TypeRef, value: &'v GraphValue, path: &str) -> Result<Vec<(TypeRef, &'v GraphValue)>> {
        if target.kind != TypeKind::Union {
            return Ok(vec![(target.clone(), value)]);
        }

        let object = value
            .as_object()
            .ok_or_else(|| DomainError::validation(path, "expected an input object keyed by union member"))?;

        object
            .iter()
            .map(|(member, value)| {
                if !target.implementers.contains(member) {
                    return Err(DomainError::validation(
                        format!("{path}.{member}"),
                        format!("`{member}` is not a member of `{}`", target.name),
                    ));
                }

                Ok((self.schema.find_type(member)?.clone(), value))
            })
            .collect()
    }

    fn parse_relation(&self, field: &FieldRef, op: Operator, value: &GraphValue, path: &str) -> Result<Filter> {
        let (quantifier, negate) = Self::quantifier(field, op, path)?;
        let target = self.relation_target(field, path)?;

        if value.is_null() {
            if quantifier != RelationQuantifier::ToOne {
                return Err(DomainError::validation(path, "null is only allowed for singular relationships"));
            }

            let exists = Filter::Relation(RelationFilter::new(field.clone(), target, quantifier));

            return Ok(if negate { exists } else { Filter::not(exists) });
        }

        let filters = self
            .per_member(&target, value, path)?
            .into_iter()
            .map(|(member, value)| {
                let node = self.parse(&member, value, path)?;
                Ok(RelationFilter::new(field.clone(), member, quantifier).with_node(node).into())
            })
            .collect::<Result<Vec<Filter>>>()?;

        let filter = Filter::and(filters);

        Ok(if negate { Filter::not(filter) } else { filter })
    }

    fn parse_connection(&self, field: &FieldRef, op: Operator, value: &GraphValue, path: &str) -> Result<Filter> {
        let (quantifier, negate) = Self::quantifier(field, op, path)?;
        let target = self.relation_target(field, path)?;

        let properties = match field.relationship().and_then(|rel| rel.properties.as_deref()) {
            Some(name) => Some(self.schema.find_type(name)?.clone()),
            None => None,
        };

        let filters = self
            .per_member(&target, value, path)?
            .into_iter()
            .map(|(member, value)| {
                let object = value
                    .as_object()
                    .ok_or_else(|| DomainError::validation(path, "expected an input object"))?;

                let mut relation = RelationFilter::new(field.clone(), member.clone(), quantifier);

                for (key, value) in object {
                    let path = format!("{path}.{key}");

                    match (key.as_str(), &properties) {
                        ("node", _) => relation = relation.with_node(self.parse(&member, value, &path)?),
                        ("edge", Some(properties)) => relation = relation.with_edge(self.parse(properties, value, &path)?),
                        ("edge", None) => {
                            return Err(DomainError::validation(path, "relationship has no properties"));
                        }
                        _ => return Err(DomainError::validation(path, "expected `node` or `edge`")),
                    }
                }

                Ok(relation.into())
            })
            .collect::<Result<Vec<Filter>>>()?;

        let filter = Filter::and(filters);

        Ok(if negate { Filter::not(filter) } else { filter })
    }

    fn parse_aggregate(&self, field: &FieldRef, value: &GraphValue, path: &str) -> Result<Filter> {
        let target = self.relation_target(field, path)?;
        let object = value
            .as_object()
            .ok_or_else(|| DomainError::validation(path, "expected an input object"))?;

        let filters = object
            .iter()
            .map(|(key, value)| {
                let path = format!("{path}.{key}");

                if value.as_i64().is_none() {
                    return Err(DomainError::validation(path, "expected an Int"));
                }

                let value = ConditionValue::Value(value.clone());
                let condition = match key.as_str() {
                    "count" => ScalarCondition::Equals(value),
                    "count_LT" => ScalarCondition::LessThan(value),
                    "count_LTE" => ScalarCondition::LessThanOrEquals(value),
                    "count_GT" => ScalarCondition::GreaterThan(value),
                    "count_GTE" => ScalarCondition::GreaterThanOrEquals(value),
                    _ => return Err(DomainError::validation(path, "only count aggregation filters are supported")),
                };

                Ok(Filter::RelationCount(RelationCountFilter {
                    field: field.clone(),
                    target: target.clone(),
                    condition,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Filter::and(filters))
    }

    fn parse_typename(&self, type_ref: &TypeRef, value: &GraphValue, path: &str) -> Result<Filter> {
        if !type_ref.is_abstract() {
            return Err(DomainError::validation(path, "`typename_IN` requires an interface or union"));
        }

        let names = value
            .as_list()
            .ok_or_else(|| DomainError::validation(path, "expected a list of type names"))?;

        let types = names
            .iter()
            .map(|name| {
                let name = name
                    .as_str()
                    .ok_or_else(|| DomainError::validation(path, "expected a type name"))?;

                if !type_ref.implementers.iter().any(|i| i == name) {
                    return Err(DomainError::validation(
                        path,
                        format!("`{name}` does not implement `{}`", type_ref.name),
                    ));
                }

                Ok(self.schema.find_type(name)?.clone())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Filter::Typename(types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GraphSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Post",
                    "fields": [
                        { "name": "id", "type": "ID", "required": true, "unique": true },
                        { "name": "title", "type": "String" },
                        { "name": "published", "type": "Boolean" },
                        { "name": "views", "type": "Int" },
                        { "name": "tags", "type": "String", "list": true },
                        { "name": "creator", "type": "User", "required": true, "relationship": { "type": "HAS_POST", "direction": "IN" } },
                        { "name": "likes", "type": "User", "list": true, "relationship": { "type": "LIKES", "direction": "IN", "properties": "Liked" } }
                    ]
                },
                {
                    "name": "User",
                    "fields": [
                        { "name": "id", "type": "ID", "required": true, "unique": true },
                        { "name": "name", "type": "String" },
                        { "name": "bookmarks", "type": "Entry", "list": true, "relationship": { "type": "BOOKMARKED", "direction": "OUT" } }
                    ]
                },
                { "name": "Entry", "kind": "union", "members": ["Post", "User"] },
                { "name": "Liked", "kind": "relationshipProperties", "fields": [{ "name": "at", "type": "DateTime" }] }
            ]
        }))
        .unwrap()
    }

    fn parse(schema: &GraphSchema, type_name: &str, value: serde_json::Value) -> Result<Filter> {
        let type_ref = schema.find_type(type_name).unwrap();
        let value = GraphValue::try_from(value).unwrap();

        FilterParser::new(schema)
            .with_claim_prefix("$jwt.")
            .parse(type_ref, &value, "where")
    }

    #[test]
    fn legacy_negations_equal_explicit_not() {
        let schema = schema();

        let pairs = [
            (json!({ "title_NOT": "a" }), json!({ "NOT": { "title": "a" } })),
            (json!({ "title_NOT_IN": ["a", "b"] }), json!({ "NOT": { "title_IN": ["a", "b"] } })),
            (json!({ "title_NOT_CONTAINS": "a" }), json!({ "NOT": { "title_CONTAINS": "a" } })),
            (json!({ "title_NOT_STARTS_WITH": "a" }), json!({ "NOT": { "title_STARTS_WITH": "a" } })),
            (json!({ "title_NOT_ENDS_WITH": "a" }), json!({ "NOT": { "title_ENDS_WITH": "a" } })),
            (json!({ "tags_NOT_INCLUDES": "a" }), json!({ "NOT": { "tags_INCLUDES": "a" } })),
            (json!({ "title_NOT": null }), json!({ "NOT": { "title": null } })),
            (json!({ "creator_NOT": { "name": "a" } }), json!({ "NOT": { "creator": { "name": "a" } } })),
        ];

        for (legacy, explicit) in pairs {
            assert_eq!(parse(&schema, "Post", legacy).unwrap(), parse(&schema, "Post", explicit).unwrap());
        }
    }

    #[test]
    fn comparators_must_fit_the_field_kind() {
        let schema = schema();

        for (input, path) in [
            (json!({ "views_CONTAINS": "1" }), "where.views_CONTAINS"),
            (json!({ "title_GT": "a" }), "where.title_GT"),
            (json!({ "published_LT": true }), "where.published_LT"),
            (json!({ "tags_IN": ["a"] }), "where.tags_IN"),
            (json!({ "title_INCLUDES": "a" }), "where.title_INCLUDES"),
            (json!({ "title_IN": "a" }), "where.title_IN"),
            (json!({ "creator_SOME": { "name": "a" } }), "where.creator_SOME"),
        ] {
            match parse(&schema, "Post", input) {
                Err(DomainError::Validation { path: actual, .. }) => assert_eq!(actual, path),
                other => panic!("expected a validation error at {path}, got {other:?}"),
            }
        }
    }

    #[test]
    fn regex_needs_to_be_enabled() {
        let schema = schema();
        let type_ref = schema.find_type("Post").unwrap();
        let value = GraphValue::try_from(json!({ "title_MATCHES": "(?i)a.*" })).unwrap();

        assert!(FilterParser::new(&schema).parse(type_ref, &value, "where").is_err());

        let filter = FilterParser::new(&schema).allow_regex(true).parse(type_ref, &value, "where").unwrap();
        assert!(matches!(filter, Filter::Scalar(ScalarFilter { condition: ScalarCondition::Matches(_), .. })));
    }

    #[test]
    fn claim_placeholders_become_claim_references() {
        let schema = schema();
        let filter = parse(&schema, "Post", json!({ "creator": { "id": "$jwt.sub" } })).unwrap();

        let Filter::Relation(relation) = filter else {
            panic!("expected a relation filter");
        };

        assert_eq!(relation.quantifier, RelationQuantifier::ToOne);
        assert_eq!(relation.target.name, "User");
        assert!(matches!(
            relation.node.as_deref(),
            Some(Filter::Scalar(ScalarFilter { condition: ScalarCondition::Equals(ConditionValue::Claim(claim)), .. })) if claim == "sub"
        ));
    }

    #[test]
    fn null_relationship_means_absence() {
        let schema = schema();
        let filter = parse(&schema, "Post", json!({ "creator": null })).unwrap();

        let Filter::Not(inner) = filter else {
            panic!("expected a negation");
        };

        assert!(matches!(*inner, Filter::Relation(RelationFilter { node: None, quantifier: RelationQuantifier::ToOne, .. })));
    }

    #[test]
    fn union_filters_are_given_per_member() {
        let schema = schema();
        let filter = parse(
            &schema,
            "User",
            json!({ "bookmarks_SOME": { "Post": { "title": "a" }, "User": { "name": "b" } } }),
        )
        .unwrap();

        let Filter::And(members) = filter else {
            panic!("expected a conjunction");
        };

        let targets: Vec<_> = members
            .iter()
            .map(|f| match f {
                Filter::Relation(r) => r.target.name.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();

        assert_eq!(targets, vec!["Post", "User"]);
    }

    #[test]
    fn connection_and_aggregate_filters() {
        let schema = schema();

        let filter = parse(
            &schema,
            "Post",
            json!({ "likesConnection_SOME": { "node": { "name": "a" }, "edge": { "at_GT": "2020-01-01T00:00:00Z" } } }),
        )
        .unwrap();

        assert!(matches!(filter, Filter::Relation(RelationFilter { node: Some(_), edge: Some(_), quantifier: RelationQuantifier::Some, .. })));

        let filter = parse(&schema, "Post", json!({ "likesAggregate": { "count_GT": 2 } })).unwrap();
        assert!(matches!(
            filter,
            Filter::RelationCount(RelationCountFilter { condition: ScalarCondition::GreaterThan(_), .. })
        ));

        assert!(parse(&schema, "Post", json!({ "likesAggregate": { "node": {} } })).is_err());
    }

    #[test]
    fn unknown_fields_are_reported() {
        let schema = schema();

        assert_eq!(
            parse(&schema, "Post", json!({ "body_CONTAINS": "a" })).unwrap_err(),
            DomainError::FieldNotFound {
                type_name: "Post".into(),
                field: "body_CONTAINS".into()
            }
        );
    }
}
