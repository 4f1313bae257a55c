mod builder;
mod definition;

pub use builder::SchemaBuilder;
pub use definition::*;

use crate::{DomainError, FieldDescriptor, FieldRef, TypeDescriptor, TypeKind, TypeRef};
use indexmap::IndexMap;

type Result<T> = std::result::Result<T, DomainError>;

/// The immutable type metadata snapshot every translation reads from. Built once
/// and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GraphSchema {
    pub(crate) types: IndexMap<String, TypeRef>,
}

impl GraphSchema {
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: SchemaDefinition = serde_json::from_str(json)?;
        SchemaBuilder::from_definition(definition).build()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let definition: SchemaDefinition = serde_json::from_value(value)?;
        SchemaBuilder::from_definition(definition).build()
    }

    pub fn find_type(&self, name: &str) -> Result<&TypeRef> {
        self.types
            .get(name)
            .ok_or_else(|| DomainError::TypeNotFound { name: name.to_owned() })
    }

    pub fn find_field(&self, type_name: &str, field: &str) -> Result<&FieldRef> {
        self.find_type(type_name)?
            .find_field(field)
            .ok_or_else(|| DomainError::FieldNotFound {
                type_name: type_name.to_owned(),
                field: field.to_owned(),
            })
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeRef> {
        self.types.values()
    }

    /// The node or interface type whose root fields use `plural`.
    pub fn find_by_plural(&self, plural: &str) -> Option<&TypeRef> {
        self.types
            .values()
            .find(|t| t.plural == plural && matches!(t.kind, TypeKind::Node | TypeKind::Interface))
    }

    /// Concrete node types behind `type_ref`: itself for node types, implementers and
    /// members in declaration order for interfaces and unions.
    pub fn concrete_types(&self, type_ref: &TypeDescriptor) -> Result<Vec<TypeRef>> {
        if type_ref.is_abstract() {
            type_ref
                .implementers
                .iter()
                .map(|name| self.find_type(name).cloned())
                .collect()
        } else {
            Ok(vec![self.find_type(&type_ref.name)?.clone()])
        }
    }

    pub fn related_type(&self, field: &FieldDescriptor) -> Result<&TypeRef> {
        match field.relationship() {
            Some(rel) => self.find_type(&rel.target),
            None => Err(DomainError::validation(&field.name, "not a relationship field")),
        }
    }

    pub fn properties_type(&self, field: &FieldDescriptor) -> Result<Option<&TypeRef>> {
        match field.relationship().and_then(|rel| rel.properties.as_deref()) {
            Some(name) => self.find_type(name).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a relationship declared towards `target` can point at the concrete type.
    pub fn covers(&self, target: &str, concrete: &TypeDescriptor) -> bool {
        target == concrete.name
            || concrete.implements.iter().any(|i| i == target)
            || self
                .types
                .get(target)
                .is_some_and(|t| t.kind == TypeKind::Union && t.implementers.contains(&concrete.name))
    }

    /// Fields on the other side of `field` pointing back at `source`: same edge type,
    /// opposite direction.
    pub fn inverse_fields(&self, source: &TypeDescriptor, field: &FieldDescriptor) -> Result<Vec<(TypeRef, FieldRef)>> {
        let Some(rel) = field.relationship() else {
            return Ok(Vec::new());
        };

        let target = self.find_type(&rel.target)?;
        let mut inverse = Vec::new();

        for concrete in self.concrete_types(target)? {
            for candidate in concrete.relationship_fields() {
                let matches = candidate.relationship().is_some_and(|other| {
                    other.rel_type == rel.rel_type && other.direction != rel.direction && self.covers(&other.target, source)
                });

                if matches {
                    inverse.push((concrete.clone(), candidate.clone()));
                }
            }
        }

        Ok(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthOperation, FieldKind, RelationDirection, ScalarKind, WriteTrigger};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Movie",
                    "implements": ["Production"],
                    "fields": [
                        { "name": "id", "type": "ID", "required": true, "id": {} },
                        { "name": "title", "type": "String", "required": true },
                        { "name": "createdAt", "type": "DateTime", "timestamp": ["CREATE"] },
                        { "name": "actors", "type": "Actor", "list": true, "relationship": { "type": "ACTED_IN", "direction": "IN", "properties": "ActedIn" } }
                    ]
                },
                {
                    "name": "Series",
                    "implements": ["Production"],
                    "fields": [
                        { "name": "title", "type": "String", "required": true },
                        { "name": "actors", "type": "Actor", "list": true, "relationship": { "type": "ACTED_IN", "direction": "IN" } }
                    ]
                },
                {
                    "name": "Production",
                    "kind": "interface",
                    "fields": [
                        { "name": "title", "type": "String", "required": true },
                        { "name": "actors", "type": "Actor", "list": true, "relationship": { "type": "ACTED_IN", "direction": "IN" } }
                    ]
                },
                {
                    "name": "Actor",
                    "plural": "people",
                    "fields": [
                        { "name": "name", "type": "String", "alias": "fullName" },
                        { "name": "actedIn", "type": "Production", "list": true, "relationship": { "type": "ACTED_IN", "direction": "OUT" } },
                        { "name": "favourite", "type": "Movie", "relationship": { "type": "LIKES", "direction": "OUT" } }
                    ]
                },
                { "name": "ActedIn", "kind": "relationshipProperties", "fields": [{ "name": "screenTime", "type": "Int" }] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn descriptors_carry_directive_metadata() {
        let schema = schema();
        let movie = schema.find_type("Movie").unwrap();

        assert_eq!(movie.labels, vec!["Movie"]);
        assert_eq!(movie.plural, "movies");
        assert_eq!(movie.unique_fields, vec!["id"]);

        let id = movie.find_field("id").unwrap();
        assert!(id.id_autogenerate);
        assert!(id.is_generated_on(WriteTrigger::Create));
        assert!(!id.is_generated_on(WriteTrigger::Update));
        assert!(id.is_generated());

        let created_at = movie.find_field("createdAt").unwrap();
        assert_eq!(created_at.kind, FieldKind::Scalar(ScalarKind::DateTime));
        assert!(created_at.is_generated_on(WriteTrigger::Create));
        assert!(created_at.is_generated());
        assert!(!movie.find_field("title").unwrap().is_generated());

        let actors = movie.find_field("actors").unwrap().relationship().unwrap();
        assert_eq!(actors.direction, RelationDirection::In);
        assert_eq!(actors.properties.as_deref(), Some("ActedIn"));

        let name = schema.find_field("Actor", "name").unwrap();
        assert_eq!(name.db_name, "fullName");
        assert_eq!(schema.find_by_plural("people").unwrap().name, "Actor");
    }

    #[test]
    fn interfaces_list_implementers_in_declaration_order() {
        let schema = schema();
        let production = schema.find_type("Production").unwrap();

        let names: Vec<_> = schema
            .concrete_types(production)
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect();

        assert_eq!(names, vec!["Movie", "Series"]);
    }

    #[test]
    fn inverse_fields_point_back_through_interfaces() {
        let schema = schema();
        let actor = schema.find_type("Actor").unwrap();
        let movie = schema.find_type("Movie").unwrap();

        let inverse = schema.inverse_fields(movie, movie.find_field("actors").unwrap()).unwrap();
        let found: Vec<_> = inverse.iter().map(|(t, f)| format!("{}.{}", t.name, f.name)).collect();
        assert_eq!(found, vec!["Actor.actedIn"]);

        let inverse = schema.inverse_fields(actor, actor.find_field("actedIn").unwrap()).unwrap();
        let found: Vec<_> = inverse.iter().map(|(t, f)| format!("{}.{}", t.name, f.name)).collect();
        assert_eq!(found, vec!["Movie.actors", "Series.actors"]);
    }

    #[test]
    fn unknown_relationship_targets_are_rejected() {
        let result = GraphSchema::from_value(json!({
            "types": [{
                "name": "Post",
                "fields": [{ "name": "creator", "type": "User", "relationship": { "type": "HAS_POST", "direction": "IN" } }]
            }]
        }));

        assert_eq!(
            result.unwrap_err(),
            DomainError::invalid_schema("Post.creator", "unknown type `User`")
        );
    }

    #[test]
    fn object_fields_without_relationship_are_rejected() {
        let result = GraphSchema::from_value(json!({
            "types": [
                { "name": "User", "fields": [{ "name": "id", "type": "ID" }] },
                { "name": "Post", "fields": [{ "name": "creator", "type": "User" }] }
            ]
        }));

        assert!(matches!(result, Err(DomainError::InvalidSchema { path, .. }) if path == "Post.creator"));
    }

    #[test]
    fn implementers_must_declare_interface_fields() {
        let result = GraphSchema::from_value(json!({
            "types": [
                { "name": "Production", "kind": "interface", "fields": [{ "name": "title", "type": "String" }] },
                { "name": "Movie", "implements": ["Production"], "fields": [{ "name": "id", "type": "ID" }] }
            ]
        }));

        assert!(matches!(result, Err(DomainError::InvalidSchema { path, .. }) if path == "Movie.title"));
    }

    #[test]
    fn auth_templates_are_validated_eagerly() {
        let result = GraphSchema::from_value(json!({
            "types": [{
                "name": "Post",
                "fields": [{ "name": "published", "type": "Boolean" }],
                "auth": [{ "operations": ["READ"], "where": { "published_CONTAINS": "$jwt.sub" } }]
            }]
        }));

        assert!(matches!(result, Err(DomainError::Validation { path, .. }) if path == "Post.@auth.where.published_CONTAINS"));
    }

    #[test]
    fn interface_rules_hold_for_every_implementer() {
        let schema = GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Production",
                    "kind": "interface",
                    "fields": [{ "name": "title", "type": "String", "auth": [{ "operations": ["UPDATE"], "roles": ["editor"] }] }],
                    "auth": [{ "operations": ["READ"], "roles": ["admin"] }]
                },
                {
                    "name": "Movie",
                    "implements": ["Production"],
                    "fields": [{ "name": "title", "type": "String" }],
                    "auth": [{ "operations": ["DELETE"], "isAuthenticated": true }]
                },
                { "name": "Series", "implements": ["Production"], "fields": [{ "name": "title", "type": "String" }] }
            ]
        }))
        .unwrap();

        for name in ["Movie", "Series"] {
            let concrete = schema.find_type(name).unwrap();
            let read: Vec<_> = concrete.rules_for(AuthOperation::Read).map(|rule| rule.roles.clone()).collect();
            assert_eq!(read, vec![vec!["admin".to_owned()]], "{name}");

            let title = concrete.find_field("title").unwrap();
            assert_eq!(title.auth.len(), 1, "{name}");
            assert!(title.auth[0].applies_to(AuthOperation::Update));
        }

        let movie = schema.find_type("Movie").unwrap();
        let own_first: Vec<_> = movie.auth.iter().map(|rule| rule.is_authenticated).collect();
        assert_eq!(own_first, vec![true, false]);
    }

    #[test]
    fn unions_cannot_declare_rules() {
        let result = GraphSchema::from_value(json!({
            "types": [
                { "name": "Movie", "fields": [{ "name": "title", "type": "String" }] },
                { "name": "Search", "kind": "union", "members": ["Movie"], "auth": [{ "operations": ["READ"], "isAuthenticated": true }] }
            ]
        }));

        assert!(matches!(result, Err(DomainError::InvalidSchema { path, .. }) if path == "Search"));
    }
}
