use crate::{auth::AuthRule, field::FieldRef, AuthOperation};
use serde::Deserialize;
use std::sync::Arc;

pub type TypeRef = Arc<TypeDescriptor>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    #[default]
    Node,
    Interface,
    Union,
    RelationshipProperties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FulltextIndex {
    pub name: String,
    pub fields: Vec<String>,
}

/// Static description of an object, interface, union or relationship properties type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    /// Node labels, `[name]` unless configured otherwise.
    pub labels: Vec<String>,
    /// Stem of the generated root fields, `movies` for `Movie`.
    pub plural: String,
    pub fields: Vec<FieldRef>,
    /// Interfaces a node type implements.
    pub implements: Vec<String>,
    /// Implementers of an interface, members of a union, in declaration order.
    pub implementers: Vec<String>,
    pub unique_fields: Vec<String>,
    pub auth: Vec<AuthRule>,
    pub fulltext: Vec<FulltextIndex>,
}

impl TypeDescriptor {
    pub fn find_field(&self, name: &str) -> Option<&FieldRef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::Union)
    }

    pub fn is_node(&self) -> bool {
        self.kind == TypeKind::Node
    }

    pub fn scalar_fields(&self) -> impl Iterator<Item = &FieldRef> {
        self.fields.iter().filter(|f| !f.is_relationship())
    }

    pub fn relationship_fields(&self) -> impl Iterator<Item = &FieldRef> {
        self.fields.iter().filter(|f| f.is_relationship())
    }

    pub fn is_unique(&self, field: &str) -> bool {
        self.unique_fields.iter().any(|f| f == field)
    }

    pub fn fulltext_index(&self, name: &str) -> Option<&FulltextIndex> {
        self.fulltext.iter().find(|idx| idx.name == name)
    }

    pub fn rules_for(&self, op: AuthOperation) -> impl Iterator<Item = &AuthRule> {
        self.auth.iter().filter(move |rule| rule.applies_to(op))
    }
}
