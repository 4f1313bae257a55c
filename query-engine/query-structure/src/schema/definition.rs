//! The serialized form of the type metadata, as produced by schema augmentation.
use crate::{AuthOperation, RelationDirection, TypeKind, WriteTrigger};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaDefinition {
    pub types: Vec<TypeDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub plural: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub implements: Vec<String>,
    /// Members of a union.
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub auth: Vec<AuthRuleDefinition>,
    #[serde(default)]
    pub fulltext: Vec<FulltextDefinition>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            labels: Vec::new(),
            plural: None,
            fields: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
            auth: Vec::new(),
            fulltext: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub required: bool,
    /// `@alias(property:)`
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub id: Option<IdDefinition>,
    #[serde(default)]
    pub timestamp: Vec<WriteTrigger>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub populated_by: Option<PopulatedByDefinition>,
    #[serde(default)]
    pub relationship: Option<RelationshipDefinition>,
    #[serde(default)]
    pub auth: Vec<AuthRuleDefinition>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            list: false,
            required: false,
            alias: None,
            unique: false,
            id: None,
            timestamp: Vec::new(),
            default: None,
            populated_by: None,
            relationship: None,
            auth: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn relationship(mut self, rel_type: impl Into<String>, direction: RelationDirection) -> Self {
        self.relationship = Some(RelationshipDefinition {
            rel_type: rel_type.into(),
            direction,
            properties: None,
        });
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IdDefinition {
    #[serde(default = "default_true")]
    pub autogenerate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PopulatedByDefinition {
    pub callback: String,
    #[serde(default = "both_triggers")]
    pub operations: Vec<WriteTrigger>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationshipDefinition {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub direction: RelationDirection,
    #[serde(default)]
    pub properties: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthRuleDefinition {
    #[serde(default = "all_operations")]
    pub operations: Vec<AuthOperation>,
    #[serde(default, rename = "where")]
    pub where_template: Option<serde_json::Value>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FulltextDefinition {
    pub name: String,
    pub fields: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn both_triggers() -> Vec<WriteTrigger> {
    vec![WriteTrigger::Create, WriteTrigger::Update]
}

fn all_operations() -> Vec<AuthOperation> {
    vec![
        AuthOperation::Read,
        AuthOperation::Create,
        AuthOperation::Update,
        AuthOperation::Delete,
        AuthOperation::Connect,
        AuthOperation::Disconnect,
    ]
}
