use crate::auth::AuthRule;
use enumflags2::{bitflags, BitFlags};
use graph_value::GraphValue;
use serde::Deserialize;
use std::{fmt, sync::Arc};

pub type FieldRef = Arc<FieldDescriptor>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ScalarKind {
    ID,
    String,
    Int,
    Float,
    BigInt,
    Boolean,
    DateTime,
    Date,
    Time,
    LocalDateTime,
    LocalTime,
    Duration,
    Point,
}

impl ScalarKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "ID" => Self::ID,
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "BigInt" => Self::BigInt,
            "Boolean" => Self::Boolean,
            "DateTime" => Self::DateTime,
            "Date" => Self::Date,
            "Time" => Self::Time,
            "LocalDateTime" => Self::LocalDateTime,
            "LocalTime" => Self::LocalTime,
            "Duration" => Self::Duration,
            "Point" => Self::Point,
            _ => return None,
        };

        Some(kind)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, Self::ID | Self::String)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::BigInt)
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::DateTime | Self::Date | Self::Time | Self::LocalDateTime | Self::LocalTime | Self::Duration
        )
    }

    /// Kinds supporting `<`, `<=`, `>` and `>=`.
    pub fn is_ordered(self) -> bool {
        self.is_numeric() || self.is_temporal()
    }

    /// The Cypher function producing the current value for a timestamp of this kind.
    pub fn now_function(self) -> Option<&'static str> {
        match self {
            Self::DateTime => Some("datetime"),
            Self::Date => Some("date"),
            Self::Time => Some("time"),
            Self::LocalDateTime => Some("localdatetime"),
            Self::LocalTime => Some("localtime"),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Mutation kinds that fire field triggers.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteTrigger {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDescriptor {
    /// The edge type, `ACTED_IN`.
    pub rel_type: String,
    pub direction: RelationDirection,
    /// Name of the related node, interface or union type.
    pub target: String,
    /// Name of the relationship properties type, if the edge carries properties.
    pub properties: Option<String>,
}

/// A value supplied by a registered callback whenever one of `operations` writes the node.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulatedBy {
    pub callback: String,
    pub operations: BitFlags<WriteTrigger>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Relationship(RelationshipDescriptor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// The property name in the database, differs from `name` for `@alias`ed fields.
    pub db_name: String,
    pub type_name: String,
    pub kind: FieldKind,
    pub list: bool,
    pub required: bool,
    pub unique: bool,
    pub id_autogenerate: bool,
    pub timestamp: BitFlags<WriteTrigger>,
    pub default: Option<GraphValue>,
    pub populated_by: Option<PopulatedBy>,
    pub auth: Vec<AuthRule>,
}

impl FieldDescriptor {
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match &self.kind {
            FieldKind::Scalar(kind) => Some(*kind),
            FieldKind::Relationship(_) => None,
        }
    }

    pub fn relationship(&self) -> Option<&RelationshipDescriptor> {
        match &self.kind {
            FieldKind::Relationship(rel) => Some(rel),
            FieldKind::Scalar(_) => None,
        }
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self.kind, FieldKind::Relationship(_))
    }

    /// Singular relationship fields hold at most one related node.
    pub fn is_singular_relationship(&self) -> bool {
        self.is_relationship() && !self.list
    }

    /// Whether the value of this field is owned by a trigger for `op`, making any client
    /// supplied value irrelevant.
    pub fn is_generated_on(&self, op: WriteTrigger) -> bool {
        self.timestamp.contains(op)
            || (op == WriteTrigger::Create && self.id_autogenerate)
            || self.populated_by.as_ref().is_some_and(|p| p.operations.contains(op))
    }

    /// Whether a trigger owns this field on any operation. Clients never write such fields.
    pub fn is_generated(&self) -> bool {
        !self.timestamp.is_empty() || self.id_autogenerate || self.populated_by.is_some()
    }

    pub fn has_auth(&self) -> bool {
        !self.auth.is_empty()
    }
}
