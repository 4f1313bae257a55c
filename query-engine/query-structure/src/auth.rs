use enumflags2::{bitflags, BitFlags};
use graph_value::GraphValue;
use serde::Deserialize;
use std::fmt;

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthOperation {
    Read,
    Create,
    Update,
    Delete,
    Connect,
    Disconnect,
}

impl fmt::Display for AuthOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthOperation::Read => "READ",
            AuthOperation::Create => "CREATE",
            AuthOperation::Update => "UPDATE",
            AuthOperation::Delete => "DELETE",
            AuthOperation::Connect => "CONNECT",
            AuthOperation::Disconnect => "DISCONNECT",
        };

        f.write_str(name)
    }
}

/// One `@auth` rule of a type or field.
///
/// The `where` template keeps the shape of a `where` argument. String leaves starting with
/// the configured claim prefix (`$jwt.sub`) refer to caller claims and are substituted at
/// translation time, so the template is only turned into a [`Filter`](crate::Filter) once
/// the caller is known.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRule {
    pub operations: BitFlags<AuthOperation>,
    pub where_template: Option<GraphValue>,
    /// The caller's `roles` claim must contain at least one of these.
    pub roles: Vec<String>,
    /// The caller must present claims at all.
    pub is_authenticated: bool,
}

impl AuthRule {
    pub fn new(operations: impl Into<BitFlags<AuthOperation>>) -> Self {
        Self {
            operations: operations.into(),
            where_template: None,
            roles: Vec::new(),
            is_authenticated: false,
        }
    }

    pub fn with_where(mut self, template: GraphValue) -> Self {
        self.where_template = Some(template);
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.is_authenticated = true;
        self
    }

    /// Rules are inert for operations outside their set.
    pub fn applies_to(&self, op: AuthOperation) -> bool {
        self.operations.contains(op)
    }
}
