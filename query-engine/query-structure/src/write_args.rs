//! Mutation inputs resolved against the type metadata. Nested operations on abstract
//! targets are already split per concrete type.
use crate::{FieldRef, Filter, TypeRef};
use graph_value::GraphValue;

pub type PropertyValues = Vec<(FieldRef, GraphValue)>;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOperation {
    Set(GraphValue),
    Increment(GraphValue),
    Decrement(GraphValue),
    Add(GraphValue),
    Subtract(GraphValue),
    Multiply(GraphValue),
    Divide(GraphValue),
    /// Appends elements to a list property.
    Push(GraphValue),
    /// Removes the given number of trailing elements of a list property.
    Pop(GraphValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarWrite {
    pub field: FieldRef,
    pub op: WriteOperation,
}

/// One object of `createX(input: [...])` or of a nested `create: { node: ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    pub type_ref: TypeRef,
    pub scalars: PropertyValues,
    pub relations: Vec<RelationWrite>,
}

/// The `update` argument of `updateX`, or the `node` part of a nested update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInput {
    pub type_ref: TypeRef,
    pub scalars: Vec<ScalarWrite>,
    pub relations: Vec<RelationWrite>,
}

impl UpdateInput {
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            scalars: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.relations.is_empty()
    }
}

/// Nested operations on one relationship field, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationWrite {
    pub field: FieldRef,
    pub ops: Vec<NestedWrite>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NestedWrite {
    Disconnect(DisconnectInput),
    Connect(ConnectInput),
    Update(NestedUpdateInput),
    Delete(NestedDeleteInput),
    Create(NestedCreateInput),
    ConnectOrCreate(ConnectOrCreateInput),
}

impl NestedWrite {
    pub fn target(&self) -> &TypeRef {
        match self {
            NestedWrite::Disconnect(i) => &i.target,
            NestedWrite::Connect(i) => &i.target,
            NestedWrite::Update(i) => &i.target,
            NestedWrite::Delete(i) => &i.target,
            NestedWrite::Create(i) => &i.node.type_ref,
            NestedWrite::ConnectOrCreate(i) => &i.target,
        }
    }

    /// Execution rank of the operation kind within one field.
    pub fn rank(&self) -> u8 {
        match self {
            NestedWrite::Disconnect(_) => 0,
            NestedWrite::Connect(_) => 1,
            NestedWrite::Update(_) => 2,
            NestedWrite::Delete(_) => 3,
            NestedWrite::Create(_) => 4,
            NestedWrite::ConnectOrCreate(_) => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectInput {
    pub target: TypeRef,
    pub filter: Option<Filter>,
    pub edge: PropertyValues,
    /// Further connections made from the connected node.
    pub connect: Vec<RelationWrite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisconnectInput {
    pub target: TypeRef,
    pub filter: Option<Filter>,
    pub edge_filter: Option<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedUpdateInput {
    pub target: TypeRef,
    pub filter: Option<Filter>,
    pub edge_filter: Option<Filter>,
    pub node: Option<UpdateInput>,
    pub edge: Vec<ScalarWrite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedDeleteInput {
    pub target: TypeRef,
    pub filter: Option<Filter>,
    pub edge_filter: Option<Filter>,
    /// Deletes of nodes related to the deleted one, run first.
    pub nested: Vec<DeleteRelation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRelation {
    pub field: FieldRef,
    pub deletes: Vec<NestedDeleteInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedCreateInput {
    pub node: CreateInput,
    pub edge: PropertyValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOrCreateInput {
    pub target: TypeRef,
    /// Unique properties identifying the node.
    pub unique: PropertyValues,
    pub on_create: PropertyValues,
    pub edge: PropertyValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateArgs {
    pub filter: Option<Filter>,
    pub update: UpdateInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteArgs {
    pub filter: Option<Filter>,
    pub nested: Vec<DeleteRelation>,
}
