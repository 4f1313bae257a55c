use super::*;
use query_structure::{
    FieldRef, ScalarKind, TypeDescriptor, TypeKind, TypeRef,
    prelude::{
        ConnectInput, ConnectOrCreateInput, CreateInput, DeleteArgs, DeleteRelation, DisconnectInput, NestedCreateInput,
        NestedDeleteInput, NestedUpdateInput, NestedWrite, PropertyValues, RelationWrite, ScalarWrite, UpdateArgs,
        UpdateInput, WriteOperation,
    },
};

/// Longer suffixes first, `_SUBTRACT` must not be read as `_ADD` of another field.
const UPDATE_SUFFIXES: &[&str] = &[
    "_INCREMENT",
    "_DECREMENT",
    "_SUBTRACT",
    "_MULTIPLY",
    "_DIVIDE",
    "_PUSH",
    "_ADD",
    "_POP",
];

/// The `input` list of a root `createX` field.
pub fn extract_create_inputs(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    arguments: &[(String, GraphValue)],
    path: &str,
) -> CoreResult<Vec<CreateInput>> {
    let mut inputs = None;

    for (name, value) in arguments {
        let path = format!("{path}.{name}");

        match name.as_str() {
            "input" => {
                let items = list_items(value)
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| extract_create_input(ctx, target, item, &format!("{path}.{index}")))
                    .collect::<CoreResult<Vec<_>>>()?;

                inputs = Some(items);
            }
            _ => return Err(CoreError::query_shape(path, "unknown argument")),
        }
    }

    inputs.ok_or_else(|| CoreError::validation(format!("{path}.input"), "argument is required"))
}

/// `where`, `update` and the top-level `connect`, `disconnect`, `create`, `delete` and
/// `connectOrCreate` arguments of a root `updateX` field, merged into one input.
pub fn extract_update_args(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    arguments: &[(String, GraphValue)],
    path: &str,
) -> CoreResult<UpdateArgs> {
    let mut filter = None;
    let mut update = UpdateInput::new(target.clone());
    let mut top_level = Vec::new();

    for (name, value) in arguments.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{name}");

        match name.as_str() {
            "where" => filter = extract_filter(ctx, target, value, &path)?,
            "update" => update = extract_update_input(ctx, target, value, &path)?,
            "connect" | "disconnect" | "create" | "delete" | "connectOrCreate" => {
                for (field_name, items) in expect_object(value, &path)? {
                    let path = format!("{path}.{field_name}");
                    let field = relationship_field(target, field_name, &path)?;

                    top_level.push((field.clone(), nested_ops(ctx, field, name, items, &path)?));
                }
            }
            _ => return Err(CoreError::query_shape(path, "unknown argument")),
        }
    }

    for (field, ops) in top_level {
        match update.relations.iter_mut().find(|write| write.field.name == field.name) {
            Some(write) => write.ops.extend(ops),
            None => update.relations.push(RelationWrite { field, ops }),
        }
    }

    Ok(UpdateArgs { filter, update })
}

/// `where` and the cascading `delete` of a root `deleteX` field.
pub fn extract_delete_args(
    ctx: ExtractorContext<'_>,
    target: &TypeRef,
    arguments: &[(String, GraphValue)],
    path: &str,
) -> CoreResult<DeleteArgs> {
    let mut args = DeleteArgs {
        filter: None,
        nested: Vec::new(),
    };

    for (name, value) in arguments.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{name}");

        match name.as_str() {
            "where" => args.filter = extract_filter(ctx, target, value, &path)?,
            "delete" => args.nested = delete_relations(ctx, target, value, &path)?,
            _ => return Err(CoreError::query_shape(path, "unknown argument")),
        }
    }

    Ok(args)
}

fn extract_create_input(
    ctx: ExtractorContext<'_>,
    type_ref: &TypeRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<CreateInput> {
    let mut input = CreateInput {
        type_ref: type_ref.clone(),
        scalars: Vec::new(),
        relations: Vec::new(),
    };

    for (key, value) in expect_object(value, path)?.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{key}");
        let field = known_field(type_ref, key, &path)?;

        if field.is_relationship() {
            input.relations.push(create_relation_write(ctx, field, value, &path)?);
        } else {
            input.scalars.push((field.clone(), value.clone()));
        }
    }

    Ok(input)
}

/// `{ create, connect, connectOrCreate }` of a relationship field in a create input.
fn create_relation_write(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<RelationWrite> {
    let mut ops = Vec::new();

    for (target, block, path) in per_member(ctx, field, value, path)? {
        for (kind, items) in expect_object(block, &path)?.iter().filter(|(_, v)| !v.is_null()) {
            let path = format!("{path}.{kind}");

            match kind.as_str() {
                "create" | "connect" | "connectOrCreate" => ops.extend(target_ops(ctx, field, &target, kind, items, &path)?),
                _ => return Err(CoreError::query_shape(path, "not supported when creating a node")),
            }
        }
    }

    Ok(RelationWrite {
        field: field.clone(),
        ops,
    })
}

/// The `update` argument of `updateX`, or the `node` part of a nested update.
fn extract_update_input(
    ctx: ExtractorContext<'_>,
    type_ref: &TypeRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<UpdateInput> {
    let mut input = UpdateInput::new(type_ref.clone());

    for (key, value) in expect_object(value, path)? {
        let path = format!("{path}.{key}");

        if let Some(field) = type_ref.find_field(key).filter(|f| f.is_relationship()) {
            if !value.is_null() {
                input.relations.push(update_relation_write(ctx, field, value, &path)?);
            }

            continue;
        }

        let write = scalar_write(type_ref, key, value, &path)?;

        if input.scalars.iter().any(|w| w.field.name == write.field.name) {
            return Err(CoreError::validation(
                path,
                format!("`{}` is updated more than once", write.field.name),
            ));
        }

        input.scalars.push(write);
    }

    Ok(input)
}

/// Blocks of `{ where, update, connect, disconnect, create, delete, connectOrCreate }`.
fn update_relation_write(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<RelationWrite> {
    let mut ops = Vec::new();

    for (target, blocks, path) in per_member(ctx, field, value, path)? {
        for (index, block) in list_items(blocks).into_iter().enumerate() {
            let path = if blocks.as_list().is_some() {
                format!("{path}.{index}")
            } else {
                path.clone()
            };

            let block = expect_object(block, &path)?;

            for (kind, value) in block.iter().filter(|(_, v)| !v.is_null()) {
                let path = format!("{path}.{kind}");

                match kind.as_str() {
                    "where" => (),
                    "update" => ops.extend(nested_updates(ctx, field, &target, entry(block, "where"), value, &path)?),
                    "connect" | "disconnect" | "create" | "delete" | "connectOrCreate" => {
                        ops.extend(target_ops(ctx, field, &target, kind, value, &path)?)
                    }
                    _ => return Err(CoreError::query_shape(path, "unknown nested operation")),
                }
            }
        }
    }

    Ok(RelationWrite {
        field: field.clone(),
        ops,
    })
}

/// One nested operation kind on `field`, given per member for union targets.
fn nested_ops(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    kind: &str,
    value: &GraphValue,
    path: &str,
) -> CoreResult<Vec<NestedWrite>> {
    let mut ops = Vec::new();

    for (target, items, path) in per_member(ctx, field, value, path)? {
        ops.extend(target_ops(ctx, field, &target, kind, items, &path)?);
    }

    Ok(ops)
}

fn target_ops(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    kind: &str,
    items: &GraphValue,
    path: &str,
) -> CoreResult<Vec<NestedWrite>> {
    let ops = match kind {
        "create" => nested_creates(ctx, field, target, items, path)?,
        "connect" => nested_connects(ctx, field, target, items, path)?
            .into_iter()
            .map(NestedWrite::Connect)
            .collect(),
        "disconnect" => nested_disconnects(ctx, field, target, items, path)?,
        "delete" => nested_deletes(ctx, field, target, items, path)?
            .into_iter()
            .map(NestedWrite::Delete)
            .collect(),
        "connectOrCreate" => connect_or_creates(ctx, field, target, items, path)?,
        _ => return Err(CoreError::query_shape(path, "unknown nested operation")),
    };

    Ok(ops)
}

/// Splits union inputs keyed by member. Inputs for other targets apply to the declared
/// target of `field`.
fn per_member<'v>(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    value: &'v GraphValue,
    path: &str,
) -> CoreResult<Vec<(TypeRef, &'v GraphValue, String)>> {
    let declared = ctx.schema.related_type(field)?;

    if declared.kind != TypeKind::Union {
        return Ok(vec![(declared.clone(), value, path.to_owned())]);
    }

    let mut members = Vec::new();

    for (member, value) in expect_object(value, path)?.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{member}");

        if !declared.implementers.contains(member) {
            return Err(CoreError::query_shape(
                path,
                format!("`{member}` is not a member of `{}`", declared.name),
            ));
        }

        members.push((ctx.schema.find_type(member)?.clone(), value, path));
    }

    Ok(members)
}

/// `[{ node, edge }]`. Interface targets key the node by implementer:
/// `{ node: { Movie: { … } } }`.
fn nested_creates(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    items: &GraphValue,
    path: &str,
) -> CoreResult<Vec<NestedWrite>> {
    let mut creates = Vec::new();

    for (index, item) in list_items(items).into_iter().enumerate() {
        let path = format!("{path}.{index}");
        let item = expect_object(item, &path)?;
        reject_unknown_keys(item, &["node", "edge"], &path)?;

        let node = entry(item, "node").ok_or_else(|| CoreError::validation(format!("{path}.node"), "is required"))?;
        let edge = edge_values(ctx, field, entry(item, "edge"), &format!("{path}.edge"))?;

        if target.kind == TypeKind::Interface {
            let node_path = format!("{path}.node");

            for (implementer, node) in expect_object(node, &node_path)?.iter().filter(|(_, v)| !v.is_null()) {
                let node_path = format!("{node_path}.{implementer}");

                if !target.implementers.contains(implementer) {
                    return Err(CoreError::query_shape(
                        node_path,
                        format!("`{implementer}` does not implement `{}`", target.name),
                    ));
                }

                let concrete = ctx.schema.find_type(implementer)?;

                creates.push(NestedWrite::Create(NestedCreateInput {
                    node: extract_create_input(ctx, concrete, node, &node_path)?,
                    edge: edge.clone(),
                }));
            }
        } else {
            creates.push(NestedWrite::Create(NestedCreateInput {
                node: extract_create_input(ctx, target, node, &format!("{path}.node"))?,
                edge,
            }));
        }
    }

    Ok(creates)
}

/// `[{ where: { node }, edge, connect }]`, one input per concrete type of the target.
fn nested_connects(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    items: &GraphValue,
    path: &str,
) -> CoreResult<Vec<ConnectInput>> {
    let mut connects = Vec::new();

    for (index, item) in list_items(items).into_iter().enumerate() {
        let path = format!("{path}.{index}");
        let item = expect_object(item, &path)?;
        reject_unknown_keys(item, &["where", "edge", "connect"], &path)?;

        let filter = match entry(item, "where") {
            Some(condition) => {
                let where_path = format!("{path}.where");
                let condition = expect_object(condition, &where_path)?;
                reject_unknown_keys(condition, &["node"], &where_path)?;

                match entry(condition, "node") {
                    Some(node) => extract_filter(ctx, target, node, &format!("{where_path}.node"))?,
                    None => None,
                }
            }
            None => None,
        };

        let edge = edge_values(ctx, field, entry(item, "edge"), &format!("{path}.edge"))?;

        for concrete in ctx.schema.concrete_types(target)? {
            let connect = match entry(item, "connect") {
                Some(nested) => connect_relations(ctx, &concrete, nested, &format!("{path}.connect"))?,
                None => Vec::new(),
            };

            connects.push(ConnectInput {
                target: concrete,
                filter: filter.clone(),
                edge: edge.clone(),
                connect,
            });
        }
    }

    Ok(connects)
}

/// `{ field: [connect inputs] }` made from a connected node.
fn connect_relations(
    ctx: ExtractorContext<'_>,
    owner: &TypeRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<Vec<RelationWrite>> {
    let mut writes = Vec::new();

    for (key, items) in expect_object(value, path)?.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{key}");
        let field = relationship_field(owner, key, &path)?;

        writes.push(RelationWrite {
            field: field.clone(),
            ops: nested_ops(ctx, field, "connect", items, &path)?,
        });
    }

    Ok(writes)
}

/// `[{ where: { node, edge } }]`
fn nested_disconnects(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    items: &GraphValue,
    path: &str,
) -> CoreResult<Vec<NestedWrite>> {
    let mut disconnects = Vec::new();

    for (index, item) in list_items(items).into_iter().enumerate() {
        let path = format!("{path}.{index}");
        let item = expect_object(item, &path)?;
        reject_unknown_keys(item, &["where"], &path)?;

        let (filter, edge_filter) = match entry(item, "where") {
            Some(condition) => extract_node_edge_filter(ctx, field, target, condition, &format!("{path}.where"))?,
            None => (None, None),
        };

        for concrete in ctx.schema.concrete_types(target)? {
            disconnects.push(NestedWrite::Disconnect(DisconnectInput {
                target: concrete,
                filter: filter.clone(),
                edge_filter: edge_filter.clone(),
            }));
        }
    }

    Ok(disconnects)
}

/// `update: { node, edge }`, restricted by the sibling `where: { node, edge }`.
fn nested_updates(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    condition: Option<&GraphValue>,
    update: &GraphValue,
    path: &str,
) -> CoreResult<Vec<NestedWrite>> {
    let (filter, edge_filter) = match condition {
        Some(condition) => extract_node_edge_filter(ctx, field, target, condition, &format!("{path}.where"))?,
        None => (None, None),
    };

    let update = expect_object(update, path)?;
    reject_unknown_keys(update, &["node", "edge"], path)?;

    let edge = match entry(update, "edge") {
        Some(edge) => {
            let edge_path = format!("{path}.edge");
            let properties = ctx
                .schema
                .properties_type(field)?
                .ok_or_else(|| CoreError::query_shape(&edge_path, "the relationship has no properties"))?;

            expect_object(edge, &edge_path)?
                .iter()
                .map(|(key, value)| scalar_write(properties, key, value, &format!("{edge_path}.{key}")))
                .collect::<CoreResult<Vec<_>>>()?
        }
        None => Vec::new(),
    };

    let mut updates = Vec::new();

    for concrete in ctx.schema.concrete_types(target)? {
        let node = match entry(update, "node") {
            Some(node) => Some(extract_update_input(ctx, &concrete, node, &format!("{path}.node"))?),
            None => None,
        };

        updates.push(NestedWrite::Update(NestedUpdateInput {
            target: concrete,
            filter: filter.clone(),
            edge_filter: edge_filter.clone(),
            node,
            edge: edge.clone(),
        }));
    }

    Ok(updates)
}

/// `[{ where: { node, edge }, delete: { … } }]`
fn nested_deletes(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    items: &GraphValue,
    path: &str,
) -> CoreResult<Vec<NestedDeleteInput>> {
    let mut deletes = Vec::new();

    for (index, item) in list_items(items).into_iter().enumerate() {
        let path = format!("{path}.{index}");
        let item = expect_object(item, &path)?;
        reject_unknown_keys(item, &["where", "delete"], &path)?;

        let (filter, edge_filter) = match entry(item, "where") {
            Some(condition) => extract_node_edge_filter(ctx, field, target, condition, &format!("{path}.where"))?,
            None => (None, None),
        };

        for concrete in ctx.schema.concrete_types(target)? {
            let nested = match entry(item, "delete") {
                Some(nested) => delete_relations(ctx, &concrete, nested, &format!("{path}.delete"))?,
                None => Vec::new(),
            };

            deletes.push(NestedDeleteInput {
                target: concrete,
                filter: filter.clone(),
                edge_filter: edge_filter.clone(),
                nested,
            });
        }
    }

    Ok(deletes)
}

/// `{ field: [delete inputs] }` of nodes related to a deleted one.
fn delete_relations(
    ctx: ExtractorContext<'_>,
    owner: &TypeRef,
    value: &GraphValue,
    path: &str,
) -> CoreResult<Vec<DeleteRelation>> {
    let mut relations = Vec::new();

    for (key, items) in expect_object(value, path)?.iter().filter(|(_, v)| !v.is_null()) {
        let path = format!("{path}.{key}");
        let field = relationship_field(owner, key, &path)?;
        let mut deletes = Vec::new();

        for (target, items, path) in per_member(ctx, field, items, &path)? {
            deletes.extend(nested_deletes(ctx, field, &target, items, &path)?);
        }

        relations.push(DeleteRelation {
            field: field.clone(),
            deletes,
        });
    }

    Ok(relations)
}

/// `[{ where: { node: { <unique fields> } }, onCreate: { node, edge } }]`
fn connect_or_creates(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    target: &TypeRef,
    items: &GraphValue,
    path: &str,
) -> CoreResult<Vec<NestedWrite>> {
    if target.is_abstract() {
        return Err(CoreError::query_shape(path, "connectOrCreate needs a node type target"));
    }

    let mut inputs = Vec::new();

    for (index, item) in list_items(items).into_iter().enumerate() {
        let path = format!("{path}.{index}");
        let item = expect_object(item, &path)?;
        reject_unknown_keys(item, &["where", "onCreate"], &path)?;

        let where_path = format!("{path}.where.node");
        let unique = item
            .get("where")
            .and_then(GraphValue::as_object)
            .and_then(|condition| entry(condition, "node"))
            .ok_or_else(|| CoreError::validation(&where_path, "is required"))?;

        let unique = property_values(target, unique, &where_path)?;

        if unique.is_empty() {
            return Err(CoreError::validation(where_path, "at least one unique field is required"));
        }

        if let Some((field, _)) = unique.iter().find(|(f, _)| !(f.unique || target.is_unique(&f.name))) {
            return Err(CoreError::query_shape(
                format!("{where_path}.{}", field.name),
                "connectOrCreate can only match on unique fields",
            ));
        }

        let (on_create, edge) = match entry(item, "onCreate") {
            Some(on_create) => {
                let create_path = format!("{path}.onCreate");
                let on_create = expect_object(on_create, &create_path)?;
                reject_unknown_keys(on_create, &["node", "edge"], &create_path)?;

                let node = match entry(on_create, "node") {
                    Some(node) => property_values(target, node, &format!("{create_path}.node"))?,
                    None => Vec::new(),
                };

                let edge = edge_values(ctx, field, entry(on_create, "edge"), &format!("{create_path}.edge"))?;

                (node, edge)
            }
            None => (Vec::new(), Vec::new()),
        };

        inputs.push(NestedWrite::ConnectOrCreate(ConnectOrCreateInput {
            target: target.clone(),
            unique,
            on_create,
            edge,
        }));
    }

    Ok(inputs)
}

/// Scalar properties of `type_ref`, relationship fields are not allowed.
fn property_values(type_ref: &TypeDescriptor, value: &GraphValue, path: &str) -> CoreResult<PropertyValues> {
    let mut values = Vec::new();

    for (key, value) in expect_object(value, path)? {
        let path = format!("{path}.{key}");
        let field = known_field(type_ref, key, &path)?;

        if field.is_relationship() {
            return Err(CoreError::query_shape(path, "relationships cannot be written here"));
        }

        values.push((field.clone(), value.clone()));
    }

    Ok(values)
}

fn edge_values(
    ctx: ExtractorContext<'_>,
    field: &FieldRef,
    value: Option<&GraphValue>,
    path: &str,
) -> CoreResult<PropertyValues> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    match ctx.schema.properties_type(field)? {
        Some(properties) => property_values(properties, value, path),
        None => Err(CoreError::query_shape(path, "the relationship has no properties")),
    }
}

/// `field: value` or `field_<OPERATOR>: value` on a scalar field of `type_ref`.
fn scalar_write(type_ref: &TypeDescriptor, key: &str, value: &GraphValue, path: &str) -> CoreResult<ScalarWrite> {
    if let Some(field) = type_ref.find_field(key) {
        if field.is_relationship() {
            return Err(CoreError::query_shape(path, "relationships cannot be written here"));
        }

        return Ok(ScalarWrite {
            field: field.clone(),
            op: WriteOperation::Set(value.clone()),
        });
    }

    let Some((field, suffix)) = UPDATE_SUFFIXES.iter().find_map(|suffix| {
        key.strip_suffix(suffix)
            .and_then(|name| type_ref.find_field(name))
            .filter(|field| !field.is_relationship())
            .map(|field| (field, *suffix))
    }) else {
        return Err(CoreError::query_shape(
            path,
            format!("`{}` has no field `{key}`", type_ref.name),
        ));
    };

    let kind = field.scalar_kind();
    let value = value.clone();
    let unsupported = || {
        CoreError::validation(
            path,
            format!("`{suffix}` is not supported on `{}` of type {}", field.name, field.type_name),
        )
    };

    let integral = !field.list && matches!(kind, Some(ScalarKind::Int | ScalarKind::BigInt));
    let float = !field.list && kind == Some(ScalarKind::Float);

    let op = match suffix {
        "_INCREMENT" | "_DECREMENT" if !integral => return Err(unsupported()),
        "_INCREMENT" | "_DECREMENT" if value.as_i64().is_none() => {
            return Err(CoreError::validation(path, "expected an Int"));
        }
        "_INCREMENT" => WriteOperation::Increment(value),
        "_DECREMENT" => WriteOperation::Decrement(value),
        "_ADD" | "_SUBTRACT" | "_MULTIPLY" | "_DIVIDE" if !float => return Err(unsupported()),
        "_ADD" | "_SUBTRACT" | "_MULTIPLY" | "_DIVIDE" if !matches!(value, GraphValue::Float(_) | GraphValue::Int(_)) => {
            return Err(CoreError::validation(path, "expected a Float"));
        }
        "_DIVIDE" if matches!(value, GraphValue::Float(f) if f == 0.0) || value.as_i64() == Some(0) => {
            return Err(CoreError::validation(path, "division by zero"));
        }
        "_ADD" => WriteOperation::Add(value),
        "_SUBTRACT" => WriteOperation::Subtract(value),
        "_MULTIPLY" => WriteOperation::Multiply(value),
        "_DIVIDE" => WriteOperation::Divide(value),
        "_PUSH" | "_POP" if !field.list => return Err(unsupported()),
        "_PUSH" => WriteOperation::Push(value),
        "_POP" => WriteOperation::Pop(GraphValue::Int(expect_int(&value, path)?)),
        _ => return Err(unsupported()),
    };

    Ok(ScalarWrite {
        field: field.clone(),
        op,
    })
}

fn known_field<'t>(type_ref: &'t TypeDescriptor, key: &str, path: &str) -> CoreResult<&'t FieldRef> {
    type_ref
        .find_field(key)
        .ok_or_else(|| CoreError::query_shape(path, format!("`{}` has no field `{key}`", type_ref.name)))
}

fn relationship_field<'t>(type_ref: &'t TypeDescriptor, key: &str, path: &str) -> CoreResult<&'t FieldRef> {
    let field = known_field(type_ref, key, path)?;

    if field.is_relationship() {
        Ok(field)
    } else {
        Err(CoreError::query_shape(path, format!("`{key}` is not a relationship field")))
    }
}

fn reject_unknown_keys(object: &GraphObjectValue, allowed: &[&str], path: &str) -> CoreResult<()> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(CoreError::query_shape(
            format!("{path}.{key}"),
            format!("expected one of {}", allowed.join(", ")),
        )),
        None => Ok(()),
    }
}
