use crate::{BuildResult, Context, model_extensions::*};
use cypher_ast::ast::*;
use query_structure::prelude::*;
use tracing::trace;

/// `SET` items of a created node or relationship, in field order of `type_ref`.
///
/// Trigger-owned fields take their generated or callback value and ignore what the
/// client sent. Fields without a client value fall back to their `@default`. Fields in
/// `exclude` are left out, they are set by the pattern creating the node.
pub(crate) fn create_items(
    ctx: &Context<'_>,
    type_ref: &TypeRef,
    var: &Variable,
    values: &PropertyValues,
    exclude: &PropertyValues,
) -> BuildResult<Vec<SetItem>> {
    let mut items = Vec::new();

    for field in type_ref.scalar_fields() {
        if exclude.iter().any(|(excluded, _)| excluded.name == field.name) {
            continue;
        }

        let client_value = values.iter().find(|(f, _)| f.name == field.name).map(|(_, v)| v);

        if field.is_generated_on(WriteTrigger::Create) {
            if client_value.is_some() {
                trace!(field = %field.name, "client value of a generated field ignored");
            }

            if let Some(value) = trigger_value(ctx, field, var, WriteTrigger::Create)? {
                items.push(SetItem::new(field.property_of(var), value));
            }

            continue;
        }

        let value = client_value.or(field.default.as_ref());

        if let Some(value) = value {
            let parameter = field.write_parameter(var, value.clone(), ctx);
            items.push(SetItem::new(field.property_of(var), parameter));
        }
    }

    Ok(items)
}

/// `SET` items of an updated node or relationship: the client writes on fields no
/// trigger owns on any operation, followed by the `UPDATE` triggers of `type_ref`.
pub(crate) fn update_items(
    ctx: &Context<'_>,
    type_ref: &TypeRef,
    var: &Variable,
    writes: &[ScalarWrite],
) -> BuildResult<Vec<SetItem>> {
    let mut items = Vec::with_capacity(writes.len());

    for write in writes {
        if write.field.is_generated() {
            trace!(field = %write.field.name, "client write of a generated field ignored");
            continue;
        }

        items.push(SetItem::new(write.field.property_of(var), write_value(ctx, var, write)));
    }

    for field in type_ref.scalar_fields() {
        if let Some(value) = trigger_value(ctx, field, var, WriteTrigger::Update)? {
            items.push(SetItem::new(field.property_of(var), value));
        }
    }

    Ok(items)
}

/// The value written by a `@timestamp`, `@id(autogenerate)` or `@populatedBy` field on `op`.
fn trigger_value(ctx: &Context<'_>, field: &FieldRef, var: &Variable, op: WriteTrigger) -> BuildResult<Option<Expression>> {
    if let Some(generated) = field.generated_value(op) {
        return Ok(Some(generated));
    }

    match &field.populated_by {
        Some(populated_by) if populated_by.operations.contains(op) => {
            let value = ctx.callback(&populated_by.callback)?;
            Ok(Some(field.write_parameter(var, value, ctx).into()))
        }
        _ => Ok(None),
    }
}

/// `$p`, `this.p + $p`, `this.p[..size(this.p) - $p]`, …
fn write_value(ctx: &Context<'_>, var: &Variable, write: &ScalarWrite) -> Expression {
    let current = write.field.property_of(var);
    let parameter = |value: &GraphValue| Expression::from(write.field.write_parameter(var, value.clone(), ctx));

    match &write.op {
        WriteOperation::Set(value) => parameter(value),
        WriteOperation::Increment(value) | WriteOperation::Add(value) | WriteOperation::Push(value) => {
            current.arithmetic(ArithmeticOp::Add, parameter(value))
        }
        WriteOperation::Decrement(value) | WriteOperation::Subtract(value) => {
            current.arithmetic(ArithmeticOp::Subtract, parameter(value))
        }
        WriteOperation::Multiply(value) => current.arithmetic(ArithmeticOp::Multiply, parameter(value)),
        WriteOperation::Divide(value) => current.arithmetic(ArithmeticOp::Divide, parameter(value)),
        WriteOperation::Pop(value) => {
            let end = size(current.clone()).arithmetic(ArithmeticOp::Subtract, parameter(value));
            current.slice(None, Some(end))
        }
    }
}

/// `SET` of `items`, if there are any.
pub(crate) fn set_clause(items: Vec<SetItem>) -> Option<Clause> {
    if items.is_empty() {
        None
    } else {
        Some(Set::new().items(items).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Callback, Callbacks, Settings};
    use cypher_ast::visitor::{Cypher, Visitor};
    use expect_test::expect;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [{
                "name": "Movie",
                "fields": [
                    { "name": "id", "type": "ID", "id": {} },
                    { "name": "title", "type": "String" },
                    { "name": "rating", "type": "Float", "default": 0.5 },
                    { "name": "tags", "type": "String", "list": true },
                    { "name": "createdAt", "type": "DateTime", "timestamp": ["CREATE"] },
                    { "name": "updatedAt", "type": "DateTime", "timestamp": ["UPDATE"] },
                    { "name": "slug", "type": "String", "populatedBy": { "callback": "slug", "operations": ["CREATE"] } }
                ]
            }]
        }))
        .unwrap()
    }

    fn render(items: Vec<SetItem>) -> (String, cypher_ast::visitor::Parameters) {
        let this = Variable::new("this");
        let statement = Statement::new()
            .clause(Create::new(this.clone()))
            .clause(Set::new().items(items))
            .clause(Return::new().item(&this, None));

        Cypher::build(statement).unwrap()
    }

    #[test]
    fn created_nodes_take_generated_and_default_values() {
        let schema = schema();
        let settings = Settings::default();
        let mut callbacks = Callbacks::new();
        let slug: Callback = Arc::new(|| GraphValue::from("the-matrix"));
        callbacks.insert("slug".into(), slug);

        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();
        let this = Variable::new("this");

        let values = vec![
            (movie.find_field("id").unwrap().clone(), GraphValue::from("client-id")),
            (movie.find_field("title").unwrap().clone(), GraphValue::from("The Matrix")),
            (movie.find_field("createdAt").unwrap().clone(), GraphValue::from("1999-03-31")),
        ];

        let items = create_items(&ctx, movie, &this, &values, &Vec::new()).unwrap();
        let (query, params) = render(items);

        expect![[r#"
            CREATE (this)
            SET this.id = randomUUID(), this.title = $this_title, this.rating = $this_rating, this.createdAt = datetime(), this.slug = $this_slug
            RETURN this"#]]
        .assert_eq(&query);

        assert_eq!(params.get("this_slug"), Some(&GraphValue::from("the-matrix")));
        assert_eq!(params.get("this_rating"), Some(&GraphValue::Float(0.5)));
    }

    #[test]
    fn updates_apply_operators_and_update_triggers() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();
        let this = Variable::new("this");

        let writes = vec![
            ScalarWrite {
                field: movie.find_field("rating").unwrap().clone(),
                op: WriteOperation::Multiply(GraphValue::Float(2.0)),
            },
            ScalarWrite {
                field: movie.find_field("tags").unwrap().clone(),
                op: WriteOperation::Pop(GraphValue::Int(1)),
            },
            ScalarWrite {
                field: movie.find_field("updatedAt").unwrap().clone(),
                op: WriteOperation::Set(GraphValue::from("2020-01-01")),
            },
        ];

        let (query, _) = render(update_items(&ctx, movie, &this, &writes).unwrap());

        expect![[r#"
            CREATE (this)
            SET this.rating = this.rating * $this_rating, this.tags = this.tags[..size(this.tags) - $this_tags], this.updatedAt = datetime()
            RETURN this"#]]
        .assert_eq(&query);
    }

    #[test]
    fn updates_ignore_writes_to_create_only_generated_fields() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();
        let this = Variable::new("this");

        let set = |name: &str, value: &str| ScalarWrite {
            field: movie.find_field(name).unwrap().clone(),
            op: WriteOperation::Set(GraphValue::from(value)),
        };

        let writes = vec![
            set("id", "forged"),
            set("createdAt", "1999-03-31"),
            set("slug", "forged-slug"),
            set("title", "The Matrix"),
        ];

        let (query, params) = render(update_items(&ctx, movie, &this, &writes).unwrap());

        expect![[r#"
            CREATE (this)
            SET this.title = $this_title, this.updatedAt = datetime()
            RETURN this"#]]
        .assert_eq(&query);

        assert_eq!(params.len(), 1);
    }

    #[test]
    fn missing_callbacks_fail_the_translation() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let movie = schema.find_type("Movie").unwrap();

        let result = create_items(&ctx, movie, &Variable::new("this"), &Vec::new(), &Vec::new());

        assert_eq!(
            result,
            Err(crate::BuildError::MissingCallback { name: "slug".into() })
        );
    }
}
