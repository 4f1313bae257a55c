//! Post-conditions on singular relationship fields.
//!
//! A required singular field must end the statement with exactly one relationship, an
//! optional one with at most one. The checks abort the statement, so they run inside the
//! transaction of the write that could break them.
use crate::{
    BuildResult, Context,
    model_extensions::*,
    validation::validate,
};
use cypher_ast::ast::*;
use query_structure::prelude::*;

/// The check of one singular relationship `field` on the node bound to `node`.
pub(crate) fn field_check(ctx: &Context<'_>, type_ref: &TypeRef, field: &FieldRef, node: &Variable) -> BuildResult<Option<Clause>> {
    if !field.is_singular_relationship() {
        return Ok(None);
    }

    let target = ctx.schema().related_type(field)?;
    let pattern = field.hop(node, None, target.as_node_pattern(None, ctx)?);
    let related = Expression::count_of(PatternQuery::new(pattern));

    let (holds, message) = if field.required {
        (
            related.equals(Expression::int(1)),
            format!("{}.{} required exactly once", type_ref.name, field.name),
        )
    } else {
        (
            related.less_than_or_equals(Expression::int(1)),
            format!("Relationship field \"{}.{}\" cannot have more than one node linked", type_ref.name, field.name),
        )
    };

    Ok(Some(validate(ctx, holds.not(), message)))
}

/// Checks of every singular relationship of a node created by the statement.
pub(crate) fn all_singular(ctx: &Context<'_>, type_ref: &TypeRef, node: &Variable) -> BuildResult<Vec<Clause>> {
    let mut checks = Vec::new();

    for field in type_ref.relationship_fields() {
        checks.extend(field_check(ctx, type_ref, field, node)?);
    }

    Ok(checks)
}

/// Checks of the singular fields `writes` changed on the node bound to `node`.
pub(crate) fn touched(
    ctx: &Context<'_>,
    type_ref: &TypeRef,
    writes: &[RelationWrite],
    node: &Variable,
) -> BuildResult<Vec<Clause>> {
    let mut checks = Vec::new();

    for field in type_ref.relationship_fields() {
        if writes.iter().any(|write| write.field.name == field.name) {
            checks.extend(field_check(ctx, type_ref, field, node)?);
        }
    }

    Ok(checks)
}

/// Checks on the other end of an edge written through `field`: the singular fields of
/// `target_type` pointing back at `owner_type`. Removing an edge can only break required
/// fields, hence `required_only`.
pub(crate) fn inverse(
    ctx: &Context<'_>,
    owner_type: &TypeRef,
    field: &FieldRef,
    target_type: &TypeRef,
    target: &Variable,
    required_only: bool,
) -> BuildResult<Vec<Clause>> {
    let mut checks = Vec::new();

    for (inverse_type, inverse_field) in ctx.schema().inverse_fields(owner_type, field)? {
        if inverse_type.name != target_type.name || (required_only && !inverse_field.required) {
            continue;
        }

        checks.extend(field_check(ctx, target_type, &inverse_field, target)?);
    }

    Ok(checks)
}

/// `WITH *` followed by `checks`, nothing when there are none.
pub(crate) fn group(checks: Vec<Clause>) -> Vec<Clause> {
    if checks.is_empty() {
        return checks;
    }

    let mut clauses = Vec::with_capacity(checks.len() + 1);
    clauses.push(With::star().into());
    clauses.extend(checks);
    clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Callbacks, Settings};
    use cypher_ast::visitor::{Cypher, Visitor};
    use expect_test::expect;
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Post",
                    "fields": [
                        { "name": "creator", "type": "User", "required": true, "relationship": { "type": "HAS_POST", "direction": "IN" } },
                        { "name": "editor", "type": "User", "relationship": { "type": "EDITS", "direction": "IN" } }
                    ]
                },
                {
                    "name": "User",
                    "fields": [
                        { "name": "posts", "type": "Post", "list": true, "relationship": { "type": "HAS_POST", "direction": "OUT" } }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    fn render(clauses: Vec<Clause>) -> String {
        let this = Variable::new("this");
        let mut statement = Statement::new().clause(Match::new(this.clone()));
        statement.extend(clauses);
        statement.push(Return::new().item(&this, None));

        Cypher::build(statement).unwrap().0
    }

    #[test]
    fn created_nodes_check_every_singular_field() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let post = schema.find_type("Post").unwrap();

        let checks = all_singular(&ctx, post, &Variable::new("this")).unwrap();

        expect![[r#"
            MATCH (this)
            WITH *
            CALL apoc.util.validate(NOT (COUNT { MATCH (this)<-[:HAS_POST]-(:User) } = 1), "Post.creator required exactly once", [0])
            CALL apoc.util.validate(NOT (COUNT { MATCH (this)<-[:EDITS]-(:User) } <= 1), "Relationship field \"Post.editor\" cannot have more than one node linked", [0])
            RETURN this"#]]
        .assert_eq(&render(group(checks)));
    }

    #[test]
    fn edges_removed_from_the_other_side_check_required_inverses() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let user = schema.find_type("User").unwrap();
        let post = schema.find_type("Post").unwrap();
        let posts = user.find_field("posts").unwrap();

        let checks = inverse(&ctx, user, posts, post, &Variable::new("this_posts_disconnect0"), true).unwrap();

        assert_eq!(checks.len(), 1);
        assert!(group(Vec::new()).is_empty());
    }
}
