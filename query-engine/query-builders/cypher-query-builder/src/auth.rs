//! Weaves `@auth` rules into match predicates and post-write validations.
//!
//! Only rules whose operation set contains the current operation take part. Rules of the
//! type come first, followed by the rules of every touched field in the order given, and
//! all of them must hold. A rule whose requirements cannot be met by the caller context
//! fails the translation with [`BuildError::AuthorizationContext`].
use crate::{
    BuildError, BuildResult, Context,
    filter::FilterVisitor,
    validation::{FORBIDDEN, validate},
};
use cypher_ast::ast::*;
use graph_value::GraphValue;
use query_structure::{AuthOperation, AuthRule, FieldRef, TypeRef};

const AUTH_TOKEN: &str = "auth";
const ROLES_CLAIM: &str = "roles";

/// The predicate every node of `type_ref` bound to `var` must satisfy for `op`. `None`
/// when no rule applies.
pub(crate) fn auth_predicate<'f>(
    ctx: &Context<'_>,
    type_ref: &TypeRef,
    fields: impl IntoIterator<Item = &'f FieldRef>,
    op: AuthOperation,
    var: &Variable,
) -> BuildResult<Option<Expression>> {
    let field_rules = fields
        .into_iter()
        .flat_map(|field| field.auth.iter().filter(move |rule| rule.applies_to(op)));

    let mut parts = Vec::new();

    for rule in type_ref.rules_for(op).chain(field_rules) {
        if let Some(predicate) = rule_predicate(ctx, type_ref, rule, var)? {
            parts.push(predicate);
        }
    }

    Ok(Expression::conjunction(parts))
}

/// Aborts statements creating a node of `type_ref` that violates a `CREATE` rule.
pub(crate) fn create_validation<'f>(
    ctx: &Context<'_>,
    type_ref: &TypeRef,
    fields: impl IntoIterator<Item = &'f FieldRef>,
    var: &Variable,
) -> BuildResult<Option<Clause>> {
    let predicate = auth_predicate(ctx, type_ref, fields, AuthOperation::Create, var)?;

    Ok(predicate.map(|predicate| validate(ctx, predicate.not(), FORBIDDEN)))
}

fn rule_predicate(ctx: &Context<'_>, type_ref: &TypeRef, rule: &AuthRule, var: &Variable) -> BuildResult<Option<Expression>> {
    if rule.is_authenticated && !ctx.is_authenticated() {
        return Err(BuildError::AuthorizationContext);
    }

    let mut parts = Vec::new();

    if let Some(template) = &rule.where_template {
        let filter = ctx
            .auth_parser()
            .parse(type_ref, template, &format!("{}.@auth.where", type_ref.name))?;

        parts.extend(FilterVisitor::new(ctx, var, AUTH_TOKEN).visit_filter(&filter, var)?);
    }

    if !rule.roles.is_empty() {
        parts.push(roles_predicate(ctx, rule, var));
    }

    Ok(Expression::conjunction(parts))
}

/// `any(role IN $caller WHERE role IN $allowed)`. A caller without a `roles` claim is
/// bound an empty list and never passes.
fn roles_predicate(ctx: &Context<'_>, rule: &AuthRule, var: &Variable) -> Expression {
    let caller_roles = match ctx.optional_claim(ROLES_CLAIM) {
        Some(GraphValue::List(roles)) => GraphValue::List(roles.clone()),
        Some(GraphValue::String(role)) => GraphValue::List(vec![GraphValue::String(role.clone())]),
        _ => GraphValue::List(Vec::new()),
    };

    let allowed = GraphValue::List(rule.roles.iter().map(|role| GraphValue::from(role.as_str())).collect());

    let caller = Parameter::new(ctx.predicate_parameter(var, AUTH_TOKEN), caller_roles);
    let allowed = Parameter::new(ctx.predicate_parameter(var, AUTH_TOKEN), allowed);
    let role = Variable::new("role");

    Expression::quantifier(QuantifierKind::Any, role.clone(), caller, role.is_in(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Callbacks, context::Settings};
    use cypher_ast::visitor::{Cypher, Visitor};
    use expect_test::expect;
    use pretty_assertions::assert_eq;
    use query_structure::GraphSchema;
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "User",
                    "fields": [
                        { "name": "id", "type": "ID" },
                        { "name": "email", "type": "String", "auth": [{ "operations": ["READ"], "roles": ["admin"] }] }
                    ]
                },
                {
                    "name": "Post",
                    "fields": [
                        { "name": "title", "type": "String" },
                        { "name": "creator", "type": "User", "relationship": { "type": "HAS_POST", "direction": "IN" } }
                    ],
                    "auth": [
                        { "operations": ["READ", "UPDATE"], "where": { "creator": { "id": "$jwt.sub" } } },
                        { "operations": ["DELETE"], "isAuthenticated": true }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    fn render(condition: Expression) -> String {
        let this = Variable::new("this");
        let statement = Statement::new()
            .clause(Match::new(this.clone()).so_that(condition))
            .clause(Return::new().item(&this, None));

        Cypher::build(statement).unwrap().0
    }

    #[test]
    fn where_templates_substitute_claims() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let claims = GraphValue::try_from(json!({ "sub": "id-01" })).unwrap();
        let ctx = Context::new(&schema, &settings, Some(&claims), &callbacks);
        let post = schema.find_type("Post").unwrap();
        let this = Variable::new("this");

        let predicate = auth_predicate(&ctx, post, [], AuthOperation::Read, &this).unwrap().unwrap();

        expect![[r#"
            MATCH (this)
            WHERE EXISTS { MATCH (this)<-[:HAS_POST]-(this_creator0:User) WHERE this_creator0.id = $thisauth_param0 }
            RETURN this"#]]
        .assert_eq(&render(predicate));
    }

    #[test]
    fn rules_outside_the_operation_are_inert() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let post = schema.find_type("Post").unwrap();

        let predicate = auth_predicate(&ctx, post, [], AuthOperation::Create, &Variable::new("this")).unwrap();

        assert_eq!(predicate, None);
    }

    #[test]
    fn missing_identity_fails_the_translation() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let ctx = Context::new(&schema, &settings, None, &callbacks);
        let post = schema.find_type("Post").unwrap();
        let this = Variable::new("this");

        let read = auth_predicate(&ctx, post, [], AuthOperation::Read, &this);
        assert_eq!(read, Err(BuildError::AuthorizationContext));

        let delete = auth_predicate(&ctx, post, [], AuthOperation::Delete, &this);
        assert_eq!(delete, Err(BuildError::AuthorizationContext));
        assert_eq!(BuildError::AuthorizationContext.to_string(), "Unauthenticated");
    }

    #[test]
    fn field_rules_require_a_matching_role() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let claims = GraphValue::try_from(json!({ "sub": "id-01", "roles": ["reader"] })).unwrap();
        let ctx = Context::new(&schema, &settings, Some(&claims), &callbacks);
        let user = schema.find_type("User").unwrap();
        let email = user.find_field("email").unwrap();
        let this = Variable::new("this");

        let predicate = auth_predicate(&ctx, user, [email], AuthOperation::Read, &this).unwrap().unwrap();
        let (query, params) = Cypher::build(
            Statement::new()
                .clause(Match::new(this.clone()).so_that(predicate))
                .clause(Return::new().item(&this, None)),
        )
        .unwrap();

        assert!(query.contains("WHERE any(role IN $thisauth_param0 WHERE role IN $thisauth_param1)"));
        assert_eq!(params.get("thisauth_param0"), Some(&GraphValue::List(vec!["reader".into()])));
        assert_eq!(params.get("thisauth_param1"), Some(&GraphValue::List(vec!["admin".into()])));
    }
}
