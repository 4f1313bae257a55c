mod assembler;
mod auth;
mod context;
mod error;
mod filter;
mod model_extensions;
mod projection;
mod read;
mod validation;
mod write;

use graph_value::GraphValue;
use query_structure::{
    GraphSchema, QueryArguments, TypeRef,
    prelude::{AggregateSelection, BranchSelection, ConnectionSelection, CreateInput, DeleteArgs, ObjectSelection, UpdateArgs},
};

pub use assembler::{CypherStatement, assemble};
pub use context::{Callback, Callbacks, Context, Settings};
pub use error::{BuildError, BuildResult};

/// Builds one statement per top-level operation.
pub trait QueryBuilder {
    fn build_read(
        &self,
        target: &TypeRef,
        args: &QueryArguments,
        selection: &BranchSelection,
    ) -> BuildResult<CypherStatement>;

    fn build_connection(&self, selection: &ConnectionSelection) -> BuildResult<CypherStatement>;

    fn build_aggregate(&self, selection: &AggregateSelection) -> BuildResult<CypherStatement>;

    fn build_create(&self, inputs: &[CreateInput], selection: &ObjectSelection) -> BuildResult<CypherStatement>;

    fn build_update(
        &self,
        target: &TypeRef,
        args: &UpdateArgs,
        selection: &ObjectSelection,
    ) -> BuildResult<CypherStatement>;

    fn build_delete(&self, target: &TypeRef, args: &DeleteArgs) -> BuildResult<CypherStatement>;
}

/// The Cypher [`QueryBuilder`] for one caller. Each build runs on a fresh [`Context`], so
/// names and parameters never leak from one statement into the next.
pub struct CypherQueryBuilder<'a> {
    schema: &'a GraphSchema,
    settings: &'a Settings,
    claims: Option<&'a GraphValue>,
    callbacks: &'a Callbacks,
}

impl<'a> CypherQueryBuilder<'a> {
    pub fn new(
        schema: &'a GraphSchema,
        settings: &'a Settings,
        claims: Option<&'a GraphValue>,
        callbacks: &'a Callbacks,
    ) -> Self {
        Self {
            schema,
            settings,
            claims,
            callbacks,
        }
    }

    fn context(&self) -> Context<'a> {
        Context::new(self.schema, self.settings, self.claims, self.callbacks)
    }
}

impl QueryBuilder for CypherQueryBuilder<'_> {
    #[tracing::instrument(name = "build_read", skip_all, fields(target = %target.name))]
    fn build_read(
        &self,
        target: &TypeRef,
        args: &QueryArguments,
        selection: &BranchSelection,
    ) -> BuildResult<CypherStatement> {
        let ctx = self.context();
        assemble([read::read(&ctx, target, args, selection)?])
    }

    #[tracing::instrument(name = "build_connection", skip_all, fields(target = %selection.target.name))]
    fn build_connection(&self, selection: &ConnectionSelection) -> BuildResult<CypherStatement> {
        let ctx = self.context();
        assemble([read::connection::root(&ctx, selection)?])
    }

    #[tracing::instrument(name = "build_aggregate", skip_all, fields(target = %selection.target.name))]
    fn build_aggregate(&self, selection: &AggregateSelection) -> BuildResult<CypherStatement> {
        let ctx = self.context();
        assemble([read::aggregate::root(&ctx, selection)?])
    }

    #[tracing::instrument(name = "build_create", skip_all, fields(target = %selection.type_ref.name, inputs = inputs.len()))]
    fn build_create(&self, inputs: &[CreateInput], selection: &ObjectSelection) -> BuildResult<CypherStatement> {
        let ctx = self.context();
        assemble([write::create(&ctx, inputs, selection)?])
    }

    #[tracing::instrument(name = "build_update", skip_all, fields(target = %target.name))]
    fn build_update(
        &self,
        target: &TypeRef,
        args: &UpdateArgs,
        selection: &ObjectSelection,
    ) -> BuildResult<CypherStatement> {
        let ctx = self.context();
        assemble([write::update(&ctx, target, args, selection)?])
    }

    #[tracing::instrument(name = "build_delete", skip_all, fields(target = %target.name))]
    fn build_delete(&self, target: &TypeRef, args: &DeleteArgs) -> BuildResult<CypherStatement> {
        let ctx = self.context();
        assemble([write::delete(&ctx, target, args)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use pretty_assertions::assert_eq;
    use query_structure::{FilterParser, prelude::*};
    use serde_json::json;

    fn schema() -> GraphSchema {
        GraphSchema::from_value(json!({
            "types": [
                {
                    "name": "Post",
                    "auth": [{ "operations": ["READ"], "where": { "creator": { "id": "$jwt.sub" } } }],
                    "fields": [
                        { "name": "id", "type": "ID" },
                        { "name": "content", "type": "String" },
                        { "name": "creator", "type": "User", "required": true, "relationship": { "type": "HAS_POST", "direction": "IN" } }
                    ]
                },
                {
                    "name": "User",
                    "fields": [
                        { "name": "id", "type": "ID" },
                        { "name": "posts", "type": "Post", "list": true, "relationship": { "type": "HAS_POST", "direction": "OUT" } }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    fn posts(schema: &GraphSchema) -> BranchSelection {
        let post = schema.find_type("Post").unwrap();

        vec![ObjectSelection::new(
            post.clone(),
            vec![SelectedField::Scalar {
                alias: "id".into(),
                field: post.find_field("id").unwrap().clone(),
            }],
        )]
    }

    #[test]
    fn read_rules_bind_the_caller_claims() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let claims = GraphValue::object([("sub", GraphValue::from("id-01"))]);
        let builder = CypherQueryBuilder::new(&schema, &settings, Some(&claims), &callbacks);
        let post = schema.find_type("Post").unwrap();

        let statement = builder
            .build_read(post, &QueryArguments::default(), &posts(&schema))
            .unwrap();

        expect![[r#"
            MATCH (this:Post)
            WHERE EXISTS { MATCH (this)<-[:HAS_POST]-(this_creator0:User) WHERE this_creator0.id = $thisauth_param0 }
            RETURN this { .id } AS this"#]]
        .assert_eq(&statement.query);

        assert_eq!(statement.params.get("thisauth_param0"), Some(&GraphValue::from("id-01")));
    }

    #[test]
    fn translations_are_deterministic() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let claims = GraphValue::object([("sub", GraphValue::from("id-01"))]);
        let builder = CypherQueryBuilder::new(&schema, &settings, Some(&claims), &callbacks);
        let post = schema.find_type("Post").unwrap();
        let selection = posts(&schema);

        let first = builder.build_read(post, &QueryArguments::default(), &selection).unwrap();
        let second = builder.build_read(post, &QueryArguments::default(), &selection).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn caller_filters_cannot_widen_read_rules() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let claims = GraphValue::object([("sub", GraphValue::from("id-01"))]);
        let builder = CypherQueryBuilder::new(&schema, &settings, Some(&claims), &callbacks);
        let post = schema.find_type("Post").unwrap();

        let filter = FilterParser::new(&schema)
            .parse(post, &GraphValue::object([("content", GraphValue::from("hello"))]), "where")
            .unwrap();

        let args = QueryArguments {
            filter: Some(filter),
            ..Default::default()
        };

        let statement = builder.build_read(post, &args, &posts(&schema)).unwrap();
        let condition = statement.query.lines().nth(1).unwrap();

        assert!(condition.starts_with("WHERE EXISTS { MATCH (this)<-[:HAS_POST]-(this_creator0:User)"));
        assert!(condition.ends_with(" AND this.content = $this_param0"));
        assert_eq!(statement.params.get("this_param0"), Some(&GraphValue::from("hello")));
    }

    #[test]
    fn rules_needing_claims_fail_for_anonymous_callers() {
        let schema = schema();
        let settings = Settings::default();
        let callbacks = Callbacks::new();
        let builder = CypherQueryBuilder::new(&schema, &settings, None, &callbacks);
        let post = schema.find_type("Post").unwrap();

        let result = builder.build_read(post, &QueryArguments::default(), &posts(&schema));

        assert_eq!(result, Err(BuildError::AuthorizationContext));
        assert_eq!(BuildError::AuthorizationContext.to_string(), "Unauthenticated");
    }
}
