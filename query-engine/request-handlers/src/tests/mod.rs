use crate::{GraphqlBody, HandlerError, QueryExecutor, RequestHandler, Row};
use async_trait::async_trait;
use cypher_query_builder::CypherStatement;
use graph_value::GraphValue;
use indoc::indoc;
use pretty_assertions::assert_eq;
use query_core::Translator;
use query_structure::GraphSchema;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tracing_test::traced_test;

/// Replays canned rows and records every statement it is given.
#[derive(Default)]
struct RecordingExecutor {
    rows: Mutex<Vec<crate::Result<Vec<Row>>>>,
    statements: Mutex<Vec<CypherStatement>>,
}

impl RecordingExecutor {
    fn returning(results: Vec<crate::Result<Value>>) -> Self {
        let rows = results
            .into_iter()
            .rev()
            .map(|result| {
                result.map(|rows| match rows {
                    Value::Array(rows) => rows
                        .into_iter()
                        .filter_map(|row| match row {
                            Value::Object(row) => Some(row),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                })
            })
            .collect();

        Self {
            rows: Mutex::new(rows),
            statements: Mutex::default(),
        }
    }

    fn statements(&self) -> Vec<CypherStatement> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, statement: &CypherStatement) -> crate::Result<Vec<Row>> {
        self.statements.lock().unwrap().push(statement.clone());
        self.rows.lock().unwrap().pop().unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn translator() -> Translator {
    let schema = GraphSchema::from_value(json!({
        "types": [
            {
                "name": "Movie",
                "fields": [
                    { "name": "id", "type": "ID" },
                    { "name": "title", "type": "String" }
                ]
            }
        ]
    }))
    .unwrap();

    Translator::builder(Arc::new(schema)).build().unwrap()
}

fn binds(statement: &CypherStatement, value: &str) -> bool {
    statement.params.iter().any(|(_, bound)| bound == &GraphValue::from(value))
}

#[tokio::test]
async fn reads_return_one_node_per_row() {
    let executor = RecordingExecutor::returning(vec![Ok(json!([
        { "this": { "title": "The Matrix" } },
        { "this": { "title": "The Matrix Reloaded" } }
    ]))]);
    let translator = translator();
    let handler = RequestHandler::new(&executor, &translator);

    let body = GraphqlBody::new(r#"{ movies(where: { title_STARTS_WITH: "The Matrix" }) { title } }"#);
    let response = handler.handle(body, None).await;

    assert!(!response.has_errors());
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "data": { "movies": [{ "title": "The Matrix" }, { "title": "The Matrix Reloaded" }] } })
    );

    let statements = executor.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].query.starts_with("MATCH (this:Movie)"));
    assert!(binds(&statements[0], "The Matrix"));
}

#[tokio::test]
async fn variables_reach_the_statement_parameters() {
    let executor = RecordingExecutor::default();
    let translator = translator();
    let handler = RequestHandler::new(&executor, &translator);

    let query = indoc! {r#"
        query Movie($title: String!) {
            movies(where: { title: $title }) { id }
        }
    "#};

    let body = GraphqlBody::new(query).with_variables(json!({ "title": "Heat" }));
    let response = handler.handle(body, None).await;

    assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "data": { "movies": [] } }));
    assert!(binds(&executor.statements()[0], "Heat"));
}

#[tokio::test]
async fn mutation_results_nest_under_the_plural() {
    let executor = RecordingExecutor::returning(vec![Ok(json!([{ "data": [{ "title": "Heat" }] }]))]);
    let translator = translator();
    let handler = RequestHandler::new(&executor, &translator);

    let body = GraphqlBody::new(r#"mutation { createMovies(input: [{ title: "Heat" }]) { movies { title } } }"#);
    let response = handler.handle(body, None).await;

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "data": { "createMovies": { "movies": [{ "title": "Heat" }] } } })
    );
}

#[tokio::test]
async fn failing_fields_resolve_to_null() {
    let executor = RecordingExecutor::returning(vec![Ok(json!([{ "this": { "id": "1" } }]))]);
    let translator = translator();
    let handler = RequestHandler::new(&executor, &translator);

    let body = GraphqlBody::new("{ movies { id } directors { name } }");
    let response = handler.handle(body, None).await;

    assert_eq!(response.data.get("movies"), Some(&json!([{ "id": "1" }])));
    assert_eq!(response.data.get("directors"), Some(&Value::Null));

    let errors: Vec<_> = response.errors().map(|e| (e.code(), e.path().to_vec())).collect();
    assert_eq!(errors, vec![("QUERY_SHAPE_ERROR", vec!["directors".to_owned()])]);
    assert_eq!(executor.statements().len(), 1);
}

#[tokio::test]
async fn executor_failures_are_reported() {
    let executor = RecordingExecutor::returning(vec![Err(HandlerError::executor("connection refused"))]);
    let translator = translator();
    let handler = RequestHandler::new(&executor, &translator);

    let response = handler.handle(GraphqlBody::new("{ movies { id } }"), None).await;
    let error = response.errors().next().unwrap();

    assert_eq!(error.code(), "EXECUTION_FAILED");
    assert_eq!(error.message(), "Query execution failed: connection refused");
}

#[tokio::test]
async fn unparsable_documents_have_no_data() {
    let executor = RecordingExecutor::default();
    let translator = translator();
    let handler = RequestHandler::new(&executor, &translator);

    let response = handler.handle(GraphqlBody::new("{ movies { id "), None).await;

    assert!(response.data.is_empty());
    assert_eq!(response.errors().next().map(|e| e.code()), Some("GRAPHQL_PARSE_FAILED"));
    assert!(executor.statements().is_empty());
}

#[tokio::test]
#[traced_test]
async fn incoming_queries_are_logged() {
    let executor = RecordingExecutor::default();
    let translator = translator();
    let handler = RequestHandler::new(&executor, &translator);

    handler.handle(GraphqlBody::new("{ movies { id } }"), None).await;

    assert!(logs_contain("Incoming GraphQL query"));
    assert!(logs_contain("executed statement"));
}
