use crate::{HandlerError, Row};
use indexmap::IndexMap;
use query_core::ResultShape;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct GQLResponse {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GQLError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct GQLError {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    path: Vec<String>,
}

impl GQLError {
    pub fn code(&self) -> &str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.error
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn from_handler_error(err: HandlerError) -> Self {
        GQLError {
            code: err.code(),
            error: err.to_string(),
            path: Vec::new(),
        }
    }

    pub fn at(mut self, key: impl Into<String>) -> Self {
        self.path.push(key.into());
        self
    }
}

impl From<HandlerError> for GQLError {
    fn from(err: HandlerError) -> Self {
        Self::from_handler_error(err)
    }
}

impl GQLResponse {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: IndexMap::with_capacity(capacity),
            ..Default::default()
        }
    }

    pub fn insert_data(&mut self, key: impl Into<String>, item: Value) {
        self.data.insert(key.into(), item);
    }

    pub fn insert_error(&mut self, error: impl Into<GQLError>) {
        self.errors.push(error.into());
    }

    pub fn take_data(&mut self, key: impl AsRef<str>) -> Option<Value> {
        self.data.swap_remove(key.as_ref())
    }

    pub fn errors(&self) -> impl Iterator<Item = &GQLError> {
        self.errors.iter()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl From<HandlerError> for GQLResponse {
    fn from(err: HandlerError) -> Self {
        let mut gql_response = Self::default();

        gql_response.insert_error(err);
        gql_response
    }
}

/// Turns the rows of a translated statement into the value of its root field.
pub(crate) fn shape_rows(shape: &ResultShape, rows: Vec<Row>) -> Value {
    let first = |rows: Vec<Row>| rows.into_iter().next().unwrap_or_default();

    match shape {
        ResultShape::List => Value::Array(
            rows.into_iter()
                .filter_map(|mut row| row.remove("this"))
                .collect(),
        ),
        ResultShape::Single => first(rows).remove("this").unwrap_or(Value::Null),
        ResultShape::Mutation { key } => {
            let data = first(rows).remove("data").unwrap_or_else(|| Value::Array(Vec::new()));

            Value::Object([(key.clone(), data)].into_iter().collect())
        }
        ResultShape::Delete => {
            let mut row = first(rows);
            let mut count = |column: &str| row.remove(column).unwrap_or_else(|| Value::from(0));

            let nodes_deleted = count("nodesDeleted");
            let relationships_deleted = count("relationshipsDeleted");

            serde_json::json!({
                "nodesDeleted": nodes_deleted,
                "relationshipsDeleted": relationships_deleted,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        match value {
            Value::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(row) => row,
                    _ => panic!("rows must be objects"),
                })
                .collect(),
            _ => panic!("expected a list of rows"),
        }
    }

    #[test]
    fn list_results_collect_one_node_per_row() {
        let rows = rows(json!([{ "this": { "title": "A" } }, { "this": { "title": "B" } }]));

        assert_eq!(shape_rows(&ResultShape::List, rows), json!([{ "title": "A" }, { "title": "B" }]));
    }

    #[test]
    fn single_results_without_rows_are_null() {
        assert_eq!(shape_rows(&ResultShape::Single, Vec::new()), Value::Null);
    }

    #[test]
    fn mutation_results_nest_under_the_response_key() {
        let shape = ResultShape::Mutation { key: "movies".into() };
        let rows = rows(json!([{ "data": [{ "id": "1" }] }]));

        assert_eq!(shape_rows(&shape, rows), json!({ "movies": [{ "id": "1" }] }));
    }

    #[test]
    fn delete_results_default_to_zero_counts() {
        let rows = rows(json!([{ "nodesDeleted": 2 }]));

        assert_eq!(
            shape_rows(&ResultShape::Delete, rows),
            json!({ "nodesDeleted": 2, "relationshipsDeleted": 0 })
        );
    }
}
