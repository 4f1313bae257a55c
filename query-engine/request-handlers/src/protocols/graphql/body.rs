use super::protocol_adapter::GraphQLProtocolAdapter;
use query_core::Operation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlBody {
    pub query: String,
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: serde_json::Map<String, serde_json::Value>,
}

impl GraphqlBody {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: serde_json::Value) -> Self {
        if let serde_json::Value::Object(variables) = variables {
            self.variables = variables;
        }

        self
    }

    /// Parses the document and converts the selected operation into one operation per root field.
    pub fn into_operations(self) -> crate::Result<Vec<Operation>> {
        let gql_doc = graphql_parser::query::parse_query::<String>(&self.query)?;

        GraphQLProtocolAdapter::convert(gql_doc, self.operation_name.as_deref(), &self.variables)
    }
}
