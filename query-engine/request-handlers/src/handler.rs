use crate::{GQLError, GQLResponse, GraphqlBody, QueryExecutor, response};
use graph_value::GraphValue;
use query_core::{Operation, Translator};
use serde_json::Value;
use std::fmt;
use tracing::{Instrument, debug, info_span};

pub struct RequestHandler<'a> {
    executor: &'a (dyn QueryExecutor + Send + Sync + 'a),
    translator: &'a Translator,
}

impl<'a> fmt::Debug for RequestHandler<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler").finish()
    }
}

impl<'a> RequestHandler<'a> {
    pub fn new(executor: &'a (dyn QueryExecutor + Send + Sync + 'a), translator: &'a Translator) -> Self {
        Self { executor, translator }
    }

    /// Root fields run one after another. A failing field resolves to `null` and reports an
    /// error carrying its response key.
    pub async fn handle(&self, body: GraphqlBody, claims: Option<&GraphValue>) -> GQLResponse {
        debug!("Incoming GraphQL query: {:?}", &body.query);

        let operations = match body.into_operations() {
            Ok(operations) => operations,
            Err(err) => return err.into(),
        };

        let mut gql_response = GQLResponse::with_capacity(operations.len());

        for operation in operations {
            let key = operation.response_key().to_owned();
            let span = info_span!("graphql:field", key = %key, write = operation.is_write());

            match self.handle_operation(&operation, claims).instrument(span).await {
                Ok(data) => gql_response.insert_data(key, data),
                Err(err) => {
                    gql_response.insert_data(key.clone(), Value::Null);
                    gql_response.insert_error(GQLError::from_handler_error(err).at(key));
                }
            }
        }

        gql_response
    }

    async fn handle_operation(&self, operation: &Operation, claims: Option<&GraphValue>) -> crate::Result<Value> {
        let translation = self.translator.translate(operation, claims)?;
        let rows = self.executor.execute(&translation.statement).await?;

        debug!(rows = rows.len(), "executed statement");

        Ok(response::shape_rows(&translation.shape, rows))
    }
}
