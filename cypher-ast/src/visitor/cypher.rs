use crate::{
    ast::{GraphValue, Statement},
    error::Result,
    visitor::{Parameters, Visitor},
};
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// A visitor to generate Cypher statements for Neo4j 5.
pub struct Cypher {
    query: String,
    parameters: Parameters,
    depth: usize,
}

impl Visitor for Cypher {
    #[tracing::instrument(name = "render_cypher", skip(statement))]
    fn build<S>(statement: S) -> Result<(String, Parameters)>
    where
        S: Into<Statement>,
    {
        let mut cypher = Cypher {
            query: String::with_capacity(4096),
            parameters: Parameters::default(),
            depth: 0,
        };

        cypher.visit_statement(statement.into())?;

        Ok((cypher.query, cypher.parameters))
    }

    fn write<D: fmt::Display>(&mut self, s: D) -> Result<()> {
        write!(&mut self.query, "{s}")?;
        Ok(())
    }

    fn new_line(&mut self) -> Result<()> {
        self.query.push('\n');

        for _ in 0..self.depth {
            self.query.push_str(INDENT);
        }

        Ok(())
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn outdent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn add_parameter(&mut self, name: String, value: GraphValue) -> Result<()> {
        self.parameters.insert(name, value)
    }
}
