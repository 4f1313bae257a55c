use crate::{BuildError, BuildResult};
use cypher_ast::{
    ast::{Clause, Statement},
    visitor::{Cypher, Parameters, Visitor},
};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// A rendered statement with its parameter bag, ready for the query executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CypherStatement {
    pub query: String,
    pub params: Parameters,
}

impl fmt::Display for CypherStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

/// Concatenates `fragments` in order and renders them. The last clause must be a `RETURN`.
pub fn assemble(fragments: impl IntoIterator<Item = Statement>) -> BuildResult<CypherStatement> {
    let statement = fragments.into_iter().fold(Statement::new(), Statement::then);

    if !matches!(statement.last(), Some(Clause::Return(_))) {
        return Err(BuildError::InvariantViolation(
            "a statement must end with a RETURN clause".into(),
        ));
    }

    let (query, params) = Cypher::build(statement).map_err(|err| match err {
        err @ cypher_ast::Error::ParameterCollision { .. } => BuildError::InvariantViolation(err.to_string()),
        err => BuildError::Render(err),
    })?;

    debug!(%query, params = params.len(), "assembled statement");

    Ok(CypherStatement { query, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cypher_ast::ast::*;
    use graph_value::GraphValue;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn fragments_render_in_order() {
        let this = Variable::new("this");

        let matched = Statement::new().clause(
            Match::new(NodePattern::new(this.clone()).label("Movie"))
                .so_that(this.property("title").equals(Parameter::new("this_param0", "Alien"))),
        );

        let returned = Statement::new().clause(Return::new().item(this.clone().project([MapItem::property("title")]), Some(this)));

        let statement = assemble([matched, returned]).unwrap();

        assert_eq!(
            statement.query,
            indoc! {"
                MATCH (this:Movie)
                WHERE this.title = $this_param0
                RETURN this { .title } AS this"}
        );
        assert_eq!(statement.params.get("this_param0"), Some(&GraphValue::from("Alien")));
        assert_eq!(statement.to_string(), statement.query);
    }

    #[test]
    fn statements_must_end_with_return() {
        let matched = Statement::new().clause(Match::new(Variable::new("this")));

        assert!(matches!(assemble([matched]), Err(BuildError::InvariantViolation(_))));
        assert!(matches!(assemble(Vec::new()), Err(BuildError::InvariantViolation(_))));
    }

    #[test]
    fn parameters_serialize_as_a_map() {
        let this = Variable::new("this");
        let statement = Statement::new()
            .clause(Match::new(this.clone()).so_that(this.property("year").equals(Parameter::new("this_param0", 1999i64))))
            .clause(Return::new().item(&this, None));

        let statement = assemble([statement]).unwrap();

        assert_eq!(
            serde_json::to_value(&statement.params).unwrap(),
            serde_json::json!({ "this_param0": 1999 })
        );
    }
}
