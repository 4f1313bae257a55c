use crate::Context;
use cypher_ast::ast::{Clause, Expression, Procedure};

pub(crate) const FORBIDDEN: &str = "Forbidden";

/// `CALL apoc.util.validate(failing, "message", [0])`: aborts the statement when `failing`
/// holds for the current row.
pub(crate) fn validate(ctx: &Context<'_>, failing: Expression, message: impl Into<String>) -> Clause {
    Procedure::new(&ctx.settings().validate_procedure)
        .arg(failing)
        .arg(Expression::string(message))
        .arg(Expression::List(vec![Expression::int(0)]))
        .into()
}
