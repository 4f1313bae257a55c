use crate::{BuildError, BuildResult, Context, projection::read_condition};
use cypher_ast::ast::*;
use query_structure::{Filter, FulltextSearch, prelude::ObjectSelection};

const QUERY_NODES: &str = "db.index.fulltext.queryNodes";

/// The relevance score yielded next to every matched node.
pub(super) fn score() -> Variable {
    Variable::new("score")
}

/// `CALL db.index.fulltext.queryNodes("Index", $phrase) YIELD node AS this, score` followed
/// by the label check, read rules and filters on the yielded node.
pub(super) fn search(
    ctx: &Context<'_>,
    selection: &ObjectSelection,
    search: &FulltextSearch,
    node: &Variable,
    filter: Option<&Filter>,
) -> BuildResult<Statement> {
    let type_ref = &selection.type_ref;

    let index = type_ref.fulltext_index(&search.index).ok_or_else(|| {
        BuildError::query_shape(
            format!("fulltext.{}", search.index),
            format!("`{}` has no full-text index of that name", type_ref.name),
        )
    })?;

    let phrase = Parameter::new(ctx.parameter_name(&format!("{node}_fulltext_phrase")), search.phrase.clone());

    let procedure = Procedure::new(QUERY_NODES)
        .arg(Expression::string(&index.name))
        .arg(phrase)
        .yields("node", Some(node.clone()))
        .yields("score", None);

    let labels = node.has_labels(&type_ref.labels);
    let condition = Expression::conjunction(Some(labels).into_iter().chain(read_condition(ctx, selection, node, filter)?));

    let mut with = With::star();

    if let Some(condition) = condition {
        with = with.so_that(condition);
    }

    Ok(Statement::new().clause(procedure).clause(with))
}
