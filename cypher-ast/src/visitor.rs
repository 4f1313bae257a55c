//! Visitors for reading an abstract statement and rendering it into Cypher text.
//!
//! [`Visitor`] carries the tree walk; an implementor only decides how text, line breaks,
//! indentation and parameters are written.
mod cypher;

pub use cypher::Cypher;

use crate::{
    ast::*,
    error::{Error, Result},
};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

/// The parameter bag of a rendered statement, in binding order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parameters(IndexMap<String, GraphValue>);

impl Parameters {
    /// Binds `value` under `name`. Binding the same value twice is fine, a different value
    /// under an existing name is a defect in the statement builder.
    pub fn insert(&mut self, name: String, value: GraphValue) -> Result<()> {
        match self.0.get(&name) {
            Some(existing) if existing != &value => {
                debug_assert!(false, "parameter `{name}` bound to both {existing} and {value}");
                Err(Error::ParameterCollision { name })
            }
            Some(_) => Ok(()),
            None => {
                self.0.insert(name, value);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&GraphValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GraphValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> IndexMap<String, GraphValue> {
        self.0
    }
}

impl IntoIterator for Parameters {
    type Item = (String, GraphValue);
    type IntoIter = indexmap::map::IntoIter<String, GraphValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Quotes a name with backticks unless it is a plain identifier.
pub fn escape_name(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if plain {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Renders a string literal in double quotes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');

    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }

    out.push('"');
    out
}

/// A function travelling through the statement tree to build the Cypher text.
pub trait Visitor: Sized {
    /// Renders the statement, returning the text and the collected parameters.
    fn build<S>(statement: S) -> Result<(String, Parameters)>
    where
        S: Into<Statement>;

    /// Writes text to the current line.
    fn write<D: fmt::Display>(&mut self, s: D) -> Result<()>;

    /// Starts a new line at the current indentation.
    fn new_line(&mut self) -> Result<()>;

    fn indent(&mut self);

    fn outdent(&mut self);

    /// Collects a bound value.
    fn add_parameter(&mut self, name: String, value: GraphValue) -> Result<()>;

    fn visit_statement(&mut self, statement: Statement) -> Result<()> {
        for (i, clause) in statement.clauses.into_iter().enumerate() {
            if i > 0 {
                self.new_line()?;
            }

            self.visit_clause(clause)?;
        }

        Ok(())
    }

    fn visit_clause(&mut self, clause: Clause) -> Result<()> {
        match clause {
            Clause::Match(m) => self.visit_match(m),
            Clause::Create(c) => {
                self.write("CREATE ")?;
                self.visit_pattern(c.pattern)
            }
            Clause::Merge(m) => self.visit_merge(m),
            Clause::With(w) => self.visit_with(w),
            Clause::Set(s) => {
                if s.is_empty() {
                    return Err(Error::MalformedStatement("SET without any items".into()));
                }

                self.write("SET ")?;
                self.visit_set_items(s.items)
            }
            Clause::Delete(d) => {
                self.write(if d.detach { "DETACH DELETE " } else { "DELETE " })?;
                self.visit_comma_separated(d.items)
            }
            Clause::Call(c) => self.visit_call(c),
            Clause::Procedure(p) => self.visit_procedure(p),
            Clause::Unwind(u) => {
                self.write("UNWIND ")?;
                self.visit_expression(u.expression)?;
                self.write(format_args!(" AS {}", escape_name(u.alias.name())))
            }
            Clause::Return(r) => self.visit_return(r),
        }
    }

    fn visit_match(&mut self, m: Match) -> Result<()> {
        self.write(if m.optional { "OPTIONAL MATCH " } else { "MATCH " })?;

        for (i, pattern) in m.patterns.into_iter().enumerate() {
            if i > 0 {
                self.write(", ")?;
            }
            self.visit_pattern(pattern)?;
        }

        if let Some(condition) = m.condition {
            self.new_line()?;
            self.write("WHERE ")?;
            self.visit_expression(condition)?;
        }

        Ok(())
    }

    fn visit_merge(&mut self, m: Merge) -> Result<()> {
        self.write("MERGE ")?;
        self.visit_pattern(m.pattern)?;

        if !m.on_create.is_empty() {
            self.new_line()?;
            self.write("ON CREATE SET ")?;
            self.visit_set_items(m.on_create)?;
        }

        Ok(())
    }

    fn visit_set_items(&mut self, items: Vec<SetItem>) -> Result<()> {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.write(", ")?;
            }

            self.visit_expression(item.target)?;
            self.write(" = ")?;
            self.visit_expression(item.value)?;
        }

        Ok(())
    }

    fn visit_with(&mut self, w: With) -> Result<()> {
        self.write("WITH ")?;

        if w.distinct {
            self.write("DISTINCT ")?;
        }

        if w.star {
            self.write("*")?;

            if !w.items.is_empty() {
                self.write(", ")?;
            }
        } else if w.items.is_empty() {
            return Err(Error::MalformedStatement("WITH without any items".into()));
        }

        self.visit_projection_items(w.items)?;

        if let Some(condition) = w.condition {
            self.new_line()?;
            self.write("WHERE ")?;
            self.visit_expression(condition)?;
        }

        self.visit_paging(w.ordering, w.skip, w.limit)
    }

    fn visit_return(&mut self, r: Return) -> Result<()> {
        if r.items.is_empty() {
            return Err(Error::MalformedStatement("RETURN without any items".into()));
        }

        self.write("RETURN ")?;

        if r.distinct {
            self.write("DISTINCT ")?;
        }

        self.visit_projection_items(r.items)?;
        self.visit_paging(r.ordering, r.skip, r.limit)
    }

    fn visit_projection_items(&mut self, items: Vec<ProjectionItem>) -> Result<()> {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.write(", ")?;
            }

            self.visit_expression(item.expression)?;

            if let Some(alias) = item.alias {
                self.write(format_args!(" AS {}", escape_name(alias.name())))?;
            }
        }

        Ok(())
    }

    fn visit_paging(&mut self, ordering: Ordering, skip: Option<Expression>, limit: Option<Expression>) -> Result<()> {
        if !ordering.is_empty() {
            self.new_line()?;
            self.write("ORDER BY ")?;

            for (i, (expression, order)) in ordering.0.into_iter().enumerate() {
                if i > 0 {
                    self.write(", ")?;
                }

                self.visit_expression(expression)?;
                self.write(match order {
                    Order::Asc => " ASC",
                    Order::Desc => " DESC",
                })?;
            }
        }

        if let Some(skip) = skip {
            self.new_line()?;
            self.write("SKIP ")?;
            self.visit_expression(skip)?;
        }

        if let Some(limit) = limit {
            self.new_line()?;
            self.write("LIMIT ")?;
            self.visit_expression(limit)?;
        }

        Ok(())
    }

    fn visit_call(&mut self, call: Call) -> Result<()> {
        if call.branches.is_empty() {
            return Err(Error::MalformedStatement("CALL without a body".into()));
        }

        self.write("CALL {")?;
        self.indent();

        for (i, branch) in call.branches.into_iter().enumerate() {
            if i > 0 {
                self.new_line()?;
                self.write("UNION")?;
            }

            if call.import_all {
                self.new_line()?;
                self.write("WITH *")?;
            } else if !call.imports.is_empty() {
                self.new_line()?;
                let imports = call.imports.iter().map(|v| escape_name(v.name())).join(", ");
                self.write(format_args!("WITH {imports}"))?;
            }

            self.new_line()?;
            self.visit_statement(branch)?;
        }

        self.outdent();
        self.new_line()?;
        self.write("}")
    }

    fn visit_procedure(&mut self, p: Procedure) -> Result<()> {
        self.write(format_args!("CALL {}(", p.name))?;
        self.visit_comma_separated(p.args)?;
        self.write(")")?;

        if !p.yields.is_empty() {
            let yields = p
                .yields
                .iter()
                .map(|(field, alias)| match alias {
                    Some(alias) if alias.name() != field => format!("{field} AS {}", escape_name(alias.name())),
                    _ => field.clone(),
                })
                .join(", ");

            self.write(format_args!(" YIELD {yields}"))?;
        }

        Ok(())
    }

    fn visit_pattern(&mut self, pattern: Pattern) -> Result<()> {
        self.visit_node_pattern(pattern.start)?;

        for (relationship, node) in pattern.hops {
            self.visit_relationship_pattern(relationship)?;
            self.visit_node_pattern(node)?;
        }

        Ok(())
    }

    fn visit_node_pattern(&mut self, node: NodePattern) -> Result<()> {
        self.write("(")?;

        if let Some(var) = &node.variable {
            self.write(escape_name(var.name()))?;
        }

        if !node.labels.is_empty() {
            let separator = match node.label_mode {
                LabelMode::All => ":",
                LabelMode::Any => "|",
            };

            let labels = node.labels.iter().map(|l| escape_name(l)).join(separator);
            self.write(format_args!(":{labels}"))?;
        }

        if !node.properties.is_empty() {
            self.write(" ")?;
            self.visit_map(node.properties)?;
        }

        self.write(")")
    }

    fn visit_relationship_pattern(&mut self, rel: RelationshipPattern) -> Result<()> {
        self.write(match rel.direction {
            Direction::Incoming => "<-[",
            Direction::Outgoing | Direction::Undirected => "-[",
        })?;

        if let Some(var) = &rel.variable {
            self.write(escape_name(var.name()))?;
        }

        if !rel.types.is_empty() {
            let types = rel.types.iter().map(|t| escape_name(t)).join("|");
            self.write(format_args!(":{types}"))?;
        }

        if !rel.properties.is_empty() {
            self.write(" ")?;
            self.visit_map(rel.properties)?;
        }

        self.write(match rel.direction {
            Direction::Outgoing => "]->",
            Direction::Incoming | Direction::Undirected => "]-",
        })
    }

    fn visit_map(&mut self, entries: Vec<(String, Expression)>) -> Result<()> {
        if entries.is_empty() {
            return self.write("{}");
        }

        self.write("{ ")?;

        for (i, (key, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                self.write(", ")?;
            }

            self.write(format_args!("{}: ", escape_name(&key)))?;
            self.visit_expression(value)?;
        }

        self.write(" }")
    }

    fn visit_comma_separated(&mut self, expressions: Vec<Expression>) -> Result<()> {
        for (i, expression) in expressions.into_iter().enumerate() {
            if i > 0 {
                self.write(", ")?;
            }
            self.visit_expression(expression)?;
        }

        Ok(())
    }

    fn visit_pattern_query(&mut self, keyword: &str, query: PatternQuery) -> Result<()> {
        self.write(format_args!("{keyword} {{ MATCH "))?;
        self.visit_pattern(query.pattern)?;

        if let Some(condition) = query.condition {
            self.write(" WHERE ")?;
            self.visit_expression(condition)?;
        }

        self.write(" }")
    }

    /// Visits an operand of a conjunction or disjunction, parenthesizing nested junctions.
    fn visit_junction_operand(&mut self, expression: Expression) -> Result<()> {
        if expression.is_junction() {
            self.write("(")?;
            self.visit_expression(expression)?;
            self.write(")")
        } else {
            self.visit_expression(expression)
        }
    }

    fn visit_expression(&mut self, expression: Expression) -> Result<()> {
        match expression {
            Expression::Variable(var) => self.write(escape_name(var.name())),
            Expression::Property(owner, key) => {
                self.visit_expression(*owner)?;
                self.write(format_args!(".{}", escape_name(&key)))
            }
            Expression::Parameter(p) => {
                let (name, value) = p.into_parts();
                self.write(format_args!("${name}"))?;
                self.add_parameter(name, value)
            }
            Expression::Literal(lit) => match lit {
                Literal::Null => self.write("NULL"),
                Literal::Boolean(b) => self.write(b),
                Literal::Int(i) => self.write(i),
                Literal::String(s) => self.write(quote_string(&s)),
            },
            Expression::Star => self.write("*"),
            Expression::Compare(left, op, right) => {
                self.visit_expression(*left)?;
                self.write(format_args!(" {op} "))?;
                self.visit_expression(*right)
            }
            Expression::IsNull(e) => {
                self.visit_expression(*e)?;
                self.write(" IS NULL")
            }
            Expression::IsNotNull(e) => {
                self.visit_expression(*e)?;
                self.write(" IS NOT NULL")
            }
            Expression::And(parts) | Expression::Or(parts) if parts.is_empty() => {
                Err(Error::MalformedStatement("empty conjunction".into()))
            }
            Expression::And(parts) => {
                for (i, part) in parts.into_iter().enumerate() {
                    if i > 0 {
                        self.write(" AND ")?;
                    }
                    self.visit_junction_operand(part)?;
                }
                Ok(())
            }
            Expression::Or(parts) => {
                for (i, part) in parts.into_iter().enumerate() {
                    if i > 0 {
                        self.write(" OR ")?;
                    }
                    self.visit_junction_operand(part)?;
                }
                Ok(())
            }
            Expression::Not(inner) => {
                self.write("NOT (")?;
                self.visit_expression(*inner)?;
                self.write(")")
            }
            Expression::HasLabels(var, labels) => {
                let labels = labels.iter().map(|l| escape_name(l)).join(":");
                self.write(format_args!("{}:{labels}", escape_name(var.name())))
            }
            Expression::Exists(query) => self.visit_pattern_query("EXISTS", *query),
            Expression::Count(query) => self.visit_pattern_query("COUNT", *query),
            Expression::Function(f) => {
                self.write(format_args!("{}(", f.name))?;

                if f.distinct {
                    self.write("DISTINCT ")?;
                }

                self.visit_comma_separated(f.args)?;
                self.write(")")
            }
            Expression::Map(entries) => self.visit_map(entries),
            Expression::MapProjection(var, items) => {
                self.write(format_args!("{} ", escape_name(var.name())))?;

                if items.is_empty() {
                    return self.write("{}");
                }

                self.write("{ ")?;

                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        self.write(", ")?;
                    }

                    match item {
                        MapItem::Property(key) => self.write(format_args!(".{}", escape_name(&key)))?,
                        MapItem::Entry(key, value) => {
                            self.write(format_args!("{}: ", escape_name(&key)))?;
                            self.visit_expression(value)?;
                        }
                    }
                }

                self.write(" }")
            }
            Expression::List(items) => {
                self.write("[")?;
                self.visit_comma_separated(items)?;
                self.write("]")
            }
            Expression::Arithmetic(left, op, right) => {
                for (i, operand) in [*left, *right].into_iter().enumerate() {
                    if i > 0 {
                        self.write(format_args!(" {op} "))?;
                    }

                    if matches!(operand, Expression::Arithmetic(..)) {
                        self.write("(")?;
                        self.visit_expression(operand)?;
                        self.write(")")?;
                    } else {
                        self.visit_expression(operand)?;
                    }
                }
                Ok(())
            }
            Expression::Index(list, index) => {
                self.visit_expression(*list)?;
                self.write("[")?;
                self.visit_expression(*index)?;
                self.write("]")
            }
            Expression::Slice(list, from, to) => {
                self.visit_expression(*list)?;
                self.write("[")?;
                if let Some(from) = from {
                    self.visit_expression(*from)?;
                }
                self.write("..")?;
                if let Some(to) = to {
                    self.visit_expression(*to)?;
                }
                self.write("]")
            }
            Expression::Quantifier {
                kind,
                variable,
                list,
                predicate,
            } => {
                let name = match kind {
                    QuantifierKind::Any => "any",
                    QuantifierKind::All => "all",
                    QuantifierKind::None => "none",
                    QuantifierKind::Single => "single",
                };

                self.write(format_args!("{name}({} IN ", escape_name(variable.name())))?;
                self.visit_expression(*list)?;
                self.write(" WHERE ")?;
                self.visit_expression(*predicate)?;
                self.write(")")
            }
        }
    }
}
