use crate::ast::{Expression, OrderDefinition, Ordering, Pattern, Statement, Variable};

/// A single clause of a statement. Each clause renders on its own line, subquery bodies
/// indented below their `CALL {`.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(Match),
    Create(Create),
    Merge(Merge),
    With(With),
    Set(Set),
    Delete(Delete),
    Call(Call),
    Procedure(Procedure),
    Unwind(Unwind),
    Return(Return),
}

macro_rules! clause_from {
    ($($kind:ident),*) => {
        $(
            impl From<$kind> for Clause {
                fn from(clause: $kind) -> Self {
                    Clause::$kind(clause)
                }
            }
        )*
    };
}

clause_from!(Match, Create, Merge, With, Set, Delete, Call, Procedure, Unwind, Return);

/// An expression with an optional `AS` alias, as used by `WITH` and `RETURN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub(crate) expression: Expression,
    pub(crate) alias: Option<Variable>,
}

impl ProjectionItem {
    pub fn new(expression: impl Into<Expression>, alias: Option<Variable>) -> Self {
        Self {
            expression: expression.into(),
            alias,
        }
    }
}

/// `MATCH` or `OPTIONAL MATCH`, with its `WHERE`.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub(crate) optional: bool,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) condition: Option<Expression>,
}

impl Match {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            optional: false,
            patterns: vec![pattern.into()],
            condition: None,
        }
    }

    pub fn optional(pattern: impl Into<Pattern>) -> Self {
        Self {
            optional: true,
            ..Self::new(pattern)
        }
    }

    /// Adds a comma separated pattern, `MATCH (a), (b)`.
    pub fn pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Adds a condition, `AND`ed after any existing one.
    pub fn so_that(self, condition: Expression) -> Self {
        self.so_that_opt(Some(condition))
    }

    pub fn so_that_opt(mut self, condition: Option<Expression>) -> Self {
        self.condition = Expression::conjunction(self.condition.take().into_iter().chain(condition));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Create {
    pub(crate) pattern: Pattern,
}

impl Create {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

/// `target = value`
#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub(crate) target: Expression,
    pub(crate) value: Expression,
}

impl SetItem {
    pub fn new(target: Expression, value: impl Into<Expression>) -> Self {
        Self {
            target,
            value: value.into(),
        }
    }
}

/// `MERGE`, optionally followed by `ON CREATE SET`.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub(crate) pattern: Pattern,
    pub(crate) on_create: Vec<SetItem>,
}

impl Merge {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            pattern: pattern.into(),
            on_create: Vec::new(),
        }
    }

    pub fn on_create(mut self, items: impl IntoIterator<Item = SetItem>) -> Self {
        self.on_create.extend(items);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Set {
    pub(crate) items: Vec<SetItem>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, target: Expression, value: impl Into<Expression>) -> Self {
        self.items.push(SetItem::new(target, value));
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = SetItem>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub(crate) detach: bool,
    pub(crate) items: Vec<Expression>,
}

impl Delete {
    pub fn new(item: impl Into<Expression>) -> Self {
        Self {
            detach: false,
            items: vec![item.into()],
        }
    }

    pub fn detach(item: impl Into<Expression>) -> Self {
        Self {
            detach: true,
            items: vec![item.into()],
        }
    }
}

/// `WITH`, including its optional `WHERE`, `ORDER BY`, `SKIP` and `LIMIT`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct With {
    pub(crate) star: bool,
    pub(crate) distinct: bool,
    pub(crate) items: Vec<ProjectionItem>,
    pub(crate) condition: Option<Expression>,
    pub(crate) ordering: Ordering,
    pub(crate) skip: Option<Expression>,
    pub(crate) limit: Option<Expression>,
}

impl With {
    pub fn new() -> Self {
        Self::default()
    }

    /// `WITH *`
    pub fn star() -> Self {
        Self {
            star: true,
            ..Default::default()
        }
    }

    pub fn variables<'a>(vars: impl IntoIterator<Item = &'a Variable>) -> Self {
        vars.into_iter().fold(Self::new(), |with, var| with.item(var, None))
    }

    pub fn item(mut self, expression: impl Into<Expression>, alias: Option<Variable>) -> Self {
        self.items.push(ProjectionItem::new(expression, alias));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn so_that(mut self, condition: Expression) -> Self {
        self.condition = Expression::conjunction(self.condition.take().into_iter().chain(Some(condition)));
        self
    }

    pub fn order_by(mut self, value: OrderDefinition) -> Self {
        self.ordering = self.ordering.append(value);
        self
    }

    pub fn skip(mut self, skip: impl Into<Expression>) -> Self {
        self.skip = Some(skip.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Expression>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

/// A `CALL { … }` subquery. Each branch gets the import `WITH` on its first line; several
/// branches are joined with `UNION`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub(crate) import_all: bool,
    pub(crate) imports: Vec<Variable>,
    pub(crate) branches: Vec<Statement>,
}

impl Call {
    pub fn new(body: Statement) -> Self {
        Self {
            import_all: false,
            imports: Vec::new(),
            branches: vec![body],
        }
    }

    pub fn union(branches: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            import_all: false,
            imports: Vec::new(),
            branches: branches.into_iter().collect(),
        }
    }

    pub fn import(mut self, var: &Variable) -> Self {
        if !self.imports.contains(var) {
            self.imports.push(var.clone());
        }
        self
    }

    /// `WITH *` as the import.
    pub fn import_all(mut self) -> Self {
        self.import_all = true;
        self
    }
}

/// A procedure call, `CALL db.index.fulltext.queryNodes(…) YIELD node AS this, score`.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub(crate) name: String,
    pub(crate) args: Vec<Expression>,
    pub(crate) yields: Vec<(String, Option<Variable>)>,
}

impl Procedure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            yields: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<Expression>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn yields(mut self, field: impl Into<String>, alias: Option<Variable>) -> Self {
        self.yields.push((field.into(), alias));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unwind {
    pub(crate) expression: Expression,
    pub(crate) alias: Variable,
}

impl Unwind {
    pub fn new(expression: impl Into<Expression>, alias: Variable) -> Self {
        Self {
            expression: expression.into(),
            alias,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Return {
    pub(crate) distinct: bool,
    pub(crate) items: Vec<ProjectionItem>,
    pub(crate) ordering: Ordering,
    pub(crate) skip: Option<Expression>,
    pub(crate) limit: Option<Expression>,
}

impl Return {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, expression: impl Into<Expression>, alias: Option<Variable>) -> Self {
        self.items.push(ProjectionItem::new(expression, alias));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn order_by(mut self, value: OrderDefinition) -> Self {
        self.ordering = self.ordering.append(value);
        self
    }

    pub fn skip(mut self, skip: impl Into<Expression>) -> Self {
        self.skip = Some(skip.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Expression>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}
