use super::{GraphValue, PatternQuery};
use std::fmt;

/// A variable bound in the statement, e.g. `this` or `this0_actors_connect0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// A new variable named after this one, e.g. `this0_node` for `this0`.
    pub fn suffixed(&self, suffix: &str) -> Variable {
        Variable(format!("{}_{}", self.0, suffix))
    }

    /// Property access, `this.title`.
    pub fn property(&self, key: impl Into<String>) -> Expression {
        Expression::Property(Box::new(Expression::Variable(self.clone())), key.into())
    }

    /// Map projection, `this { .title, actors: var2 }`.
    pub fn project(self, items: impl IntoIterator<Item = MapItem>) -> Expression {
        Expression::MapProjection(self, items.into_iter().collect())
    }

    /// Label predicate, `this:Movie`.
    pub fn has_labels<I, S>(&self, labels: I) -> Expression
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expression::HasLabels(self.clone(), labels.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&Variable> for Expression {
    fn from(var: &Variable) -> Self {
        Expression::Variable(var.clone())
    }
}

impl From<Variable> for Expression {
    fn from(var: Variable) -> Self {
        Expression::Variable(var)
    }
}

/// A named statement parameter. The value travels with the AST and is collected by the
/// visitor, so binding rules live in exactly one place.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: GraphValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<GraphValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &GraphValue {
        &self.value
    }

    pub(crate) fn into_parts(self) -> (String, GraphValue) {
        (self.name, self.value)
    }
}

impl From<Parameter> for Expression {
    fn from(p: Parameter) -> Self {
        Expression::Parameter(p)
    }
}

/// Constants that are part of the statement shape itself, never user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Int(i64),
    String(String),
}

impl From<Literal> for Expression {
    fn from(lit: Literal) -> Self {
        Expression::Literal(lit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    In,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "<>",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEquals => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEquals => ">=",
            CompareOp::Contains => "CONTAINS",
            CompareOp::StartsWith => "STARTS WITH",
            CompareOp::EndsWith => "ENDS WITH",
            CompareOp::Matches => "=~",
            CompareOp::In => "IN",
        };

        f.write_str(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        };

        f.write_str(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Any,
    All,
    None,
    Single,
}

/// One entry of a map projection.
#[derive(Debug, Clone, PartialEq)]
pub enum MapItem {
    /// `.title`
    Property(String),
    /// `actors: var2`
    Entry(String, Expression),
}

impl MapItem {
    pub fn property(key: impl Into<String>) -> Self {
        MapItem::Property(key.into())
    }

    pub fn entry(key: impl Into<String>, value: impl Into<Expression>) -> Self {
        MapItem::Entry(key.into(), value.into())
    }
}

/// A function invocation, `collect(DISTINCT this0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub(crate) name: String,
    pub(crate) args: Vec<Expression>,
    pub(crate) distinct: bool,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            distinct: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<Expression>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

impl From<Function> for Expression {
    fn from(f: Function) -> Self {
        Expression::Function(f)
    }
}

pub fn collect(expr: impl Into<Expression>) -> Expression {
    Function::new("collect").arg(expr).into()
}

pub fn collect_distinct(expr: impl Into<Expression>) -> Expression {
    Function::new("collect").arg(expr).distinct().into()
}

pub fn count(expr: impl Into<Expression>) -> Expression {
    Function::new("count").arg(expr).into()
}

pub fn count_distinct(expr: impl Into<Expression>) -> Expression {
    Function::new("count").arg(expr).distinct().into()
}

pub fn count_star() -> Expression {
    Function::new("count").arg(Expression::Star).into()
}

pub fn head(expr: impl Into<Expression>) -> Expression {
    Function::new("head").arg(expr).into()
}

pub fn last(expr: impl Into<Expression>) -> Expression {
    Function::new("last").arg(expr).into()
}

pub fn size(expr: impl Into<Expression>) -> Expression {
    Function::new("size").arg(expr).into()
}

/// A Cypher expression. Boolean conditions are expressions too.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Variable(Variable),
    Property(Box<Expression>, String),
    Parameter(Parameter),
    Literal(Literal),
    /// `*`, only valid as a function argument such as `count(*)`.
    Star,
    Compare(Box<Expression>, CompareOp, Box<Expression>),
    IsNull(Box<Expression>),
    IsNotNull(Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
    HasLabels(Variable, Vec<String>),
    /// `EXISTS { MATCH … WHERE … }`
    Exists(Box<PatternQuery>),
    /// `COUNT { MATCH … WHERE … }`
    Count(Box<PatternQuery>),
    Function(Function),
    Map(Vec<(String, Expression)>),
    MapProjection(Variable, Vec<MapItem>),
    List(Vec<Expression>),
    Arithmetic(Box<Expression>, ArithmeticOp, Box<Expression>),
    Index(Box<Expression>, Box<Expression>),
    Slice(Box<Expression>, Option<Box<Expression>>, Option<Box<Expression>>),
    /// `any(x IN list WHERE predicate)` and friends.
    Quantifier {
        kind: QuantifierKind,
        variable: Variable,
        list: Box<Expression>,
        predicate: Box<Expression>,
    },
}

impl Expression {
    pub fn string(s: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(s.into()))
    }

    pub fn int(i: i64) -> Self {
        Expression::Literal(Literal::Int(i))
    }

    pub fn boolean(b: bool) -> Self {
        Expression::Literal(Literal::Boolean(b))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Expression)>,
        K: Into<String>,
    {
        Expression::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn property(self, key: impl Into<String>) -> Self {
        Expression::Property(Box::new(self), key.into())
    }

    pub fn exists(query: PatternQuery) -> Self {
        Expression::Exists(Box::new(query))
    }

    pub fn count_of(query: PatternQuery) -> Self {
        Expression::Count(Box::new(query))
    }

    pub fn index(self, index: impl Into<Expression>) -> Self {
        Expression::Index(Box::new(self), Box::new(index.into()))
    }

    pub fn slice(self, from: Option<Expression>, to: Option<Expression>) -> Self {
        Expression::Slice(Box::new(self), from.map(Box::new), to.map(Box::new))
    }

    pub fn arithmetic(self, op: ArithmeticOp, rhs: impl Into<Expression>) -> Self {
        Expression::Arithmetic(Box::new(self), op, Box::new(rhs.into()))
    }

    pub fn quantifier(kind: QuantifierKind, variable: Variable, list: impl Into<Expression>, predicate: Expression) -> Self {
        Expression::Quantifier {
            kind,
            variable,
            list: Box::new(list.into()),
            predicate: Box::new(predicate),
        }
    }

    pub fn and(self, other: impl Into<Expression>) -> Self {
        Expression::conjunction([self, other.into()]).unwrap_or_else(|| Expression::boolean(true))
    }

    pub fn or(self, other: impl Into<Expression>) -> Self {
        Expression::disjunction([self, other.into()]).unwrap_or_else(|| Expression::boolean(false))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expression::Not(Box::new(self))
    }

    /// Joins conditions with `AND`. Empty input has no condition, a single input is
    /// returned as-is and nested conjunctions are flattened.
    pub fn conjunction(parts: impl IntoIterator<Item = Expression>) -> Option<Expression> {
        Self::junction(parts, true)
    }

    /// Joins conditions with `OR`, with the same collapsing rules as [`Expression::conjunction`].
    pub fn disjunction(parts: impl IntoIterator<Item = Expression>) -> Option<Expression> {
        Self::junction(parts, false)
    }

    fn junction(parts: impl IntoIterator<Item = Expression>, is_and: bool) -> Option<Expression> {
        let mut flattened = Vec::new();

        for part in parts {
            match part {
                Expression::And(inner) if is_and => flattened.extend(inner),
                Expression::Or(inner) if !is_and => flattened.extend(inner),
                other => flattened.push(other),
            }
        }

        match flattened.len() {
            0 => None,
            1 => flattened.pop(),
            _ if is_and => Some(Expression::And(flattened)),
            _ => Some(Expression::Or(flattened)),
        }
    }

    pub fn is_junction(&self) -> bool {
        matches!(self, Expression::And(parts) | Expression::Or(parts) if parts.len() > 1)
    }
}

/// Comparison builders for anything that converts into an expression.
pub trait Comparable: Into<Expression> {
    fn compare(self, op: CompareOp, rhs: impl Into<Expression>) -> Expression {
        Expression::Compare(Box::new(self.into()), op, Box::new(rhs.into()))
    }

    fn equals(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::Equals, rhs)
    }

    fn not_equals(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::NotEquals, rhs)
    }

    fn less_than(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::LessThan, rhs)
    }

    fn less_than_or_equals(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::LessThanOrEquals, rhs)
    }

    fn greater_than(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::GreaterThan, rhs)
    }

    fn greater_than_or_equals(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::GreaterThanOrEquals, rhs)
    }

    fn contains(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::Contains, rhs)
    }

    fn starts_with(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::StartsWith, rhs)
    }

    fn ends_with(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::EndsWith, rhs)
    }

    fn matches(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::Matches, rhs)
    }

    fn is_in(self, rhs: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::In, rhs)
    }

    fn is_null(self) -> Expression {
        Expression::IsNull(Box::new(self.into()))
    }

    fn is_not_null(self) -> Expression {
        Expression::IsNotNull(Box::new(self.into()))
    }
}

impl<T> Comparable for T where T: Into<Expression> {}
