use crate::ast::{Expression, Variable};

/// How a node pattern's labels are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// `(n:A:B)`, the node carries every label.
    #[default]
    All,
    /// `(n:A|B)`, the node carries any one of the labels.
    Any,
}

/// `(this0:Movie { title: $this0_title })`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub(crate) variable: Option<Variable>,
    pub(crate) labels: Vec<String>,
    pub(crate) label_mode: LabelMode,
    pub(crate) properties: Vec<(String, Expression)>,
}

impl NodePattern {
    pub fn new(variable: Variable) -> Self {
        Self {
            variable: Some(variable),
            ..Default::default()
        }
    }

    /// A node pattern without a variable, `(:User)`.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn any_label(mut self) -> Self {
        self.label_mode = LabelMode::Any;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn variable(&self) -> Option<&Variable> {
        self.variable.as_ref()
    }
}

impl From<Variable> for NodePattern {
    fn from(variable: Variable) -> Self {
        NodePattern::new(variable)
    }
}

impl From<&Variable> for NodePattern {
    fn from(variable: &Variable) -> Self {
        NodePattern::new(variable.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `-[]->`
    Outgoing,
    /// `<-[]-`
    Incoming,
    /// `-[]-`
    Undirected,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Undirected => Direction::Undirected,
        }
    }
}

/// `-[this0:ACTED_IN]->`
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub(crate) variable: Option<Variable>,
    pub(crate) types: Vec<String>,
    pub(crate) direction: Direction,
    pub(crate) properties: Vec<(String, Expression)>,
}

impl RelationshipPattern {
    pub fn new(direction: Direction) -> Self {
        Self {
            variable: None,
            types: Vec::new(),
            direction,
            properties: Vec::new(),
        }
    }

    pub fn variable(mut self, variable: Variable) -> Self {
        self.variable = Some(variable);
        self
    }

    pub fn rel_type(mut self, rel_type: impl Into<String>) -> Self {
        self.types.push(rel_type.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }
}

/// A path pattern: a start node followed by any number of hops.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub(crate) start: NodePattern,
    pub(crate) hops: Vec<(RelationshipPattern, NodePattern)>,
}

impl Pattern {
    pub fn new(start: impl Into<NodePattern>) -> Self {
        Self {
            start: start.into(),
            hops: Vec::new(),
        }
    }

    pub fn related(mut self, relationship: RelationshipPattern, node: impl Into<NodePattern>) -> Self {
        self.hops.push((relationship, node.into()));
        self
    }
}

impl From<NodePattern> for Pattern {
    fn from(node: NodePattern) -> Self {
        Pattern::new(node)
    }
}

impl From<Variable> for Pattern {
    fn from(variable: Variable) -> Self {
        Pattern::new(variable)
    }
}

/// A pattern with an optional condition, the body of `EXISTS { … }` and `COUNT { … }`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternQuery {
    pub(crate) pattern: Pattern,
    pub(crate) condition: Option<Expression>,
}

impl PatternQuery {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        Self {
            pattern: pattern.into(),
            condition: None,
        }
    }

    pub fn so_that(self, condition: Expression) -> Self {
        self.so_that_opt(Some(condition))
    }

    pub fn so_that_opt(mut self, condition: Option<Expression>) -> Self {
        self.condition = Expression::conjunction(self.condition.take().into_iter().chain(condition));
        self
    }
}
