use crate::ast::Clause;

/// An ordered list of clauses. Used both for complete statements and for the fragments
/// translators build bottom-up and splice into each other.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub(crate) clauses: Vec<Clause>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clause(mut self, clause: impl Into<Clause>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    pub fn push(&mut self, clause: impl Into<Clause>) {
        self.clauses.push(clause.into());
    }

    /// Appends every clause of `other`, keeping their order.
    pub fn append(&mut self, other: Statement) {
        self.clauses.extend(other.clauses);
    }

    pub fn then(mut self, other: Statement) -> Self {
        self.append(other);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn last(&self) -> Option<&Clause> {
        self.clauses.last()
    }
}

impl From<Clause> for Statement {
    fn from(clause: Clause) -> Self {
        Statement { clauses: vec![clause] }
    }
}

impl Extend<Clause> for Statement {
    fn extend<T: IntoIterator<Item = Clause>>(&mut self, iter: T) {
        self.clauses.extend(iter);
    }
}

impl FromIterator<Clause> for Statement {
    fn from_iter<T: IntoIterator<Item = Clause>>(iter: T) -> Self {
        Statement {
            clauses: iter.into_iter().collect(),
        }
    }
}
