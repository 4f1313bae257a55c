use crate::ast::Expression;

/// Defines ordering for an `ORDER BY` clause.
pub type OrderDefinition = (Expression, Order);

/// A list of definitions for the `ORDER BY` clause.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Ordering(pub Vec<OrderDefinition>);

impl Ordering {
    pub fn new(values: Vec<OrderDefinition>) -> Self {
        Self(values)
    }

    #[doc(hidden)]
    pub fn append(mut self, value: OrderDefinition) -> Self {
        self.0.push(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The ordering direction
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Order {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

/// An item that can be used in the `ORDER BY` clause
pub trait Orderable
where
    Self: Sized,
{
    /// Order by `self` in the given order
    fn order(self, order: Order) -> OrderDefinition;

    /// Change the order to `ASC`
    fn ascend(self) -> OrderDefinition {
        self.order(Order::Asc)
    }

    /// Change the order to `DESC`
    fn descend(self) -> OrderDefinition {
        self.order(Order::Desc)
    }
}

impl<T> Orderable for T
where
    T: Into<Expression>,
{
    fn order(self, order: Order) -> OrderDefinition {
        (self.into(), order)
    }
}
