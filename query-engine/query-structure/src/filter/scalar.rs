use crate::FieldRef;
use graph_value::GraphValue;

/// A leaf value: either a literal or a reference to a caller claim (`sub`, `org.id`).
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    Value(GraphValue),
    Claim(String),
}

impl ConditionValue {
    pub fn is_claim(&self) -> bool {
        matches!(self, ConditionValue::Claim(_))
    }

    pub fn as_value(&self) -> Option<&GraphValue> {
        match self {
            ConditionValue::Value(v) => Some(v),
            ConditionValue::Claim(_) => None,
        }
    }
}

impl<T> From<T> for ConditionValue
where
    T: Into<GraphValue>,
{
    fn from(value: T) -> Self {
        ConditionValue::Value(value.into())
    }
}

/// Conditions on a single scalar property. Negated operators do not exist here, they are
/// expressed as [`Filter::Not`](super::Filter::Not) around the positive condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarCondition {
    Equals(ConditionValue),
    Contains(ConditionValue),
    StartsWith(ConditionValue),
    EndsWith(ConditionValue),
    Matches(ConditionValue),
    LessThan(ConditionValue),
    LessThanOrEquals(ConditionValue),
    GreaterThan(ConditionValue),
    GreaterThanOrEquals(ConditionValue),
    /// The property value is one of the given list.
    In(ConditionValue),
    /// The list property contains the given element.
    IncludesElement(ConditionValue),
    IsNull,
}

impl ScalarCondition {
    pub fn value(&self) -> Option<&ConditionValue> {
        match self {
            ScalarCondition::Equals(v)
            | ScalarCondition::Contains(v)
            | ScalarCondition::StartsWith(v)
            | ScalarCondition::EndsWith(v)
            | ScalarCondition::Matches(v)
            | ScalarCondition::LessThan(v)
            | ScalarCondition::LessThanOrEquals(v)
            | ScalarCondition::GreaterThan(v)
            | ScalarCondition::GreaterThanOrEquals(v)
            | ScalarCondition::In(v)
            | ScalarCondition::IncludesElement(v) => Some(v),
            ScalarCondition::IsNull => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFilter {
    pub field: FieldRef,
    pub condition: ScalarCondition,
}

impl ScalarFilter {
    pub fn new(field: FieldRef, condition: ScalarCondition) -> Self {
        Self { field, condition }
    }
}
