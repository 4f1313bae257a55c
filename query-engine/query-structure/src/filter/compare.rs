use super::*;
use crate::{FieldRef, TypeRef};

/// Comparing methods for scalar fields.
pub trait ScalarCompare {
    fn equals<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>;

    fn not_equals<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        Filter::not(self.equals(val))
    }

    fn is_in<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>;

    fn contains<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>;

    fn starts_with<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>;

    fn ends_with<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>;

    fn less_than<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>;

    fn greater_than<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>;

    fn is_null(&self) -> Filter;
}

/// Comparison methods for relational fields.
pub trait RelationCompare {
    fn to_one_related(&self, target: &TypeRef, filter: Filter) -> Filter;

    fn at_least_one_related(&self, target: &TypeRef, filter: Filter) -> Filter;

    fn every_related(&self, target: &TypeRef, filter: Filter) -> Filter;

    fn no_related(&self, target: &TypeRef, filter: Filter) -> Filter;

    /// The singular relationship is not set at all.
    fn one_relation_is_null(&self, target: &TypeRef) -> Filter;
}

fn scalar(field: &FieldRef, condition: ScalarCondition) -> Filter {
    Filter::Scalar(ScalarFilter::new(field.clone(), condition))
}

impl ScalarCompare for FieldRef {
    fn equals<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        scalar(self, ScalarCondition::Equals(val.into()))
    }

    fn is_in<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        scalar(self, ScalarCondition::In(val.into()))
    }

    fn contains<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        scalar(self, ScalarCondition::Contains(val.into()))
    }

    fn starts_with<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        scalar(self, ScalarCondition::StartsWith(val.into()))
    }

    fn ends_with<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        scalar(self, ScalarCondition::EndsWith(val.into()))
    }

    fn less_than<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        scalar(self, ScalarCondition::LessThan(val.into()))
    }

    fn greater_than<T>(&self, val: T) -> Filter
    where
        T: Into<ConditionValue>,
    {
        scalar(self, ScalarCondition::GreaterThan(val.into()))
    }

    fn is_null(&self) -> Filter {
        scalar(self, ScalarCondition::IsNull)
    }
}

fn related(field: &FieldRef, target: &TypeRef, quantifier: RelationQuantifier, filter: Option<Filter>) -> Filter {
    let relation = RelationFilter::new(field.clone(), target.clone(), quantifier);

    match filter {
        Some(filter) => relation.with_node(filter).into(),
        None => relation.into(),
    }
}

impl RelationCompare for FieldRef {
    fn to_one_related(&self, target: &TypeRef, filter: Filter) -> Filter {
        related(self, target, RelationQuantifier::ToOne, Some(filter))
    }

    fn at_least_one_related(&self, target: &TypeRef, filter: Filter) -> Filter {
        related(self, target, RelationQuantifier::Some, Some(filter))
    }

    fn every_related(&self, target: &TypeRef, filter: Filter) -> Filter {
        related(self, target, RelationQuantifier::All, Some(filter))
    }

    fn no_related(&self, target: &TypeRef, filter: Filter) -> Filter {
        related(self, target, RelationQuantifier::None, Some(filter))
    }

    fn one_relation_is_null(&self, target: &TypeRef) -> Filter {
        Filter::not(related(self, target, RelationQuantifier::ToOne, None))
    }
}
