use crate::{HandlerError, Result};
use graph_value::{GraphObjectValue, GraphValue};
use graphql_parser::query::{
    Definition, Directive, Document, FragmentDefinition, OperationDefinition, Selection as GqlSelection,
    SelectionSet, Type, TypeCondition, Value, VariableDefinition,
};
use indexmap::IndexMap;
use query_core::{Operation, Selection};
use std::collections::HashMap;

/// Protocol adapter for GraphQL -> operations.
///
/// GraphQL is mapped as following:
/// - Every root field of a `query { ... }` or single selection block `{ ... }` is mapped to an `Operation::Read`.
/// - Every root field of a `mutation { ... }` is mapped to an `Operation::Write`.
/// - If the payload names an operation only that operation is converted. Without a name the
///   document must define exactly one.
/// - Fragment spreads and inline fragments are inlined. Their fields carry the fragment's type
///   condition.
/// - Variables are substituted. Absent nullable variables drop the argument they are used in.
/// - `@skip` and `@include` are evaluated.
///
/// Currently unsupported features:
/// - Subscription queries.
/// - Any other directive.
pub struct GraphQLProtocolAdapter<'a> {
    fragments: HashMap<String, FragmentDefinition<'a, String>>,
    /// `None` for declared variables without a value or default.
    variables: IndexMap<String, Option<GraphValue>>,
}

impl<'a> GraphQLProtocolAdapter<'a> {
    pub fn convert(
        gql_doc: Document<'a, String>,
        operation_name: Option<&str>,
        variables: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<Operation>> {
        let mut fragments = HashMap::new();
        let mut operations = Vec::new();

        for definition in gql_doc.definitions {
            match definition {
                Definition::Fragment(f) => {
                    if fragments.contains_key(&f.name) {
                        return Err(HandlerError::query_conversion(format!(
                            "Fragment '{}' is defined more than once.",
                            f.name
                        )));
                    }

                    fragments.insert(f.name.clone(), f);
                }
                Definition::Operation(op) => operations.push(op),
            }
        }

        let operation = Self::select_operation(operations, operation_name)?;

        let (variable_definitions, selection_set, is_write) = match operation {
            OperationDefinition::Subscription(s) => {
                return Err(HandlerError::unsupported_feature(
                    "Subscription query",
                    format!("At position {}.", s.position),
                ));
            }
            OperationDefinition::SelectionSet(s) => (Vec::new(), s, false),
            OperationDefinition::Query(q) => (q.variable_definitions, q.selection_set, false),
            OperationDefinition::Mutation(m) => (m.variable_definitions, m.selection_set, true),
        };

        let adapter = Self {
            fragments,
            variables: Self::resolve_variables(&variable_definitions, variables)?,
        };

        let selections = adapter.convert_selection_set(&selection_set, None, &mut Vec::new())?;

        let operations = selections
            .into_iter()
            .map(|selection| {
                let operation = if is_write {
                    Operation::Write(selection)
                } else {
                    Operation::Read(selection)
                };

                operation.dedup_selections()
            })
            .collect();

        Ok(operations)
    }

    fn select_operation(
        operations: Vec<OperationDefinition<'a, String>>,
        operation_name: Option<&str>,
    ) -> Result<OperationDefinition<'a, String>> {
        match operation_name {
            Some(name) => operations
                .into_iter()
                .find(|op| Self::matches_operation(op, name))
                .ok_or_else(|| HandlerError::query_conversion(format!("Operation '{name}' does not match any query."))),
            None => {
                if operations.len() > 1 {
                    return Err(HandlerError::query_conversion(
                        "Document contains several operations, an operation name is required.",
                    ));
                }

                operations
                    .into_iter()
                    .next()
                    .ok_or_else(|| HandlerError::query_conversion("Document contained no operations."))
            }
        }
    }

    /// Checks if the given GraphQL definition matches the operation name that should be executed.
    fn matches_operation(def: &OperationDefinition<'a, String>, operation: &str) -> bool {
        let check = |n: Option<&String>| n.filter(|name| name.as_str() == operation).is_some();

        match def {
            OperationDefinition::Subscription(s) => check(s.name.as_ref()),
            OperationDefinition::SelectionSet(_) => false,
            OperationDefinition::Query(q) => check(q.name.as_ref()),
            OperationDefinition::Mutation(m) => check(m.name.as_ref()),
        }
    }

    fn resolve_variables(
        definitions: &[VariableDefinition<'a, String>],
        provided: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<IndexMap<String, Option<GraphValue>>> {
        let no_variables = IndexMap::new();

        definitions
            .iter()
            .map(|definition| {
                let non_null = matches!(definition.var_type, Type::NonNullType(_));
                let missing = || HandlerError::MissingVariable {
                    name: definition.name.clone(),
                    type_name: definition.var_type.to_string(),
                };

                let value = match provided.get(&definition.name) {
                    Some(value) => Some(GraphValue::try_from(value.clone()).map_err(|err| {
                        HandlerError::query_conversion(format!("Variable '{}': {err}", definition.name))
                    })?),
                    None => match &definition.default_value {
                        Some(default) => Self::convert_value(default, &no_variables)?,
                        None => None,
                    },
                };

                match value {
                    None | Some(GraphValue::Null) if non_null => Err(missing()),
                    value => Ok((definition.name.clone(), value)),
                }
            })
            .collect()
    }

    fn convert_selection_set(
        &self,
        selection_set: &SelectionSet<'a, String>,
        type_condition: Option<&str>,
        spreads: &mut Vec<String>,
    ) -> Result<Vec<Selection>> {
        let mut selections = Vec::with_capacity(selection_set.items.len());

        for item in &selection_set.items {
            match item {
                GqlSelection::Field(f) => {
                    if !self.is_included(&f.directives)? {
                        continue;
                    }

                    let mut arguments = Vec::with_capacity(f.arguments.len());

                    for (name, value) in &f.arguments {
                        if let Some(value) = self.convert_argument(value)? {
                            arguments.push((name.clone(), value));
                        }
                    }

                    // Nested fields belong to the field's own type, not the enclosing fragment.
                    let nested = self.convert_selection_set(&f.selection_set, None, spreads)?;

                    selections.push(
                        Selection::new(f.name.clone(), f.alias.clone(), arguments, nested)
                            .on_type(type_condition.map(ToOwned::to_owned)),
                    );
                }

                GqlSelection::InlineFragment(i) => {
                    if !self.is_included(&i.directives)? {
                        continue;
                    }

                    let condition = match &i.type_condition {
                        Some(TypeCondition::On(name)) => Some(name.as_str()),
                        None => type_condition,
                    };

                    selections.extend(self.convert_selection_set(&i.selection_set, condition, spreads)?);
                }

                GqlSelection::FragmentSpread(fs) => {
                    if !self.is_included(&fs.directives)? {
                        continue;
                    }

                    let fragment = self.fragments.get(&fs.fragment_name).ok_or_else(|| {
                        HandlerError::query_conversion(format!(
                            "Fragment '{}' is not defined, at position {}.",
                            fs.fragment_name, fs.position
                        ))
                    })?;

                    if spreads.contains(&fs.fragment_name) {
                        return Err(HandlerError::query_conversion(format!(
                            "Fragment '{}' spreads itself.",
                            fs.fragment_name
                        )));
                    }

                    let TypeCondition::On(condition) = &fragment.type_condition;

                    spreads.push(fs.fragment_name.clone());
                    let nested = self.convert_selection_set(&fragment.selection_set, Some(condition), spreads)?;
                    spreads.pop();

                    selections.extend(nested);
                }
            }
        }

        Ok(selections)
    }

    fn is_included(&self, directives: &[Directive<'a, String>]) -> Result<bool> {
        let mut included = true;

        for directive in directives {
            let expected = match directive.name.as_str() {
                "skip" => false,
                "include" => true,
                name => {
                    return Err(HandlerError::unsupported_feature(
                        "Directive",
                        format!("@{name}, at position {}.", directive.position),
                    ));
                }
            };

            let condition = directive
                .arguments
                .iter()
                .find(|(name, _)| name == "if")
                .map(|(_, value)| self.convert_argument(value))
                .transpose()?
                .flatten();

            match condition {
                Some(GraphValue::Boolean(b)) => included &= b == expected,
                _ => {
                    return Err(HandlerError::query_conversion(format!(
                        "@{} requires a Boolean `if` argument.",
                        directive.name
                    )));
                }
            }
        }

        Ok(included)
    }

    /// `None` drops the argument.
    fn convert_argument(&self, value: &Value<'a, String>) -> Result<Option<GraphValue>> {
        Self::convert_value(value, &self.variables)
    }

    /// Absent variables nested in lists and objects read as null.
    fn convert_value(
        value: &Value<'a, String>,
        variables: &IndexMap<String, Option<GraphValue>>,
    ) -> Result<Option<GraphValue>> {
        let nested = |value: &Value<'a, String>| -> Result<GraphValue> {
            Ok(Self::convert_value(value, variables)?.unwrap_or(GraphValue::Null))
        };

        let value = match value {
            Value::Variable(name) => {
                return variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| HandlerError::query_conversion(format!("Variable '${name}' is not defined.")));
            }
            Value::Int(i) => match i.as_i64() {
                Some(i) => GraphValue::Int(i),
                None => {
                    return Err(HandlerError::query_conversion(format!(
                        "Invalid 64 bit integer: {i:?}"
                    )));
                }
            },
            Value::Float(f) => GraphValue::Float(*f),
            Value::String(s) => GraphValue::String(s.clone()),
            Value::Boolean(b) => GraphValue::Boolean(*b),
            Value::Null => GraphValue::Null,
            Value::Enum(e) => GraphValue::Enum(e.clone()),
            Value::List(values) => GraphValue::List(values.iter().map(nested).collect::<Result<Vec<_>>>()?),
            Value::Object(map) => {
                let values = map
                    .iter()
                    .map(|(k, v)| nested(v).map(|v| (k.clone(), v)))
                    .collect::<Result<GraphObjectValue>>()?;

                GraphValue::Object(values)
            }
        };

        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_parser::query::parse_query;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn convert(query: &str, operation_name: Option<&str>, variables: serde_json::Value) -> Result<Vec<Operation>> {
        let serde_json::Value::Object(variables) = variables else {
            panic!("variables must be an object");
        };

        GraphQLProtocolAdapter::convert(parse_query::<String>(query).unwrap(), operation_name, &variables)
    }

    #[test]
    fn root_fields_become_one_operation_each() {
        let operations = convert("{ movies { title } actors { name } }", None, json!({})).unwrap();

        let names: Vec<_> = operations.iter().map(|op| (op.name(), op.is_write())).collect();
        assert_eq!(names, vec![("movies", false), ("actors", false)]);
    }

    #[test]
    fn fragments_carry_their_type_condition() {
        let query = indoc! {r#"
            query {
                productions {
                    title
                    ... on Movie { runtime }
                    ...SeriesFields
                }
            }

            fragment SeriesFields on Series {
                episodes
            }
        "#};

        let operations = convert(query, None, json!({})).unwrap();
        let nested: Vec<_> = operations[0]
            .selection()
            .nested_selections()
            .iter()
            .map(|s| (s.name(), s.type_condition()))
            .collect();

        assert_eq!(
            nested,
            vec![("title", None), ("runtime", Some("Movie")), ("episodes", Some("Series"))]
        );
    }

    #[test]
    fn absent_nullable_variables_drop_the_argument() {
        let query = indoc! {r#"
            query Movies($where: MovieWhere, $limit: Int = 10) {
                movies(where: $where, options: { limit: $limit }) { title }
            }
        "#};

        let operations = convert(query, Some("Movies"), json!({})).unwrap();
        let selection = operations[0].selection();

        assert_eq!(selection.argument("where"), None);
        assert_eq!(
            selection.argument("options"),
            Some(&GraphValue::object([("limit", GraphValue::Int(10))]))
        );
    }

    #[test]
    fn non_null_variables_are_required() {
        let query = "mutation Delete($id: ID!) { deleteMovies(where: { id: $id }) { nodesDeleted } }";

        let err = convert(query, None, json!({})).unwrap_err();

        assert!(matches!(err, HandlerError::MissingVariable { ref name, ref type_name } if name == "id" && type_name == "ID!"));
    }

    #[test]
    fn skip_and_include_follow_their_condition() {
        let query = indoc! {r#"
            query ($full: Boolean!) {
                movies {
                    title
                    runtime @include(if: $full)
                    id @skip(if: true)
                }
            }
        "#};

        let operations = convert(query, None, json!({ "full": false })).unwrap();
        let nested: Vec<_> = operations[0].selection().nested_selections().iter().map(|s| s.name()).collect();

        assert_eq!(nested, vec!["title"]);
    }

    #[test]
    fn several_operations_need_a_name() {
        let query = "query A { movies { title } } mutation B { deleteMovies { nodesDeleted } }";

        assert!(convert(query, None, json!({})).is_err());

        let operations = convert(query, Some("B"), json!({})).unwrap();
        assert!(operations[0].is_write());
    }

    #[test]
    fn subscriptions_are_unsupported() {
        let err = convert("subscription { movieCreated { title } }", None, json!({})).unwrap_err();

        assert!(matches!(err, HandlerError::UnsupportedFeature { .. }));
    }

    #[test]
    fn self_spreading_fragments_are_rejected() {
        let query = "{ movies { ...F } } fragment F on Movie { title ...F }";

        assert!(convert(query, None, json!({})).is_err());
    }
}
