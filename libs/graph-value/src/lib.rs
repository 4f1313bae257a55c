mod error;

use indexmap::IndexMap;
use serde::Serialize;
use std::{convert::TryFrom, fmt};

pub use error::ConversionFailure;

pub type GraphValueResult<T> = std::result::Result<T, ConversionFailure>;
pub type GraphListValue = Vec<GraphValue>;
pub type GraphObjectValue = IndexMap<String, GraphValue>;

/// A dynamically typed value as it flows through the engine: argument values of a query
/// document, caller claims and, finally, the parameters bound to a statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphValue {
    String(String),
    Boolean(bool),
    Enum(String),
    Int(i64),
    Float(f64),
    List(GraphListValue),

    /// A collection of key-value pairs, in insertion order.
    Object(GraphObjectValue),

    Null,
}

impl GraphValue {
    pub fn object<I, K>(pairs: I) -> GraphValue
    where
        I: IntoIterator<Item = (K, GraphValue)>,
        K: Into<String>,
    {
        GraphValue::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            GraphValue::String(_) => "String",
            GraphValue::Boolean(_) => "Boolean",
            GraphValue::Enum(_) => "Enum",
            GraphValue::Int(_) => "Int",
            GraphValue::Float(_) => "Float",
            GraphValue::List(_) => "List",
            GraphValue::Object(_) => "Object",
            GraphValue::Null => "Null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::String(s) | GraphValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GraphValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GraphValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&GraphObjectValue> {
        match self {
            GraphValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[GraphValue]> {
        match self {
            GraphValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            GraphValue::String(s) | GraphValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<GraphListValue> {
        match self {
            GraphValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<GraphObjectValue> {
        match self {
            GraphValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Wraps non-list values into a single element list, the way GraphQL input coercion
    /// treats a single value given for a list argument.
    pub fn coerce_list(self) -> GraphListValue {
        match self {
            GraphValue::List(l) => l,
            GraphValue::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Follows a dotted path (`org.id`) through nested objects.
    pub fn lookup_path(&self, path: &str) -> Option<&GraphValue> {
        path.split('.').try_fold(self, |current, segment| match current {
            GraphValue::Object(obj) => obj.get(segment),
            _ => None,
        })
    }
}

impl TryFrom<serde_json::Value> for GraphValue {
    type Error = ConversionFailure;

    fn try_from(v: serde_json::Value) -> GraphValueResult<Self> {
        match v {
            serde_json::Value::String(s) => Ok(GraphValue::String(s)),
            serde_json::Value::Array(v) => {
                let vals: GraphValueResult<Vec<GraphValue>> = v.into_iter().map(GraphValue::try_from).collect();
                Ok(GraphValue::List(vals?))
            }
            serde_json::Value::Null => Ok(GraphValue::Null),
            serde_json::Value::Bool(b) => Ok(GraphValue::Boolean(b)),
            serde_json::Value::Number(num) => match num.as_i64() {
                Some(i) => Ok(GraphValue::Int(i)),
                None => num
                    .as_f64()
                    .map(GraphValue::Float)
                    .ok_or_else(|| ConversionFailure::new("JSON number", "GraphValue::Float")),
            },
            serde_json::Value::Object(obj) => {
                let pairs = obj
                    .into_iter()
                    .map(|(k, v)| GraphValue::try_from(v).map(|v| (k, v)))
                    .collect::<GraphValueResult<GraphObjectValue>>()?;

                Ok(GraphValue::Object(pairs))
            }
        }
    }
}

impl From<GraphValue> for serde_json::Value {
    fn from(value: GraphValue) -> Self {
        match value {
            GraphValue::String(s) | GraphValue::Enum(s) => serde_json::Value::String(s),
            GraphValue::Boolean(b) => serde_json::Value::Bool(b),
            GraphValue::Int(i) => serde_json::Value::from(i),
            GraphValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            GraphValue::List(l) => serde_json::Value::Array(l.into_iter().map(Into::into).collect()),
            GraphValue::Object(obj) => serde_json::Value::Object(obj.into_iter().map(|(k, v)| (k, v.into())).collect()),
            GraphValue::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::String(x) => write!(f, "{x:?}"),
            GraphValue::Enum(x) => x.fmt(f),
            GraphValue::Boolean(x) => x.fmt(f),
            GraphValue::Int(x) => x.fmt(f),
            GraphValue::Float(x) => x.fmt(f),
            GraphValue::Null => "null".fmt(f),
            GraphValue::List(x) => {
                let joined = x.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "[{joined}]")
            }
            GraphValue::Object(pairs) => {
                let joined = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");

                write!(f, "{{ {joined} }}")
            }
        }
    }
}

impl From<&str> for GraphValue {
    fn from(s: &str) -> Self {
        GraphValue::String(s.to_owned())
    }
}

impl From<String> for GraphValue {
    fn from(s: String) -> Self {
        GraphValue::String(s)
    }
}

impl From<bool> for GraphValue {
    fn from(b: bool) -> Self {
        GraphValue::Boolean(b)
    }
}

impl From<i32> for GraphValue {
    fn from(i: i32) -> Self {
        GraphValue::Int(i64::from(i))
    }
}

impl From<i64> for GraphValue {
    fn from(i: i64) -> Self {
        GraphValue::Int(i)
    }
}

impl TryFrom<u64> for GraphValue {
    type Error = ConversionFailure;

    fn try_from(u: u64) -> GraphValueResult<Self> {
        i64::try_from(u)
            .map(GraphValue::Int)
            .map_err(|_| ConversionFailure::new("u64", "GraphValue::Int"))
    }
}

impl From<f64> for GraphValue {
    fn from(f: f64) -> Self {
        GraphValue::Float(f)
    }
}

impl From<GraphListValue> for GraphValue {
    fn from(l: GraphListValue) -> Self {
        GraphValue::List(l)
    }
}

impl From<GraphObjectValue> for GraphValue {
    fn from(obj: GraphObjectValue) -> Self {
        GraphValue::Object(obj)
    }
}

impl<T> From<Option<T>> for GraphValue
where
    T: Into<GraphValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => GraphValue::Null,
        }
    }
}

impl TryFrom<GraphValue> for i64 {
    type Error = ConversionFailure;

    fn try_from(value: GraphValue) -> GraphValueResult<i64> {
        match value {
            GraphValue::Int(i) => Ok(i),
            _ => Err(ConversionFailure::new("GraphValue", "i64")),
        }
    }
}

impl TryFrom<GraphValue> for String {
    type Error = ConversionFailure;

    fn try_from(value: GraphValue) -> GraphValueResult<String> {
        value
            .into_string()
            .ok_or_else(|| ConversionFailure::new("GraphValue", "String"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn json_objects_keep_their_key_order() {
        let value = GraphValue::try_from(json!({ "b": 1, "a": [true, null], "c": 1.5 })).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();

        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(value.lookup_path("a"), Some(&GraphValue::List(vec![true.into(), GraphValue::Null])));
    }

    #[test]
    fn lookup_path_walks_nested_objects() {
        let claims = GraphValue::try_from(json!({ "sub": "id-01", "org": { "id": "org-7" } })).unwrap();

        assert_eq!(claims.lookup_path("org.id"), Some(&GraphValue::from("org-7")));
        assert_eq!(claims.lookup_path("org.name"), None);
        assert_eq!(claims.lookup_path("sub.id"), None);
    }

    #[test]
    fn serializes_untagged() {
        let value = GraphValue::object([("title", "A".into()), ("year", 1999.into()), ("x", GraphValue::Null)]);

        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"title":"A","year":1999,"x":null}"#
        );
    }

    #[test]
    fn unsigned_values_beyond_int_range_are_rejected() {
        assert!(matches!(GraphValue::try_from(42u64), Ok(GraphValue::Int(42))));
        assert!(matches!(
            GraphValue::try_from(u64::MAX),
            Err(ConversionFailure { from: "u64", .. })
        ));
    }

    #[test]
    fn coerce_list_wraps_single_values() {
        assert_eq!(GraphValue::from(1).coerce_list(), vec![GraphValue::Int(1)]);
        assert_eq!(GraphValue::Null.coerce_list(), Vec::<GraphValue>::new());
    }
}
