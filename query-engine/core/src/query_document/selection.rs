use graph_value::GraphValue;
use itertools::Itertools;

pub type SelectionArgument = (String, GraphValue);

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    name: String,
    alias: Option<String>,
    arguments: Vec<SelectionArgument>,
    nested_selections: Vec<Selection>,
    /// `on Type` of the fragment the selection was written in.
    type_condition: Option<String>,
}

impl Selection {
    pub fn with_name(name: impl Into<String>) -> Selection {
        Selection::new(name.into(), None, Vec::new(), Vec::new())
    }

    pub fn new<T, A, N>(name: T, alias: Option<String>, arguments: A, nested_selections: N) -> Self
    where
        T: Into<String>,
        A: Into<Vec<SelectionArgument>>,
        N: Into<Vec<Selection>>,
    {
        Self {
            name: name.into(),
            alias,
            arguments: arguments.into(),
            nested_selections: nested_selections.into(),
            type_condition: None,
        }
    }

    pub fn on_type(mut self, type_condition: Option<String>) -> Self {
        self.type_condition = type_condition;
        self
    }

    /// Drops repeated selections of one response key, keeping the first one. Repeated
    /// keys under different type conditions are kept, they apply to different types.
    pub fn dedup(mut self) -> Self {
        self.nested_selections = self
            .nested_selections
            .into_iter()
            .unique_by(|s| (s.response_key().to_owned(), s.type_condition.clone()))
            .map(Selection::dedup)
            .collect();

        self
    }

    pub fn arguments(&self) -> &[SelectionArgument] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&GraphValue> {
        self.arguments
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_null())
    }

    pub fn push_argument(&mut self, key: impl Into<String>, arg: impl Into<GraphValue>) {
        self.arguments.push((key.into(), arg.into()));
    }

    pub fn push_nested_selection(&mut self, selection: Selection) {
        self.nested_selections.push(selection);
    }

    pub fn nested_selections(&self) -> &[Self] {
        &self.nested_selections
    }

    pub fn nested_selection(&self, name: &str) -> Option<&Selection> {
        self.nested_selections.iter().find(|sel| sel.name() == name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &Option<String> {
        &self.alias
    }

    /// The alias if one was given, the field name otherwise.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn type_condition(&self) -> Option<&str> {
        self.type_condition.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dedup_keeps_the_first_selection_per_key() {
        let selection = Selection::new(
            "movies",
            None,
            Vec::new(),
            vec![
                Selection::with_name("title"),
                Selection::new("title", Some("name".into()), Vec::new(), Vec::new()),
                Selection::with_name("title"),
                Selection::with_name("title").on_type(Some("Movie".into())),
            ],
        )
        .dedup();

        let keys: Vec<_> = selection
            .nested_selections()
            .iter()
            .map(|s| (s.response_key(), s.type_condition()))
            .collect();

        assert_eq!(keys, vec![("title", None), ("name", None), ("title", Some("Movie"))]);
    }

    #[test]
    fn null_arguments_count_as_absent() {
        let mut selection = Selection::with_name("movies");
        selection.push_argument("where", GraphValue::Null);
        selection.push_argument("options", GraphValue::object([("limit", GraphValue::Int(1))]));

        assert_eq!(selection.argument("where"), None);
        assert!(selection.argument("options").is_some());
    }
}
