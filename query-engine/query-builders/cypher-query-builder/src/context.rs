use crate::{BuildError, BuildResult};
use cypher_ast::ast::Variable;
use graph_value::GraphValue;
use indexmap::IndexMap;
use query_structure::{FilterParser, GraphSchema};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

/// Produces the value of a `@populatedBy` field.
pub type Callback = Arc<dyn Fn() -> GraphValue + Send + Sync>;

pub type Callbacks = IndexMap<String, Callback>;

/// Knobs of the statement builders, fixed for the lifetime of a translator.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub claim_prefix: String,
    pub enable_regex: bool,
    /// Limit of root list reads that do not give one.
    pub default_limit: Option<i64>,
    /// Upper bound of every limit and `first` argument.
    pub max_limit: Option<i64>,
    pub validate_procedure: String,
    pub cursor_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            claim_prefix: "$jwt.".into(),
            enable_regex: false,
            default_limit: None,
            max_limit: None,
            validate_procedure: "apoc.util.validate".into(),
            cursor_prefix: "arrayconnection:".into(),
        }
    }
}

impl Settings {
    /// Applies `max_limit` to a requested limit.
    pub(crate) fn cap(&self, limit: Option<i64>) -> Option<i64> {
        match (limit, self.max_limit) {
            (Some(limit), Some(max)) => Some(limit.min(max)),
            (None, Some(max)) => Some(max),
            (limit, None) => limit,
        }
    }
}

#[derive(Default)]
struct Names {
    counters: HashMap<String, usize>,
    variables: HashSet<String>,
    last: HashMap<String, String>,
    parameter_counters: HashMap<String, usize>,
    parameters: HashSet<String>,
}

/// The state of one translation. Every top-level operation gets a fresh context, names
/// are never shared between two statements.
pub struct Context<'a> {
    schema: &'a GraphSchema,
    settings: &'a Settings,
    claims: Option<&'a GraphValue>,
    callbacks: &'a Callbacks,

    names: RefCell<Names>,
}

impl<'a> Context<'a> {
    pub fn new(
        schema: &'a GraphSchema,
        settings: &'a Settings,
        claims: Option<&'a GraphValue>,
        callbacks: &'a Callbacks,
    ) -> Self {
        Context {
            schema,
            settings,
            claims,
            callbacks,

            names: Default::default(),
        }
    }

    pub fn schema(&self) -> &'a GraphSchema {
        self.schema
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    /// A fresh variable for `path`: segments joined with `_` and a counter per joined base,
    /// `["this", "actors"]` yields `this_actors0`, then `this_actors1`.
    pub fn allocate(&self, path: &[&str]) -> Variable {
        let base = path.join("_");
        let mut names = self.names.borrow_mut();

        // `this_a` with counter 10 and `this_a1` with counter 0 both render `this_a10`.
        let name = loop {
            let counter = names.counters.entry(base.clone()).or_default();
            let candidate = format!("{base}{counter}");
            *counter += 1;

            if names.variables.insert(candidate.clone()) {
                break candidate;
            }
        };

        names.last.insert(base, name.clone());

        Variable::new(name)
    }

    /// The variable last allocated for `path`, if any.
    pub fn resolve(&self, path: &[&str]) -> Option<Variable> {
        self.names.borrow().last.get(&path.join("_")).cloned().map(Variable::new)
    }

    /// Registers a parameter name, suffixing it with a counter if `base` is already taken.
    pub fn parameter_name(&self, base: &str) -> String {
        let mut names = self.names.borrow_mut();

        if names.parameters.insert(base.to_owned()) {
            return base.to_owned();
        }

        loop {
            let counter = names.parameter_counters.entry(base.to_owned()).or_insert(1);
            let candidate = format!("{base}{counter}");
            *counter += 1;

            if names.parameters.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Name of the next predicate parameter in the namespace of `scope` and `token`,
    /// `this` and `auth` give `thisauth_param0`, `thisauth_param1`, …
    pub fn predicate_parameter(&self, scope: &Variable, token: &str) -> String {
        let base = format!("{scope}{token}_param");
        let mut names = self.names.borrow_mut();

        loop {
            let counter = names.parameter_counters.entry(base.clone()).or_default();
            let candidate = format!("{base}{counter}");
            *counter += 1;

            if names.parameters.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// The value of a caller claim, `org.id` follows nested objects.
    pub fn claim(&self, path: &str) -> BuildResult<GraphValue> {
        let value = self
            .claims
            .and_then(|claims| claims.lookup_path(path))
            .ok_or(BuildError::AuthorizationContext)?;

        Ok(value.clone())
    }

    /// A claim that may be absent without failing the translation.
    pub fn optional_claim(&self, path: &str) -> Option<&'a GraphValue> {
        self.claims.and_then(|claims| claims.lookup_path(path))
    }

    pub fn callback(&self, name: &str) -> BuildResult<GraphValue> {
        let callback = self
            .callbacks
            .get(name)
            .ok_or_else(|| BuildError::MissingCallback { name: name.to_owned() })?;

        Ok(callback())
    }

    /// The parser for `@auth` templates, which always resolve claims.
    pub(crate) fn auth_parser(&self) -> FilterParser<'a> {
        FilterParser::new(self.schema)
            .with_claim_prefix(&self.settings.claim_prefix)
            .allow_regex(true)
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("authenticated", &self.is_authenticated())
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}
