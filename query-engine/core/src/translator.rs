use crate::{
    CoreError, CoreResult, TranslatorConfig,
    extractors::*,
    query_document::{Operation, Selection},
};
use cypher_query_builder::{Callback, Callbacks, CypherQueryBuilder, CypherStatement, QueryBuilder, Settings};
use graph_value::GraphValue;
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use query_structure::{GraphSchema, TypeKind, TypeRef, prelude::ObjectSelection};
use std::{fmt, sync::Arc};
use tracing::debug;

/// How the rows of a translated statement form the GraphQL result of the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    /// One row per node, the projected node in the `this` column.
    List,
    /// One row holding the whole result in the `this` column.
    Single,
    /// One row holding the projected nodes in the `data` column, returned under `key`.
    Mutation { key: String },
    /// One row with the `nodesDeleted` and `relationshipsDeleted` counts.
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub statement: CypherStatement,
    pub shape: ResultShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootKind {
    Read,
    Connection,
    Aggregate,
    Create,
    Update,
    Delete,
}

impl RootKind {
    fn is_write(self) -> bool {
        matches!(self, RootKind::Create | RootKind::Update | RootKind::Delete)
    }
}

/// Compiles top-level operation fields into Cypher statements. Immutable once built and
/// shared between requests.
pub struct Translator {
    schema: Arc<GraphSchema>,
    settings: Settings,
    callbacks: Callbacks,
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("settings", &self.settings)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

pub struct TranslatorBuilder {
    schema: Arc<GraphSchema>,
    config: TranslatorConfig,
    callbacks: Callbacks,
}

impl TranslatorBuilder {
    pub fn config(mut self, config: TranslatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers the callback `@populatedBy(callback: name)` fields are filled with.
    pub fn callback<F>(mut self, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> GraphValue + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.callbacks.insert(name.into(), callback);
        self
    }

    /// Fails when a `@populatedBy` field names a callback that is not registered.
    pub fn build(self) -> CoreResult<Translator> {
        for type_ref in self.schema.types() {
            for field in &type_ref.fields {
                if let Some(populated_by) = &field.populated_by {
                    if !self.callbacks.contains_key(&populated_by.callback) {
                        return Err(CoreError::schema(
                            format!("{}.{}", type_ref.name, field.name),
                            format!("no callback named `{}` is registered", populated_by.callback),
                        ));
                    }
                }
            }
        }

        Ok(Translator {
            schema: self.schema,
            settings: self.config.into(),
            callbacks: self.callbacks,
        })
    }
}

impl Translator {
    pub fn builder(schema: Arc<GraphSchema>) -> TranslatorBuilder {
        TranslatorBuilder {
            schema,
            config: TranslatorConfig::default(),
            callbacks: Callbacks::new(),
        }
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    /// One statement for one top-level field. `claims` are the verified claims of the
    /// caller, `None` for anonymous callers.
    #[tracing::instrument(skip_all, fields(field = %operation.name(), write = operation.is_write()))]
    pub fn translate(&self, operation: &Operation, claims: Option<&GraphValue>) -> CoreResult<Translation> {
        let selection = operation.selection();
        let path = selection.response_key();

        let (kind, target) = self
            .resolve_root(selection.name())
            .ok_or_else(|| CoreError::query_shape(path, format!("unknown root field `{}`", selection.name())))?;

        if kind.is_write() != operation.is_write() {
            let message = match kind.is_write() {
                true => "mutation fields must be selected in a mutation",
                false => "query fields must be selected in a query",
            };

            return Err(CoreError::query_shape(path, message));
        }

        let ctx = ExtractorContext::new(&self.schema, &self.settings);
        let builder = CypherQueryBuilder::new(&self.schema, &self.settings, claims, &self.callbacks);

        let translation = match kind {
            RootKind::Read => {
                let args = extract_query_args(ctx, &target, selection.arguments(), path)?;
                let branches = extract_branches(ctx, &target, selection, &IndexMap::new(), path)?;

                Translation {
                    statement: builder.build_read(&target, &args, &branches)?,
                    shape: ResultShape::List,
                }
            }
            RootKind::Connection => {
                let connection = extract_connection(ctx, None, &target, selection, path)?;

                Translation {
                    statement: builder.build_connection(&connection)?,
                    shape: ResultShape::Single,
                }
            }
            RootKind::Aggregate => {
                let aggregate = extract_aggregate(ctx, None, &target, selection, path)?;

                Translation {
                    statement: builder.build_aggregate(&aggregate)?,
                    shape: ResultShape::Single,
                }
            }
            RootKind::Create => {
                let inputs = extract_create_inputs(ctx, &target, selection.arguments(), path)?;
                let (key, response) = self.mutation_response(ctx, &target, selection, path)?;

                Translation {
                    statement: builder.build_create(&inputs, &response)?,
                    shape: ResultShape::Mutation { key },
                }
            }
            RootKind::Update => {
                let args = extract_update_args(ctx, &target, selection.arguments(), path)?;
                let (key, response) = self.mutation_response(ctx, &target, selection, path)?;

                Translation {
                    statement: builder.build_update(&target, &args, &response)?,
                    shape: ResultShape::Mutation { key },
                }
            }
            RootKind::Delete => {
                let args = extract_delete_args(ctx, &target, selection.arguments(), path)?;

                Translation {
                    statement: builder.build_delete(&target, &args)?,
                    shape: ResultShape::Delete,
                }
            }
        };

        debug!(type_name = %target.name, shape = ?translation.shape, "translated operation");

        Ok(translation)
    }

    /// `movies`, `moviesConnection`, `moviesAggregate`, `createMovies`, `updateMovies`
    /// and `deleteMovies` of the type with plural `movies`.
    fn resolve_root(&self, name: &str) -> Option<(RootKind, TypeRef)> {
        let by_plural = |plural: &str| self.schema.find_by_plural(plural).cloned();

        if let Some(target) = by_plural(name) {
            return Some((RootKind::Read, target));
        }

        let suffixed = [("Connection", RootKind::Connection), ("Aggregate", RootKind::Aggregate)];

        for (suffix, kind) in suffixed {
            if let Some(target) = name.strip_suffix(suffix).and_then(by_plural) {
                return Some((kind, target));
            }
        }

        let prefixed = [
            ("create", RootKind::Create),
            ("update", RootKind::Update),
            ("delete", RootKind::Delete),
        ];

        prefixed.into_iter().find_map(|(prefix, kind)| {
            let stem = name.strip_prefix(prefix)?;

            self.schema
                .types()
                .find(|t| matches!(t.kind, TypeKind::Node | TypeKind::Interface) && t.plural.to_upper_camel_case() == stem)
                .map(|target| (kind, target.clone()))
        })
    }

    /// The `movies { … }` part of a create or update response. `info` carries no nodes
    /// and needs nothing from the statement.
    fn mutation_response(
        &self,
        ctx: ExtractorContext<'_>,
        target: &TypeRef,
        selection: &Selection,
        path: &str,
    ) -> CoreResult<(String, ObjectSelection)> {
        let mut response = None;

        for nested in selection.nested_selections() {
            match nested.name() {
                name if name == target.plural => response = Some(nested),
                "info" | "__typename" => (),
                other => {
                    return Err(CoreError::query_shape(
                        format!("{path}.{other}"),
                        format!("mutation responses have no field `{other}`"),
                    ));
                }
            }
        }

        let Some(nodes) = response else {
            return Ok((target.plural.clone(), ObjectSelection::new(target.clone(), Vec::new())));
        };

        let path = format!("{path}.{}", nodes.response_key());
        let branches = extract_branches(ctx, target, nodes, &IndexMap::new(), &path)?;

        let object = branches
            .into_iter()
            .find(|branch| branch.type_ref.name == target.name)
            .unwrap_or_else(|| ObjectSelection::new(target.clone(), Vec::new()));

        Ok((nodes.response_key().to_owned(), object))
    }
}
