use super::{definition::*, GraphSchema};
use crate::{
    AuthRule, DomainError, FieldDescriptor, FieldKind, FilterParser, FulltextIndex, PopulatedBy, RelationshipDescriptor,
    ScalarKind, TypeDescriptor, TypeKind,
};
use enumflags2::BitFlags;
use graph_value::GraphValue;
use heck::ToLowerCamelCase;
use indexmap::IndexMap;
use std::sync::Arc;

type Result<T> = std::result::Result<T, DomainError>;

/// Claim prefix used while validating `@auth` templates at build time.
const VALIDATION_CLAIM_PREFIX: &str = "$jwt.";

/// Validates type definitions and freezes them into a [`GraphSchema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    definitions: Vec<TypeDefinition>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definition(definition: SchemaDefinition) -> Self {
        Self {
            definitions: definition.types,
        }
    }

    pub fn add_type(mut self, definition: TypeDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    #[tracing::instrument(skip(self), fields(types = self.definitions.len()))]
    pub fn build(self) -> Result<GraphSchema> {
        let mut by_name: IndexMap<&str, &TypeDefinition> = IndexMap::with_capacity(self.definitions.len());

        for definition in &self.definitions {
            if by_name.insert(definition.name.as_str(), definition).is_some() {
                return Err(DomainError::invalid_schema(&definition.name, "type is defined more than once"));
            }
        }

        let implementers = collect_implementers(&by_name)?;
        let mut types = IndexMap::with_capacity(by_name.len());

        for definition in by_name.values().copied() {
            let descriptor = build_type(definition, &by_name, &implementers)?;
            types.insert(descriptor.name.clone(), Arc::new(descriptor));
        }

        let schema = GraphSchema { types };

        check_interface_fields(&schema)?;
        check_auth_templates(&schema)?;

        tracing::debug!(types = schema.types.len(), "schema built");

        Ok(schema)
    }
}

fn collect_implementers<'a>(by_name: &IndexMap<&'a str, &'a TypeDefinition>) -> Result<IndexMap<&'a str, Vec<String>>> {
    let mut implementers: IndexMap<&str, Vec<String>> = IndexMap::new();

    for definition in by_name.values().copied() {
        match definition.kind {
            TypeKind::Interface => {
                implementers.entry(definition.name.as_str()).or_default();
            }
            TypeKind::Union => {
                if definition.members.is_empty() {
                    return Err(DomainError::invalid_schema(&definition.name, "union has no members"));
                }

                for member in &definition.members {
                    match by_name.get(member.as_str()) {
                        Some(m) if m.kind == TypeKind::Node => (),
                        _ => {
                            return Err(DomainError::invalid_schema(
                                format!("{}.{member}", definition.name),
                                "union members must be node types",
                            ))
                        }
                    }
                }

                implementers.insert(definition.name.as_str(), definition.members.clone());
            }
            _ => (),
        }
    }

    for definition in by_name.values().copied() {
        for interface in &definition.implements {
            let path = format!("{}.{interface}", definition.name);

            match by_name.get(interface.as_str()) {
                Some(i) if i.kind == TypeKind::Interface && definition.kind == TypeKind::Node => {
                    if let Some(list) = implementers.get_mut(interface.as_str()) {
                        list.push(definition.name.clone());
                    }
                }
                Some(_) => return Err(DomainError::invalid_schema(path, "only node types implement interfaces")),
                None => return Err(DomainError::invalid_schema(path, "unknown interface")),
            }
        }
    }

    Ok(implementers)
}

fn build_type(
    definition: &TypeDefinition,
    by_name: &IndexMap<&str, &TypeDefinition>,
    implementers: &IndexMap<&str, Vec<String>>,
) -> Result<TypeDescriptor> {
    if definition.kind == TypeKind::Union && !definition.fields.is_empty() {
        return Err(DomainError::invalid_schema(&definition.name, "unions cannot declare fields"));
    }

    if definition.kind == TypeKind::Union && !definition.auth.is_empty() {
        return Err(DomainError::invalid_schema(
            &definition.name,
            "unions cannot declare @auth rules, declare them on the members",
        ));
    }

    // Rules declared on an interface hold for every implementer, after the implementer's own.
    let interfaces: Vec<&TypeDefinition> = definition
        .implements
        .iter()
        .filter_map(|name| by_name.get(name.as_str()).copied())
        .collect();

    let fields = definition
        .fields
        .iter()
        .map(|field| {
            let mut descriptor = build_field(definition, field, by_name)?;

            for interface in &interfaces {
                if let Some(declared) = interface.fields.iter().find(|f| f.name == field.name) {
                    let path = format!("{}.{}", interface.name, declared.name);

                    for rule in &declared.auth {
                        descriptor.auth.push(build_rule(rule, &path)?);
                    }
                }
            }

            Ok(Arc::new(descriptor))
        })
        .collect::<Result<Vec<_>>>()?;

    let unique_fields = fields
        .iter()
        .filter(|f| f.unique)
        .map(|f| f.name.clone())
        .collect();

    let fulltext = definition
        .fulltext
        .iter()
        .map(|index| {
            for name in &index.fields {
                let textual = fields
                    .iter()
                    .find(|f| &f.name == name)
                    .and_then(|f| f.scalar_kind())
                    .is_some_and(ScalarKind::is_textual);

                if !textual {
                    return Err(DomainError::invalid_schema(
                        format!("{}.{name}", definition.name),
                        format!("full-text index `{}` needs String fields", index.name),
                    ));
                }
            }

            Ok(FulltextIndex {
                name: index.name.clone(),
                fields: index.fields.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let labels = if definition.labels.is_empty() {
        vec![definition.name.clone()]
    } else {
        definition.labels.clone()
    };

    let plural = definition
        .plural
        .clone()
        .unwrap_or_else(|| format!("{}s", definition.name.to_lower_camel_case()));

    let inherited = interfaces
        .iter()
        .flat_map(|interface| interface.auth.iter().map(move |rule| build_rule(rule, &interface.name)));

    let auth = definition
        .auth
        .iter()
        .map(|rule| build_rule(rule, &definition.name))
        .chain(inherited)
        .collect::<Result<Vec<_>>>()?;

    Ok(TypeDescriptor {
        name: definition.name.clone(),
        kind: definition.kind,
        labels,
        plural,
        fields,
        implements: definition.implements.clone(),
        implementers: implementers.get(definition.name.as_str()).cloned().unwrap_or_default(),
        unique_fields,
        auth,
        fulltext,
    })
}

fn build_field(
    owner: &TypeDefinition,
    field: &FieldDefinition,
    by_name: &IndexMap<&str, &TypeDefinition>,
) -> Result<FieldDescriptor> {
    let path = format!("{}.{}", owner.name, field.name);
    let scalar = ScalarKind::from_type_name(&field.type_name);

    let kind = match (scalar, &field.relationship) {
        (Some(kind), None) => FieldKind::Scalar(kind),
        (Some(_), Some(_)) => return Err(DomainError::invalid_schema(path, "relationships need an object type")),
        (None, Some(rel)) => {
            if owner.kind == TypeKind::RelationshipProperties {
                return Err(DomainError::invalid_schema(path, "relationship properties cannot hold relationships"));
            }

            match by_name.get(field.type_name.as_str()) {
                Some(target) if target.kind != TypeKind::RelationshipProperties => (),
                Some(_) => {
                    return Err(DomainError::invalid_schema(
                        path,
                        "relationship properties types cannot be related to",
                    ))
                }
                None => {
                    return Err(DomainError::invalid_schema(
                        path,
                        format!("unknown type `{}`", field.type_name),
                    ))
                }
            }

            if let Some(properties) = &rel.properties {
                match by_name.get(properties.as_str()) {
                    Some(p) if p.kind == TypeKind::RelationshipProperties => (),
                    _ => {
                        return Err(DomainError::invalid_schema(
                            path,
                            format!("`{properties}` is not a relationship properties type"),
                        ))
                    }
                }
            }

            FieldKind::Relationship(RelationshipDescriptor {
                rel_type: rel.rel_type.clone(),
                direction: rel.direction,
                target: field.type_name.clone(),
                properties: rel.properties.clone(),
            })
        }
        (None, None) if by_name.contains_key(field.type_name.as_str()) => {
            return Err(DomainError::invalid_schema(path, "object fields need a @relationship"))
        }
        (None, None) => {
            return Err(DomainError::invalid_schema(
                path,
                format!("unknown type `{}`", field.type_name),
            ))
        }
    };

    let timestamp: BitFlags<_> = field.timestamp.iter().copied().collect();

    if !timestamp.is_empty() && scalar.and_then(ScalarKind::now_function).is_none() {
        return Err(DomainError::invalid_schema(path, "@timestamp needs a temporal field"));
    }

    let id_autogenerate = match &field.id {
        Some(_) if scalar != Some(ScalarKind::ID) => {
            return Err(DomainError::invalid_schema(path, "@id needs an ID field"));
        }
        Some(id) => id.autogenerate,
        None => false,
    };

    let default = field
        .default
        .clone()
        .map(GraphValue::try_from)
        .transpose()
        .map_err(|err| DomainError::invalid_schema(&path, err.to_string()))?;

    let populated_by = field.populated_by.as_ref().map(|p| PopulatedBy {
        callback: p.callback.clone(),
        operations: p.operations.iter().copied().collect(),
    });

    let auth = field
        .auth
        .iter()
        .map(|rule| build_rule(rule, &path))
        .collect::<Result<Vec<_>>>()?;

    Ok(FieldDescriptor {
        name: field.name.clone(),
        db_name: field.alias.clone().unwrap_or_else(|| field.name.clone()),
        type_name: field.type_name.clone(),
        kind,
        list: field.list,
        required: field.required,
        unique: field.unique || field.id.is_some(),
        id_autogenerate,
        timestamp,
        default,
        populated_by,
        auth,
    })
}

fn build_rule(rule: &AuthRuleDefinition, path: &str) -> Result<AuthRule> {
    if rule.operations.is_empty() {
        return Err(DomainError::invalid_schema(path, "@auth rule without operations"));
    }

    let where_template = rule
        .where_template
        .clone()
        .map(GraphValue::try_from)
        .transpose()
        .map_err(|err| DomainError::invalid_schema(path, err.to_string()))?;

    Ok(AuthRule {
        operations: rule.operations.iter().copied().collect(),
        where_template,
        roles: rule.roles.clone(),
        is_authenticated: rule.is_authenticated,
    })
}

/// GraphQL requires implementers to declare every interface field.
fn check_interface_fields(schema: &GraphSchema) -> Result<()> {
    for interface in schema.types().filter(|t| t.kind == TypeKind::Interface) {
        for implementer in &interface.implementers {
            let concrete = schema.find_type(implementer)?;

            for field in &interface.fields {
                if concrete.find_field(&field.name).is_none() {
                    return Err(DomainError::invalid_schema(
                        format!("{implementer}.{}", field.name),
                        format!("field of interface `{}` is missing", interface.name),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn check_auth_templates(schema: &GraphSchema) -> Result<()> {
    let parser = FilterParser::new(schema)
        .with_claim_prefix(VALIDATION_CLAIM_PREFIX)
        .allow_regex(true);

    for type_ref in schema.types() {
        let rules = type_ref.auth.iter().map(|rule| (type_ref.name.clone(), rule)).chain(
            type_ref
                .fields
                .iter()
                .flat_map(|f| f.auth.iter().map(move |rule| (format!("{}.{}", type_ref.name, f.name), rule))),
        );

        for (path, rule) in rules {
            if let Some(template) = &rule.where_template {
                parser.parse(type_ref, template, &format!("{path}.@auth.where"))?;
            }
        }
    }

    Ok(())
}
