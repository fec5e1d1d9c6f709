//! Payload structures and the hooks that shape their JSON Schemas.
//!
//! A [`Structure`] captures a Rust type's schema through [`utoipa::ToSchema`]
//! at registration time. When an operation is committed, [`SchemaHooks`]
//! resolve the structure into the schema embedded in the operation plus the
//! named definitions that go under `components.schemas`.

pub mod downgrade;

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use utoipa::openapi::schema::{
    AdditionalProperties, ArrayItems, ObjectBuilder, OneOfBuilder, Schema, SchemaType, Type,
};
use utoipa::openapi::{Ref, RefOr};
use utoipa::{PartialSchema, ToSchema};

/// Location prefix of named schema definitions.
pub const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// Content type used for structured payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type inferred for plain string payloads.
pub const TEXT_CONTENT_TYPE: &str = "text/plain";
/// Content type inferred for binary string payloads.
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// A named schema definition.
pub type Definition = (String, RefOr<Schema>);

/// The shape of a request or response payload.
///
/// ```
/// use routespec::Structure;
///
/// #[derive(utoipa::ToSchema)]
/// struct Pet {
///     id: i64,
/// }
///
/// assert!(!Structure::of::<Pet>().is_empty());
/// assert!(Structure::empty().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Structure(Option<Captured>);

#[derive(Debug, Clone)]
struct Captured {
    type_id: Option<TypeId>,
    name: String,
    container: bool,
    schema: RefOr<Schema>,
    definitions: Vec<Definition>,
}

impl Structure {
    /// Captures the schema of `T` and every schema it references.
    ///
    /// Std containers such as `Option<Pet>` or `Vec<Pet>` are documented
    /// through their element: `Pet` becomes the named definition and the
    /// payload refers to it.
    #[must_use]
    pub fn of<T: ToSchema + 'static>() -> Self {
        let mut definitions = Vec::new();
        T::schemas(&mut definitions);
        let element = element_name(std::any::type_name::<T>());
        Self(Some(Captured {
            type_id: Some(TypeId::of::<T>()),
            container: element.is_some(),
            name: element.map_or_else(|| T::name().into_owned(), str::to_string),
            schema: <T as PartialSchema>::schema(),
            definitions,
        }))
    }

    /// Wraps a hand-built schema. Named shapes are registered under `name`.
    #[must_use]
    pub fn from_schema(name: impl Into<String>, schema: impl Into<RefOr<Schema>>) -> Self {
        Self(Some(Captured {
            type_id: None,
            name: name.into(),
            container: false,
            schema: schema.into(),
            definitions: Vec::new(),
        }))
    }

    /// No payload.
    #[must_use]
    pub fn empty() -> Self {
        Self(None)
    }

    /// Returns `true` when there is no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Schema name of the captured type.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.name.as_str())
    }

    fn type_id(&self) -> Option<TypeId> {
        self.0.as_ref().and_then(|c| c.type_id)
    }
}

/// A structure resolved for one document.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    /// Schema to embed: a reference for named shapes, inline otherwise.
    pub schema: RefOr<Schema>,
    /// Definitions to merge into `components.schemas`.
    pub definitions: Vec<Definition>,
    /// Content type inferred from the payload shape.
    pub content_type: &'static str,
}

type NameRewriter = Arc<dyn Fn(&str) -> String + Send + Sync>;
type SchemaInterceptor = Arc<dyn Fn(&str, &mut RefOr<Schema>) + Send + Sync>;
type PropertyInterceptor = Arc<dyn Fn(&str, &str, &mut RefOr<Schema>) + Send + Sync>;

/// User hooks applied while resolving structures.
///
/// ```
/// use routespec::SchemaHooks;
///
/// let hooks = SchemaHooks::new()
///     .strip_definition_prefix("Dto")
///     .rewrite_definition_name(|name| name.to_uppercase());
/// assert_eq!(hooks.definition_name("DtoPet"), "PET");
/// ```
#[derive(Clone, Default)]
pub struct SchemaHooks {
    strip_prefixes: Vec<String>,
    rename: Option<NameRewriter>,
    schema_interceptors: Vec<SchemaInterceptor>,
    property_interceptors: Vec<PropertyInterceptor>,
    type_mappings: HashMap<TypeId, Structure>,
}

impl fmt::Debug for SchemaHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHooks")
            .field("strip_prefixes", &self.strip_prefixes)
            .field("rename", &self.rename.is_some())
            .field("schema_interceptors", &self.schema_interceptors.len())
            .field("property_interceptors", &self.property_interceptors.len())
            .field("type_mappings", &self.type_mappings.len())
            .finish()
    }
}

impl SchemaHooks {
    /// No hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strips `prefix` from definition names that start with it.
    #[must_use]
    pub fn strip_definition_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefixes.push(prefix.into());
        self
    }

    /// Rewrites definition names after prefix stripping.
    #[must_use]
    pub fn rewrite_definition_name(
        mut self,
        rewrite: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.rename = Some(Arc::new(rewrite));
        self
    }

    /// Called with every resolved schema and its definition name.
    #[must_use]
    pub fn intercept_schema(
        mut self,
        intercept: impl Fn(&str, &mut RefOr<Schema>) + Send + Sync + 'static,
    ) -> Self {
        self.schema_interceptors.push(Arc::new(intercept));
        self
    }

    /// Called with every object property as `(definition, property, schema)`.
    #[must_use]
    pub fn intercept_property(
        mut self,
        intercept: impl Fn(&str, &str, &mut RefOr<Schema>) + Send + Sync + 'static,
    ) -> Self {
        self.property_interceptors.push(Arc::new(intercept));
        self
    }

    /// Documents `Source` with the schema of `Target`.
    #[must_use]
    pub fn type_mapping<Source: 'static, Target: ToSchema + 'static>(mut self) -> Self {
        self.type_mappings
            .insert(TypeId::of::<Source>(), Structure::of::<Target>());
        self
    }

    /// Final definition name for a raw schema name.
    #[must_use]
    pub fn definition_name(&self, raw: &str) -> String {
        let stripped = self
            .strip_prefixes
            .iter()
            .find_map(|prefix| raw.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(raw);
        match &self.rename {
            Some(rename) => rename(stripped),
            None => stripped.to_string(),
        }
    }

    /// Resolves `structure`, or `None` when it carries no payload.
    #[must_use]
    pub fn resolve(&self, structure: &Structure) -> Option<ResolvedSchema> {
        let mapped = structure
            .type_id()
            .and_then(|id| self.type_mappings.get(&id))
            .unwrap_or(structure);
        let captured = mapped.0.as_ref()?;

        let rename = |name: &str| self.definition_name(name);
        let mut definitions = Vec::with_capacity(captured.definitions.len() + 1);
        for (raw, schema) in &captured.definitions {
            let name = self.definition_name(raw);
            let mut schema = schema.clone();
            rewrite_refs(&mut schema, &rename);
            self.intercept(&name, &mut schema);
            definitions.push((name, schema));
        }

        let mut root = captured.schema.clone();
        let content_type = infer_content_type(&root);
        rewrite_refs(&mut root, &rename);
        let schema = if captured.container {
            let name = self.definition_name(&captured.name);
            match named_leaf(&mut root) {
                Some(leaf) => {
                    let nullable = strip_null(leaf);
                    let mut definition = std::mem::replace(leaf, reference(&name, nullable));
                    self.intercept(&name, &mut definition);
                    definitions.push((name, definition));
                }
                None => self.intercept(&captured.name, &mut root),
            }
            root
        } else if is_named_shape(&root) {
            let name = self.definition_name(&captured.name);
            self.intercept(&name, &mut root);
            let reference = RefOr::Ref(Ref::from_schema_name(name.as_str()));
            definitions.push((name, root));
            reference
        } else {
            self.intercept(&captured.name, &mut root);
            root
        };

        Some(ResolvedSchema {
            schema,
            definitions,
            content_type,
        })
    }

    fn intercept(&self, name: &str, schema: &mut RefOr<Schema>) {
        if !self.property_interceptors.is_empty() {
            if let RefOr::T(Schema::Object(object)) = schema {
                for (property, value) in object.properties.iter_mut() {
                    for intercept in &self.property_interceptors {
                        intercept(name, property, value);
                    }
                }
            }
        }
        for intercept in &self.schema_interceptors {
            intercept(name, schema);
        }
    }
}

/// Objects with properties, enums and compositions become named definitions.
fn is_named_shape(schema: &RefOr<Schema>) -> bool {
    match schema {
        RefOr::T(Schema::Object(object)) => {
            !object.properties.is_empty() || object.enum_values.is_some()
        }
        RefOr::T(Schema::OneOf(_) | Schema::AllOf(_) | Schema::AnyOf(_)) => true,
        _ => false,
    }
}

/// Std containers whose element is documented in their place.
const CONTAINERS: &[&str] = &[
    "core::option::Option<",
    "alloc::boxed::Box<",
    "alloc::vec::Vec<",
    "alloc::collections::vec_deque::VecDeque<",
    "alloc::collections::linked_list::LinkedList<",
    "alloc::collections::btree::set::BTreeSet<",
    "std::collections::hash::set::HashSet<",
];

/// Element name of a (possibly nested) std container type, e.g. `Pet` for
/// `core::option::Option<alloc::vec::Vec<app::Pet>>`. `None` for any other
/// type.
fn element_name(type_name: &str) -> Option<&str> {
    let mut current = type_name;
    let mut unwrapped = false;
    while let Some(inner) = CONTAINERS
        .iter()
        .find_map(|prefix| current.strip_prefix(prefix))
        .and_then(|rest| rest.strip_suffix('>'))
    {
        current = inner;
        unwrapped = true;
    }
    if !unwrapped {
        return None;
    }
    let base = current.split_once('<').map_or(current, |(base, _)| base);
    Some(base.rsplit("::").next().unwrap_or(base))
}

/// The first named shape inside array items and nullable unions.
fn named_leaf(schema: &mut RefOr<Schema>) -> Option<&mut RefOr<Schema>> {
    if has_null_branch(schema) || matches!(schema, RefOr::T(Schema::Array(_))) {
        return match schema {
            RefOr::T(Schema::Array(array)) => match &mut array.items {
                ArrayItems::RefOrSchema(items) => named_leaf(items),
                _ => None,
            },
            RefOr::T(Schema::OneOf(one_of)) => non_null_leaf(&mut one_of.items),
            RefOr::T(Schema::AnyOf(any_of)) => non_null_leaf(&mut any_of.items),
            _ => None,
        };
    }
    is_named_shape(schema).then_some(schema)
}

fn non_null_leaf(items: &mut [RefOr<Schema>]) -> Option<&mut RefOr<Schema>> {
    items
        .iter_mut()
        .find(|item| !is_null(item))
        .and_then(named_leaf)
}

fn has_null_branch(schema: &RefOr<Schema>) -> bool {
    match schema {
        RefOr::T(Schema::OneOf(one_of)) => one_of.items.iter().any(is_null),
        RefOr::T(Schema::AnyOf(any_of)) => any_of.items.iter().any(is_null),
        _ => false,
    }
}

fn is_null(schema: &RefOr<Schema>) -> bool {
    matches!(
        schema,
        RefOr::T(Schema::Object(object)) if object.schema_type == SchemaType::Type(Type::Null)
    )
}

/// Removes `null` from an object's type list; `true` if it was there.
fn strip_null(schema: &mut RefOr<Schema>) -> bool {
    let RefOr::T(Schema::Object(object)) = schema else {
        return false;
    };
    let SchemaType::Array(types) = &mut object.schema_type else {
        return false;
    };
    if !types.contains(&Type::Null) {
        return false;
    }
    types.retain(|t| *t != Type::Null);
    let single = match types.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    };
    if let Some(only) = single {
        object.schema_type = SchemaType::Type(only);
    }
    true
}

/// Reference to a named definition, optionally unioned with `null`.
fn reference(name: &str, nullable: bool) -> RefOr<Schema> {
    let reference = Ref::from_schema_name(name);
    if !nullable {
        return RefOr::Ref(reference);
    }
    let null = Schema::Object(ObjectBuilder::new().schema_type(Type::Null).build());
    RefOr::T(Schema::OneOf(
        OneOfBuilder::new()
            .item(RefOr::Ref(reference))
            .item(RefOr::T(null))
            .build(),
    ))
}

/// Infers the MIME type of a payload from its serialized schema.
#[must_use]
pub fn infer_content_type(schema: &RefOr<Schema>) -> &'static str {
    let Ok(value) = serde_json::to_value(schema) else {
        return JSON_CONTENT_TYPE;
    };
    let kind = value.get("type").and_then(serde_json::Value::as_str);
    let format = value.get("format").and_then(serde_json::Value::as_str);
    match (kind, format) {
        (Some("string"), Some("binary")) => BINARY_CONTENT_TYPE,
        (Some("string"), _) => TEXT_CONTENT_TYPE,
        _ => JSON_CONTENT_TYPE,
    }
}

/// Renames every `#/components/schemas/` reference reachable from `schema`.
fn rewrite_refs(schema: &mut RefOr<Schema>, rename: &dyn Fn(&str) -> String) {
    match schema {
        RefOr::Ref(reference) => {
            if let Some(name) = reference.ref_location.strip_prefix(COMPONENT_PREFIX) {
                reference.ref_location = format!("{COMPONENT_PREFIX}{}", rename(name));
            }
        }
        RefOr::T(Schema::Object(object)) => {
            for property in object.properties.values_mut() {
                rewrite_refs(property, rename);
            }
            if let Some(additional) = object.additional_properties.as_deref_mut() {
                if let AdditionalProperties::RefOr(inner) = additional {
                    rewrite_refs(inner, rename);
                }
            }
        }
        RefOr::T(Schema::Array(array)) => {
            if let ArrayItems::RefOrSchema(items) = &mut array.items {
                rewrite_refs(items, rename);
            }
        }
        RefOr::T(Schema::OneOf(one_of)) => {
            for item in &mut one_of.items {
                rewrite_refs(item, rename);
            }
        }
        RefOr::T(Schema::AllOf(all_of)) => {
            for item in &mut all_of.items {
                rewrite_refs(item, rename);
            }
        }
        RefOr::T(Schema::AnyOf(any_of)) => {
            for item in &mut any_of.items {
                rewrite_refs(item, rename);
            }
        }
        RefOr::T(_) => {}
    }
}
