//! Type Graph Builder
//!
//! Maps resolved schemas to target types. Results are memoized per schema,
//! so a schema reached from several places maps to one class. A class is
//! registered before its supertype and fields are visited, which lets a
//! class contain fields of its own type.
//!
//! Object schemas that declare no fields of their own map through to the
//! single schema they wrap instead of producing an empty class. A two-entry
//! `allOf` of a usable base type and an anonymous object is read as
//! inheritance ("implicit extension").

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::constraints;
use super::defaults::{parse_default, DefaultLiteral};
use super::names::{self, ClassNamer};
use super::{Accessor, AccessorKind, ClassDef, ClassId, Field, Primitive, TargetType, TypeGraph};
use crate::config::{Feature, Settings};
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::error::Result;
use crate::schema::{AdditionalProperties, JsonType, ObjectSchema, Schema, SchemaArena, SchemaId, SchemaKind};

/// Builds a [`TypeGraph`] from the schemas of one run
pub struct TypeBuilder<'a> {
    arena: &'a SchemaArena,
    settings: &'a dyn Settings,
    graph: &'a mut TypeGraph,
    diagnostics: &'a mut Diagnostics,
    namer: ClassNamer,
    pending: HashSet<SchemaId>,
    /// Property names per class, known before its fields are built
    declared: HashMap<ClassId, HashSet<String>>,
    package: Option<String>,
    header: Option<String>,
}

impl<'a> TypeBuilder<'a> {
    pub fn new(
        arena: &'a SchemaArena,
        settings: &'a dyn Settings,
        graph: &'a mut TypeGraph,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        let mut namer = ClassNamer::new();
        for class in graph.classes() {
            namer.claim(&class.name);
        }
        Self {
            arena,
            settings,
            graph,
            diagnostics,
            namer,
            pending: HashSet::new(),
            declared: HashMap::new(),
            package: None,
            header: None,
        }
    }

    /// Map a root schema. Classes first reached from it get `package` and `header`.
    pub fn build_root(&mut self, root: SchemaId, package: &str, header: Option<&str>) -> Result<TargetType> {
        self.package = Some(package.to_string());
        self.header = header.map(String::from);
        let ty = self.resolve_type(root);
        self.package = None;
        self.header = None;
        ty
    }

    /// Target type of a schema, creating classes as needed
    ///
    /// Only an internal naming failure is an error; everything the schema
    /// itself gets wrong degrades to a permissive type with a diagnostic.
    pub fn resolve_type(&mut self, id: SchemaId) -> Result<TargetType> {
        if let Some(ty) = self.graph.type_of(id) {
            return Ok(ty.clone());
        }
        let arena = self.arena;
        let schema = arena.get(id);

        if self.pending.contains(&id) {
            self.diagnostics.report(
                schema.primary_uri(),
                DiagnosticCode::RecursiveType,
                "Type contains itself without an intermediate class; using an open type",
            );
            return Ok(TargetType::any());
        }

        self.pending.insert(id);
        let mapped = self.map_schema(schema);
        self.pending.remove(&id);
        let ty = mapped?;

        self.graph.record(id, ty.clone());
        for definition in schema.definitions.values() {
            self.resolve_type(*definition)?;
        }
        Ok(ty)
    }

    fn map_schema(&mut self, schema: &'a Schema) -> Result<TargetType> {
        if let Some(target) = schema.uris.iter().find_map(|u| self.settings.type_override(u)) {
            tracing::debug!(uri = %schema.primary_uri(), override_type = target, "Type override");
            return Ok(TargetType::Primitive(Primitive::from_override(target)));
        }

        Ok(match &schema.kind {
            SchemaKind::Boolean => TargetType::Primitive(Primitive::Boolean),
            SchemaKind::Integer(_) => TargetType::Primitive(Primitive::Integer),
            SchemaKind::Number(_) => TargetType::Primitive(Primitive::Number),
            SchemaKind::String(_) => TargetType::Primitive(Primitive::String),
            SchemaKind::Array(array) => {
                let element = match array.items {
                    Some(items) => self.resolve_type(items)?,
                    None => TargetType::any(),
                };
                TargetType::Collection {
                    element: Box::new(element),
                    unique: array.unique_items,
                }
            }
            SchemaKind::Object(object) => {
                let implicit = self.implicit_extension(schema);
                if implicit.is_none() && !object.declares_fields() {
                    if let Some(ty) = self.map_through(schema)? {
                        return Ok(ty);
                    }
                }
                TargetType::Class(self.create_class(schema, implicit)?)
            }
        })
    }

    /// `(base, extension)` when the schema is `allOf: [<usable base>, <anonymous object>]`
    fn implicit_extension(&self, schema: &Schema) -> Option<(SchemaId, SchemaId)> {
        let [base, extension] = schema.all_of.as_slice() else {
            return None;
        };
        let extension_schema = self.arena.get(*extension);
        let anonymous = extension_schema.reference.is_none()
            && extension_schema.declared_id.is_none()
            && !extension_schema.node.is_document_root()
            && extension_schema
                .as_object()
                .map(|o| !o.properties.is_empty())
                .unwrap_or(false);
        (anonymous && exposes_type(self.arena.get(*base))).then_some((*base, *extension))
    }

    /// Type of a field-less object schema, or `None` when it needs its own class
    fn map_through(&mut self, schema: &Schema) -> Result<Option<TargetType>> {
        if let Some(target) = schema.reference {
            return self.resolve_type(target).map(Some);
        }
        match schema.all_of.as_slice() {
            [single] if exposes_type(self.arena.get(*single)) => return self.resolve_type(*single).map(Some),
            [] | [_] => {}
            _ => return Ok(None),
        }

        let usable: Vec<SchemaId> = schema
            .any_of
            .iter()
            .chain(&schema.one_of)
            .copied()
            .filter(|a| exposes_type(self.arena.get(*a)))
            .collect();
        if let [single] = usable.as_slice() {
            return self.resolve_type(*single).map(Some);
        }
        // Several object alternatives get a class of their own
        if usable.len() > 1 && usable.iter().all(|a| describes_class(self.arena.get(*a))) {
            return Ok(None);
        }

        let alternatives: Vec<SchemaId> = schema
            .any_of
            .iter()
            .chain(&schema.one_of)
            .chain(&schema.all_of)
            .copied()
            .collect();

        let mut tags: Vec<JsonType> = schema.value_types().filter(|t| *t != JsonType::Object).collect();
        if tags.is_empty() {
            let values: Vec<Value> = schema
                .allowed_values()
                .into_iter()
                .chain(alternatives.iter().flat_map(|a| self.arena.get(*a).allowed_values()))
                .collect();
            tags.extend(value_tag(&values));
        }
        match tags.as_slice() {
            [single] => Ok(Some(primitive(*single))),
            [] if usable.len() < 2 => Ok(Some(TargetType::any())),
            _ => {
                let location = schema.primary_uri();
                if schema.has_composition() {
                    self.diagnostics.report(
                        location,
                        DiagnosticCode::CompositionAmbiguity,
                        format!(
                            "{} alternatives with different types; using an open type",
                            usable.len().max(tags.len())
                        ),
                    );
                }
                Ok(Some(TargetType::any()))
            }
        }
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn create_class(&mut self, schema: &'a Schema, implicit: Option<(SchemaId, SchemaId)>) -> Result<ClassId> {
        let derived = names::derive_class_name(
            schema.uris.iter().map(String::as_str),
            self.settings.vendor_prefixes(),
        )?;
        if !derived.competing.is_empty() {
            self.diagnostics.push(
                DiagnosticItem::new(
                    schema.primary_uri(),
                    DiagnosticCode::AmbiguousClassName,
                    format!("Several document URIs identify one class; naming it after '{}'", derived.source),
                )
                .with_context(derived.competing.join(", ")),
            );
        }

        let base_name = self
            .settings
            .class_name_override(&derived.name)
            .unwrap_or(derived.name.as_str())
            .to_string();
        let (name, collided) = self.namer.claim(&base_name);
        if collided {
            self.diagnostics.report(
                schema.primary_uri(),
                DiagnosticCode::ClassNameCollision,
                format!("Class name '{}' is taken; using '{}'", base_name, name),
            );
        }
        tracing::debug!(class = %name, uri = %schema.primary_uri(), "Creating class");

        let id = self.graph.add_class(ClassDef {
            id: ClassId(0),
            name: name.clone(),
            superclass: None,
            doc: schema.documentation(),
            fields: Vec::new(),
            schema: schema.id,
            uris: schema.uris.iter().cloned().collect(),
            package: self.package.clone(),
            header: self.header.clone(),
        });
        // Registered before recursing so self-referencing fields find the class
        self.graph.record(schema.id, TargetType::Class(id));

        let mut sources = vec![schema.id];
        let base = match implicit {
            Some((base, extension)) => {
                sources.push(extension);
                Some(base)
            }
            None => self.single_base(schema),
        };
        if implicit.is_none() && schema.all_of.len() > 1 {
            sources.extend(schema.all_of.iter().copied());
        }
        // Subclasses reached while this class is still in progress check against these
        self.declared.insert(id, property_names(self.arena, &sources));
        if base.is_none() && schema.has_composition() {
            self.diagnostics.report(
                schema.primary_uri(),
                DiagnosticCode::NotInheritable,
                format!("Composition cannot be expressed as a supertype; flattening fields into '{}'", name),
            );
        }

        if let Some(base) = base {
            match self.resolve_type(base)? {
                TargetType::Class(parent) if parent == id || self.graph.ancestors(parent).contains(&id) => {
                    self.diagnostics.report(
                        schema.primary_uri(),
                        DiagnosticCode::InheritanceCycle,
                        format!("Supertype chain of '{}' leads back to it; dropping the supertype", name),
                    );
                }
                TargetType::Class(parent) => self.graph.class_mut(id).superclass = Some(parent),
                other => {
                    let shown = other.display(self.graph);
                    self.diagnostics.report(
                        schema.primary_uri(),
                        DiagnosticCode::NotInheritable,
                        format!("Base type {} is not a class; flattening its fields into '{}'", shown, name),
                    );
                    sources.push(base);
                    self.declared.insert(id, property_names(self.arena, &sources));
                }
            }
        }

        let fields = self.build_fields(id, &name, &sources)?;
        self.graph.class_mut(id).fields = fields;

        // Alternatives are not merged into this class but still map to their own types
        for alternative in schema.any_of.iter().chain(&schema.one_of) {
            self.resolve_type(*alternative)?;
        }
        Ok(id)
    }

    /// Supertype from a reference next to own fields, or a single composition entry
    fn single_base(&self, schema: &Schema) -> Option<SchemaId> {
        if schema.reference.is_some() {
            return schema.reference;
        }
        match (schema.all_of.as_slice(), schema.any_of.as_slice(), schema.one_of.as_slice()) {
            ([single], [], []) | ([], [single], []) | ([], [], [single]) => Some(*single),
            _ => None,
        }
    }

    fn build_fields(&mut self, class: ClassId, class_name: &str, sources: &[SchemaId]) -> Result<Vec<Field>> {
        let arena = self.arena;
        let objects = flatten_objects(arena, sources);

        let required: HashSet<&str> = objects
            .iter()
            .flat_map(|o| o.required.iter().map(String::as_str))
            .collect();
        let superclass = self.graph.class(class).superclass;

        let mut fields: Vec<Field> = Vec::new();
        let properties = objects.iter().flat_map(|o| o.properties.iter());
        let additional = objects.iter().filter_map(|o| match o.additional_properties {
            AdditionalProperties::Schema(values) => Some(values),
            _ => None,
        });

        let mut declared: Vec<(String, SchemaId, bool)> = properties
            .map(|(name, id)| (name.clone(), *id, false))
            .collect();
        declared.extend(additional.map(|values| ("additionalProperties".to_string(), values, true)));

        for (name, property, is_map) in declared {
            if let Some(owner) = self.declaring_ancestor(superclass, &name) {
                self.diagnostics.report(
                    arena.get(property).primary_uri(),
                    DiagnosticCode::FieldShadowed,
                    format!(
                        "'{}.{}' is already declared by '{}'; skipping it",
                        class_name,
                        name,
                        self.graph.class(owner).name
                    ),
                );
                continue;
            }

            let field = if is_map {
                self.map_field(class_name, &name, property)?
            } else {
                self.property_field(class_name, &name, property, required.contains(name.as_str()))?
            };

            match fields.iter().position(|f| f.name == field.name) {
                Some(index) => {
                    self.diagnostics.report(
                        arena.get(property).primary_uri(),
                        DiagnosticCode::FieldRedeclared,
                        format!("'{}.{}' is declared more than once; the later declaration wins", class_name, name),
                    );
                    fields[index] = field;
                }
                None => fields.push(field),
            }
        }
        Ok(fields)
    }

    /// Nearest ancestor declaring `name`, whether or not its fields are built yet
    fn declaring_ancestor(&self, superclass: Option<ClassId>, name: &str) -> Option<ClassId> {
        let parent = superclass?;
        std::iter::once(parent).chain(self.graph.ancestors(parent)).find(|c| {
            self.declared.get(c).is_some_and(|names| names.contains(name))
                || self.graph.class(*c).field(name).is_some()
        })
    }

    fn property_field(&mut self, class_name: &str, name: &str, property: SchemaId, required: bool) -> Result<Field> {
        let ty = self.resolve_type(property)?;
        let arena = self.arena;
        let schema = arena.get(property);

        let default = match &schema.default {
            Some(text) => self.default_literal(schema, text, &ty),
            None => None,
        };
        let accessors = self.accessors(name, &ty, default.is_some());

        Ok(Field {
            name: name.to_string(),
            ty,
            required,
            schema: property,
            doc: schema.documentation(),
            default,
            constraints: constraints::derive(arena, property, required),
            validation_suppressed: self.settings.validation_suppressed(class_name, name),
            accessors,
        })
    }

    /// Synthetic map field for `additionalProperties`
    fn map_field(&mut self, class_name: &str, name: &str, values: SchemaId) -> Result<Field> {
        let ty = TargetType::Map(Box::new(self.resolve_type(values)?));
        let accessors = self.accessors(name, &ty, false);
        Ok(Field {
            name: name.to_string(),
            ty,
            required: false,
            schema: values,
            doc: self.arena.get(values).documentation(),
            default: None,
            constraints: Vec::new(),
            validation_suppressed: self.settings.validation_suppressed(class_name, name),
            accessors,
        })
    }

    fn default_literal(&mut self, schema: &Schema, text: &str, ty: &TargetType) -> Option<DefaultLiteral> {
        match parse_default(text, ty) {
            Ok(literal) => Some(literal),
            Err(reason) => {
                self.diagnostics.push(
                    DiagnosticItem::new(
                        schema.primary_uri(),
                        DiagnosticCode::UnparsableDefault,
                        format!("Default '{}' ignored", text),
                    )
                    .with_context(reason),
                );
                None
            }
        }
    }

    fn accessors(&self, field: &str, ty: &TargetType, has_default: bool) -> Vec<Accessor> {
        let accessor = |kind, prefix: &str, element: Option<TargetType>, keyed| Accessor {
            kind,
            name: names::accessor_name(prefix, field),
            element,
            keyed,
        };

        let mut accessors = vec![
            accessor(AccessorKind::Getter, "get", None, false),
            accessor(AccessorKind::Setter, "set", None, false),
        ];
        if self.settings.feature(Feature::BulkAccessors) {
            let bulk = match ty {
                TargetType::Collection { element, .. } => Some(((**element).clone(), false)),
                TargetType::Map(value) => Some(((**value).clone(), true)),
                _ => None,
            };
            if let Some((element, keyed)) = bulk {
                accessors.push(accessor(AccessorKind::Add, "add", Some(element.clone()), keyed));
                accessors.push(accessor(AccessorKind::Remove, "remove", Some(element), keyed));
            }
        }
        if has_default && self.settings.feature(Feature::DefaultValueAccessor) {
            accessors.push(accessor(AccessorKind::Default, "default", None, false));
        }
        accessors
    }
}

/// Whether a schema says anything about the type of its values
fn exposes_type(schema: &Schema) -> bool {
    !schema.types.is_empty()
        || schema.reference.is_some()
        || !schema.all_of.is_empty()
        || schema.as_object().map(ObjectSchema::declares_fields).unwrap_or(false)
}

/// An object schema with fields of its own or inherited through `allOf`/`$ref`
fn describes_class(schema: &Schema) -> bool {
    schema.as_object().is_some_and(|o| {
        o.declares_fields() || !schema.all_of.is_empty() || schema.reference.is_some()
    })
}

fn primitive(tag: JsonType) -> TargetType {
    match tag {
        JsonType::Boolean => TargetType::Primitive(Primitive::Boolean),
        JsonType::Integer => TargetType::Primitive(Primitive::Integer),
        JsonType::Number => TargetType::Primitive(Primitive::Number),
        JsonType::String => TargetType::Primitive(Primitive::String),
        JsonType::Array => TargetType::Collection {
            element: Box::new(TargetType::any()),
            unique: false,
        },
        JsonType::Object | JsonType::Null => TargetType::any(),
    }
}

/// The one JSON type shared by every enumerated value
fn value_tag(values: &[Value]) -> Option<JsonType> {
    let mut tags = values.iter().map(|v| match v {
        Value::Bool(_) => Some(JsonType::Boolean),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(JsonType::Integer),
        Value::Number(_) => Some(JsonType::Number),
        Value::String(_) => Some(JsonType::String),
        _ => None,
    });
    let first = tags.next()??;
    tags.all(|t| t == Some(first)).then_some(first)
}

/// Names of the fields the sources produce, including the synthetic map field
fn property_names(arena: &SchemaArena, sources: &[SchemaId]) -> HashSet<String> {
    let mut names = HashSet::new();
    for object in flatten_objects(arena, sources) {
        names.extend(object.properties.keys().cloned());
        if matches!(object.additional_properties, AdditionalProperties::Schema(_)) {
            names.insert("additionalProperties".to_string());
        }
    }
    names
}

/// Object attributes of the sources plus everything they pull in through
/// `allOf` and `$ref`, in declaration order
fn flatten_objects<'s>(arena: &'s SchemaArena, sources: &[SchemaId]) -> Vec<&'s ObjectSchema> {
    let mut seen = HashSet::new();
    let mut objects = Vec::new();
    let mut stack: Vec<SchemaId> = sources.iter().rev().copied().collect();
    let mut first = true;

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let schema = arena.get(id);
        if let Some(object) = schema.as_object() {
            objects.push(object);
        }
        // The class schema's own composition was already turned into a supertype or sources
        if first {
            first = false;
            continue;
        }
        stack.extend(schema.all_of.iter().rev().copied());
        stack.extend(schema.reference);
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompiledSettings, GeneratorConfig, TypeOverride};
    use crate::repository::{MemoryLoader, NodeRepository};
    use crate::schema::SchemaBuilder;
    use crate::types::Constraint;
    use serde_json::json;

    struct Run {
        graph: TypeGraph,
        diagnostics: Diagnostics,
        root: TargetType,
    }

    fn run_with(docs: &[(&str, Value)], config: &GeneratorConfig) -> Run {
        let mut loader = MemoryLoader::new();
        for (location, doc) in docs {
            loader.insert(location, doc.clone()).unwrap();
        }
        let mut repo = NodeRepository::new(Box::new(loader));
        let mut arena = SchemaArena::new();
        let mut diagnostics = Diagnostics::new();
        let root_id = SchemaBuilder::new(&mut repo, &mut arena, &mut diagnostics, None)
            .resolve_root(docs[0].0)
            .unwrap();

        let settings = CompiledSettings::from_config(config).unwrap();
        let mut graph = TypeGraph::new();
        let root = TypeBuilder::new(&arena, &settings, &mut graph, &mut diagnostics)
            .build_root(root_id, "test.model", Some("// header"))
            .unwrap();
        Run { graph, diagnostics, root }
    }

    fn run(docs: &[(&str, Value)]) -> Run {
        run_with(docs, &GeneratorConfig::default())
    }

    fn class<'g>(graph: &'g TypeGraph, name: &str) -> &'g ClassDef {
        graph
            .class_by_name(name)
            .unwrap_or_else(|| panic!("Expected class {}, got {:?}", name, graph.classes().iter().map(|c| &c.name).collect::<Vec<_>>()))
    }

    #[test]
    fn test_implicit_extension() {
        let r = run(&[
            (
                "file:///t/derived.json",
                json!({"allOf": [{"$ref": "base.json"}, {"properties": {"x": {"type": "integer"}}}]}),
            ),
            ("file:///t/base.json", json!({"type": "object", "properties": {"name": {"type": "string"}}})),
        ]);
        let derived = class(&r.graph, "Derived");
        let base = class(&r.graph, "Base");
        assert_eq!(derived.superclass, Some(base.id));
        assert_eq!(derived.fields.len(), 1);
        assert_eq!(derived.fields[0].name, "x");
        assert_eq!(derived.fields[0].ty, TargetType::Primitive(Primitive::Integer));
        assert_eq!(r.root, TargetType::Class(derived.id));
        assert!(!r.diagnostics.has(DiagnosticCode::NotInheritable));
    }

    #[test]
    fn test_single_all_of_maps_through() {
        let r = run(&[
            (
                "file:///t/root.json",
                json!({"type": "object", "properties": {
                    "node": {"allOf": [{"$ref": "node.json"}], "description": "The node"}
                }}),
            ),
            ("file:///t/node.json", json!({"type": "object", "properties": {"id": {"type": "integer"}}})),
        ]);
        let root = class(&r.graph, "Root");
        let node = class(&r.graph, "Node");
        assert_eq!(root.fields[0].ty, TargetType::Class(node.id));
        assert_eq!(root.fields[0].doc.as_deref(), Some("The node"));
        assert_eq!(r.graph.classes().len(), 2);
    }

    #[test]
    fn test_reference_equivalent_uris_map_to_one_class() {
        let r = run(&[
            (
                "file:///t/root.json",
                json!({
                    "type": "object",
                    "properties": {"a": {"$ref": "#/definitions/Foo"}, "b": {"$ref": "b.json"}},
                    "definitions": {"Foo": {"$ref": "b.json"}}
                }),
            ),
            ("file:///t/b.json", json!({"type": "object", "properties": {"v": {"type": "number"}}})),
        ]);
        let root = class(&r.graph, "Root");
        assert_eq!(root.fields[0].ty, root.fields[1].ty);
        let b = class(&r.graph, "B");
        assert!(b.uris.contains("file:///t/root.json#/definitions/Foo"));
        assert_eq!(r.graph.classes().len(), 2);
    }

    #[test]
    fn test_self_referencing_class() {
        let r = run(&[(
            "file:///t/node.json",
            json!({"type": "object", "properties": {
                "children": {"type": "array", "items": {"$ref": "#"}},
                "parent": {"$ref": "#"}
            }}),
        )]);
        let node = class(&r.graph, "Node");
        assert_eq!(node.field("parent").unwrap().ty, TargetType::Class(node.id));
        assert_eq!(
            node.field("children").unwrap().ty,
            TargetType::Collection { element: Box::new(TargetType::Class(node.id)), unique: false }
        );
    }

    #[test]
    fn test_enum_from_any_of_is_integer() {
        let r = run(&[(
            "file:///t/accessor.json",
            json!({"type": "object", "required": ["componentType"], "properties": {
                "componentType": {"anyOf": [{"enum": [5120]}, {"enum": [5121]}, {"type": "integer"}]}
            }}),
        )]);
        let field = class(&r.graph, "Accessor").field("componentType").unwrap().clone();
        assert_eq!(field.ty, TargetType::Primitive(Primitive::Integer));
        assert!(field.required);
        assert!(field.constraints.contains(&Constraint::ValidValues {
            values: vec![json!(5120), json!(5121)],
            open: true,
        }));
    }

    #[test]
    fn test_non_inheritable_composition_is_flattened() {
        let r = run(&[
            (
                "file:///t/mixed.json",
                json!({"allOf": [{"$ref": "a.json"}, {"$ref": "b.json"}, {"properties": {"c": {"type": "boolean"}}}]}),
            ),
            ("file:///t/a.json", json!({"properties": {"a": {"type": "string"}}})),
            ("file:///t/b.json", json!({"properties": {"b": {"type": "string"}}})),
        ]);
        let mixed = class(&r.graph, "Mixed");
        assert_eq!(mixed.superclass, None);
        let names: Vec<&str> = mixed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(r.diagnostics.has(DiagnosticCode::NotInheritable));
    }

    #[test]
    fn test_inherited_property_is_not_shadowed() {
        let r = run(&[
            (
                "file:///t/derived.json",
                json!({"allOf": [{"$ref": "base.json"}, {"properties": {
                    "name": {"type": "integer"}, "extra": {"type": "string"}
                }}]}),
            ),
            ("file:///t/base.json", json!({"properties": {"name": {"type": "string"}}})),
        ]);
        let derived = class(&r.graph, "Derived");
        assert_eq!(derived.fields.len(), 1);
        assert_eq!(derived.fields[0].name, "extra");
        assert!(r.diagnostics.has(DiagnosticCode::FieldShadowed));
    }

    #[test]
    fn test_base_in_progress_still_hides_inherited_property() {
        // The base is the root, so the subclass is built while the base's fields are not
        let r = run(&[
            (
                "file:///t/base.json",
                json!({"type": "object", "properties": {
                    "name": {"type": "string"},
                    "child": {"$ref": "derived.json"}
                }}),
            ),
            (
                "file:///t/derived.json",
                json!({"allOf": [{"$ref": "base.json"}, {"properties": {
                    "name": {"type": "integer"}, "extra": {"type": "string"}
                }}]}),
            ),
        ]);
        let base = class(&r.graph, "Base");
        let derived = class(&r.graph, "Derived");
        assert_eq!(derived.superclass, Some(base.id));
        let names: Vec<&str> = derived.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["extra"]);
        assert_eq!(base.field("child").unwrap().ty, TargetType::Class(derived.id));
        assert!(r.diagnostics.has(DiagnosticCode::FieldShadowed));
    }

    #[test]
    fn test_additional_properties_become_map_field() {
        let r = run(&[(
            "file:///t/extension.json",
            json!({"type": "object", "additionalProperties": {"type": "object"}}),
        )]);
        let field = class(&r.graph, "Extension").field("additionalProperties").unwrap().clone();
        assert_eq!(field.ty, TargetType::Map(Box::new(TargetType::any())));
    }

    #[test]
    fn test_empty_object_maps_to_any() {
        let r = run(&[(
            "file:///t/root.json",
            json!({"type": "object", "properties": {"extras": {"type": "object", "description": "Anything"}}}),
        )]);
        assert_eq!(class(&r.graph, "Root").fields[0].ty, TargetType::any());
        assert_eq!(r.graph.classes().len(), 1);
    }

    #[test]
    fn test_ambiguous_any_of_is_open() {
        let r = run(&[(
            "file:///t/root.json",
            json!({"type": "object", "properties": {
                "either": {"anyOf": [{"type": "string"}, {"type": "integer"}]}
            }}),
        )]);
        assert_eq!(class(&r.graph, "Root").fields[0].ty, TargetType::any());
        assert!(r.diagnostics.has(DiagnosticCode::CompositionAmbiguity));
    }

    #[test]
    fn test_object_alternatives_get_a_class() {
        let r = run(&[
            (
                "file:///t/root.json",
                json!({"type": "object", "properties": {
                    "target": {"anyOf": [{"$ref": "a.json"}, {"$ref": "b.json"}]}
                }}),
            ),
            ("file:///t/a.json", json!({"type": "object", "properties": {"a": {"type": "string"}}})),
            ("file:///t/b.json", json!({"type": "object", "properties": {"b": {"type": "integer"}}})),
        ]);
        let target = &class(&r.graph, "Root").fields[0];
        let holder = target.ty.as_class().map(|id| r.graph.class(id)).unwrap();
        assert_eq!(holder.superclass, None);
        assert!(r.graph.class_by_name("A").is_some());
        assert!(r.graph.class_by_name("B").is_some());
        assert_eq!(r.graph.classes().len(), 4);
        assert!(r.diagnostics.has(DiagnosticCode::NotInheritable));
        assert!(!r.diagnostics.has(DiagnosticCode::CompositionAmbiguity));
    }

    #[test]
    fn test_single_all_of_without_type_information() {
        let r = run(&[
            (
                "file:///t/root.json",
                json!({"type": "object", "properties": {
                    "level": {"allOf": [{"enum": [1, 2, 3]}]},
                    "note": {"allOf": [{"description": "Free text"}]},
                    "target": {"allOf": [{"description": "Picked below"}], "anyOf": [{"$ref": "a.json"}]}
                }}),
            ),
            ("file:///t/a.json", json!({"type": "object", "properties": {"a": {"type": "string"}}})),
        ]);
        let root = class(&r.graph, "Root");
        assert_eq!(root.field("level").unwrap().ty, TargetType::Primitive(Primitive::Integer));
        assert_eq!(root.field("note").unwrap().ty, TargetType::any());
        let a = class(&r.graph, "A");
        assert_eq!(root.field("target").unwrap().ty, TargetType::Class(a.id));
        assert_eq!(r.graph.classes().len(), 2);
    }

    #[test]
    fn test_definitions_become_classes() {
        let r = run(&[(
            "file:///t/defs.json",
            json!({"definitions": {
                "color_rgb": {"type": "object", "properties": {"r": {"type": "number"}}},
                "unused": {"type": "object", "properties": {"u": {"type": "string"}}}
            }}),
        )]);
        assert!(r.graph.class_by_name("ColorRgb").is_some());
        assert!(r.graph.class_by_name("Unused").is_some());
        assert_eq!(r.root, TargetType::any());
    }

    #[test]
    fn test_recursive_array_is_open() {
        let r = run(&[(
            "file:///t/root.json",
            json!({"type": "object", "properties": {"nested": {"$ref": "#/definitions/list"}},
                   "definitions": {"list": {"type": "array", "items": {"$ref": "#/definitions/list"}}}}),
        )]);
        assert!(r.diagnostics.has(DiagnosticCode::RecursiveType));
        assert_eq!(
            class(&r.graph, "Root").fields[0].ty,
            TargetType::Collection { element: Box::new(TargetType::any()), unique: false }
        );
    }

    #[test]
    fn test_inheritance_cycle_is_broken() {
        let r = run(&[
            ("file:///t/a.json", json!({"$ref": "b.json", "properties": {"a": {"type": "string"}}})),
            ("file:///t/b.json", json!({"$ref": "a.json", "properties": {"b": {"type": "string"}}})),
        ]);
        assert!(r.diagnostics.has(DiagnosticCode::InheritanceCycle));
        let a = class(&r.graph, "A");
        let b = class(&r.graph, "B");
        assert_eq!(b.superclass, Some(a.id));
        assert_eq!(a.superclass, None);
    }

    #[test]
    fn test_defaults_and_accessors() {
        let mut config = GeneratorConfig::default();
        config.features.bulk_accessors = true;
        config.features.default_value_accessor = true;
        let r = run_with(
            &[(
                "file:///t/sampler.json",
                json!({"type": "object", "properties": {
                    "wrapS": {"type": "integer", "default": 10497},
                    "scale": {"type": "array", "items": {"type": "number"}, "default": [1.0, 1.0]},
                    "flag": {"type": "boolean", "default": "sometimes"},
                    "extensions": {"type": "object", "additionalProperties": {"type": "object"}}
                }}),
            )],
            &config,
        );
        let sampler = class(&r.graph, "Sampler");

        let wrap = sampler.field("wrapS").unwrap();
        assert_eq!(wrap.default, Some(DefaultLiteral::Integer(10497)));
        let kinds: Vec<&str> = wrap.accessors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(kinds, vec!["getWrapS", "setWrapS", "defaultWrapS"]);

        let scale = sampler.field("scale").unwrap();
        assert!(scale.accessors.iter().any(|a| a.kind == AccessorKind::Add && a.name == "addScale"));

        assert_eq!(sampler.field("flag").unwrap().default, None);
        assert!(r.diagnostics.has(DiagnosticCode::UnparsableDefault));

        let extensions = r.graph.class_by_name("SamplerExtensions").unwrap();
        let map = extensions.field("additionalProperties").unwrap();
        assert!(map.accessors.iter().any(|a| a.kind == AccessorKind::Remove && a.keyed));
        assert_eq!(sampler.package.as_deref(), Some("test.model"));
        assert_eq!(sampler.header.as_deref(), Some("// header"));
    }

    #[test]
    fn test_overrides_and_suppression() {
        let mut config = GeneratorConfig::default();
        config.type_overrides.push(TypeOverride {
            pattern: r"glTFid\.schema\.json$".to_string(),
            target: "integer".to_string(),
        });
        config.naming.class_names.insert("GlTF".to_string(), "GlTFRoot".to_string());
        config.suppress_validation.insert("GlTFRoot.scene".to_string());
        let r = run_with(
            &[
                (
                    "file:///t/glTF.schema.json",
                    json!({"type": "object", "required": ["scene"], "properties": {
                        "scene": {"$ref": "glTFid.schema.json"}
                    }}),
                ),
                ("file:///t/glTFid.schema.json", json!({"type": "object", "properties": {"x": {}}})),
            ],
            &config,
        );
        let root = class(&r.graph, "GlTFRoot");
        let scene = root.field("scene").unwrap();
        assert_eq!(scene.ty, TargetType::Primitive(Primitive::Integer));
        assert!(scene.validation_lines().is_empty());
        assert!(!scene.constraints.is_empty());
    }

    #[test]
    fn test_name_collision_gets_suffix() {
        let r = run(&[
            (
                "file:///t/one/node.json",
                json!({"type": "object", "properties": {"other": {"$ref": "../two/node.json"}, "v": {"type": "string"}}}),
            ),
            ("file:///t/two/node.json", json!({"type": "object", "properties": {"w": {"type": "string"}}})),
        ]);
        assert!(r.graph.class_by_name("Node").is_some());
        assert!(r.graph.class_by_name("Node2").is_some());
        assert!(r.diagnostics.has(DiagnosticCode::ClassNameCollision));
    }
}
