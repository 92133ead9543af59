//! Schema Model Builder
//!
//! Walks the node graph depth-first and produces exactly one [`Schema`] per
//! node. A placeholder is registered for a node before any of its
//! sub-schemas are visited, so a schema that reaches itself (directly or
//! through a chain) observes the placeholder instead of recursing again.
//!
//! Nodes consisting of nothing but `$ref` are aliases: they are bound to the
//! target's schema rather than getting their own.

use serde_json::{Map, Number, Value};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::dialect::{Dialect, Draft};
use super::{
    AdditionalProperties, ArraySchema, JsonType, NumericSchema, ObjectSchema, Schema, SchemaArena,
    SchemaId, SchemaKind, StringSchema,
};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::{GenError, Result};
use crate::repository::{DocId, NodeKey, NodeRepository};
use crate::uri;

/// Resolution state is `pending` while a schema's sub-schemas are visited
pub struct SchemaBuilder<'a> {
    repo: &'a mut NodeRepository,
    arena: &'a mut SchemaArena,
    diagnostics: &'a mut Diagnostics,
    draft: Option<Draft>,
    dialects: HashMap<DocId, &'static Dialect>,
    pending: HashSet<SchemaId>,
    alias_chain: Vec<NodeKey>,
}

impl<'a> SchemaBuilder<'a> {
    /// `draft` fixes the dialect; `None` detects it per document from `$schema`
    pub fn new(
        repo: &'a mut NodeRepository,
        arena: &'a mut SchemaArena,
        diagnostics: &'a mut Diagnostics,
        draft: Option<Draft>,
    ) -> Self {
        Self {
            repo,
            arena,
            diagnostics,
            draft,
            dialects: HashMap::new(),
            pending: HashSet::new(),
            alias_chain: Vec::new(),
        }
    }

    /// Load a declared root document and build its schema. Load failures are fatal.
    pub fn resolve_root(&mut self, location: &str) -> Result<SchemaId> {
        let key = self.repo.add_root(location)?;
        let id = self.resolve_node(key);
        self.arena.mark_root(id);
        Ok(id)
    }

    /// Build the schema at `location`, or `None` (with a diagnostic) when it cannot be reached
    pub fn resolve(&mut self, location: &str) -> Option<SchemaId> {
        match self.repo.resolve(location) {
            Ok(key) => Some(self.resolve_node(key)),
            Err(e) => {
                self.report_missing(location, location, &e);
                None
            }
        }
    }

    /// Build (or look up) the schema of a node that is known to exist
    pub fn resolve_node(&mut self, key: NodeKey) -> SchemaId {
        let surface = self.repo.url_of(&key).to_string();

        if let Some(id) = self.arena.lookup(&key) {
            if self.pending.contains(&id) {
                tracing::debug!(uri = %surface, "Cycle reached a pending schema");
            }
            self.arena.get_mut(id).uris.insert(surface);
            return id;
        }

        let node = self.repo.node(&key).clone();

        if let Some(reference) = pure_reference(&node) {
            return self.resolve_alias(key, surface, reference);
        }

        let id = self.arena.alloc(key.clone(), surface.clone());
        self.pending.insert(id);
        tracing::debug!(uri = %surface, "Resolving schema");

        let schema = self.build(id, &key, &surface, &node);
        self.arena.fill(id, schema);
        self.pending.remove(&id);
        id
    }

    fn resolve_alias(&mut self, key: NodeKey, surface: String, reference: &str) -> SchemaId {
        if self.alias_chain.contains(&key) {
            self.diagnostics.report(
                surface.clone(),
                DiagnosticCode::RecursiveType,
                "Reference chain leads back to itself; treating it as an open schema",
            );
            return self.arena.alloc(key, surface);
        }

        self.alias_chain.push(key.clone());
        let target = self.resolve_reference(&key, &surface, reference);
        self.alias_chain.pop();

        // A looping chain allocated this node while we were away
        if let Some(id) = self.arena.lookup(&key) {
            self.arena.get_mut(id).uris.insert(surface);
            return id;
        }

        match target {
            Some(id) => {
                self.arena.bind(key, id);
                self.arena.get_mut(id).uris.insert(surface);
                id
            }
            None => self.arena.alloc(key, surface),
        }
    }

    /// Follow a `$ref` found at `from`, recording the canonical mapping
    fn resolve_reference(&mut self, from: &NodeKey, surface: &str, reference: &str) -> Option<SchemaId> {
        let base = self.repo.url_of(from);
        let target_url = match uri::join(&base, reference) {
            Ok(url) => url,
            Err(e) => {
                self.report_missing(surface, reference, &e);
                return None;
            }
        };

        let resolved = match self.repo.resolve_url(&target_url) {
            // Relative document references may live under another search location
            Err(e) if e.is_missing_node() && !reference.starts_with('#') => {
                self.repo.resolve(reference).map_err(|_| e)
            }
            other => other,
        };

        match resolved {
            Ok(target) => {
                let canonical = self.repo.url_of(&target).to_string();
                self.repo.record_canonical(surface, &canonical);
                Some(self.resolve_node(target))
            }
            Err(e) => {
                self.report_missing(surface, reference, &e);
                None
            }
        }
    }

    fn report_missing(&mut self, location: &str, target: &str, error: &GenError) {
        let code = match error {
            GenError::Fragment { .. } => DiagnosticCode::FragmentNotFound,
            GenError::InvalidUri(_) => DiagnosticCode::InvalidReference,
            _ => DiagnosticCode::LoadFailed,
        };
        self.diagnostics.unresolved_ref(location, target, code, &error.to_string());
    }

    fn dialect_for(&mut self, doc: DocId) -> &'static Dialect {
        if let Some(draft) = self.draft {
            return draft.dialect();
        }
        if let Some(dialect) = self.dialects.get(&doc).copied() {
            return dialect;
        }
        let dialect = self
            .repo
            .document(doc)
            .get("$schema")
            .and_then(Value::as_str)
            .and_then(Draft::detect)
            .unwrap_or_default()
            .dialect();
        self.dialects.insert(doc, dialect);
        dialect
    }

    // =========================================================================
    // Schema construction
    // =========================================================================

    fn build(&mut self, id: SchemaId, key: &NodeKey, surface: &str, node: &Value) -> Schema {
        let mut schema = Schema::open(id, key.clone(), surface.to_string());
        let obj = match node {
            Value::Object(obj) => obj,
            // Boolean schemas and stray scalars admit anything
            _ => return schema,
        };

        let dialect = self.dialect_for(key.doc);
        for keyword in dialect.unsupported_keywords {
            if obj.contains_key(*keyword) {
                self.diagnostics.unsupported_keyword(surface, keyword);
            }
        }

        // Composition first: its tags can decide the variant
        schema.all_of = self.resolve_list(key, obj, "allOf");
        if let Some(extends) = dialect.extends_keyword {
            let extended = match obj.get(extends) {
                Some(Value::Object(_)) => vec![self.resolve_node(key.child(extends))],
                _ => self.resolve_list(key, obj, extends),
            };
            schema.all_of.extend(extended);
        }
        schema.any_of = self.resolve_list(key, obj, "anyOf");
        schema.one_of = self.resolve_list(key, obj, "oneOf");
        if matches!(obj.get("not"), Some(Value::Object(_)) | Some(Value::Bool(_))) {
            schema.not = Some(self.resolve_node(key.child("not")));
        }
        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            schema.reference = self.resolve_reference(key, surface, reference);
        }

        schema.types = self.derive_types(surface, obj, dialect, &schema);
        schema.kind = self.build_kind(key, surface, obj, dialect, &schema.types);

        schema.declared_id = string_field(obj, dialect.id_keyword);
        schema.title = string_field(obj, "title");
        schema.description = string_field(obj, "description");
        schema.format = string_field(obj, "format");
        schema.default = obj.get("default").map(default_string);
        if let Some(Value::Array(values)) = obj.get("enum") {
            schema.enum_values = values.clone();
        }
        schema.const_value = obj.get("const").cloned();

        for keyword in dialect.definitions_keywords {
            if let Some(Value::Object(definitions)) = obj.get(*keyword) {
                let container = key.child(keyword);
                for name in definitions.keys() {
                    let def = self.resolve_node(container.child(name));
                    schema.definitions.insert(name.clone(), def);
                }
            }
        }

        schema
    }

    fn derive_types(
        &mut self,
        surface: &str,
        obj: &Map<String, Value>,
        dialect: &Dialect,
        schema: &Schema,
    ) -> BTreeSet<JsonType> {
        let declared = dialect.type_tags(obj.get("type"));
        if declared.len() > 1 {
            let tags: Vec<&str> = declared.iter().map(JsonType::as_str).collect();
            self.diagnostics.report(
                surface,
                DiagnosticCode::MultipleTypes,
                format!("Several type tags ({}); modelling as an object", tags.join(", ")),
            );
        }
        if !declared.is_empty() {
            return declared;
        }

        if schema.has_composition() {
            // `not` contributes nothing to the union
            return schema
                .all_of
                .iter()
                .chain(&schema.any_of)
                .chain(&schema.one_of)
                .flat_map(|sub| self.arena.get(*sub).types.iter().copied())
                .collect();
        }

        if let Some(target) = schema.reference {
            return self.arena.get(target).types.clone();
        }

        let mut inferred = BTreeSet::new();
        if ["properties", "additionalProperties", "required", "patternProperties"]
            .iter()
            .any(|k| obj.contains_key(*k))
        {
            inferred.insert(JsonType::Object);
        } else if obj.contains_key("items") {
            inferred.insert(JsonType::Array);
        }
        inferred
    }

    fn build_kind(
        &mut self,
        key: &NodeKey,
        surface: &str,
        obj: &Map<String, Value>,
        dialect: &Dialect,
        types: &BTreeSet<JsonType>,
    ) -> SchemaKind {
        let single = if types.len() == 1 { types.iter().next().copied() } else { None };
        match single {
            Some(JsonType::Array) => SchemaKind::Array(self.array_attributes(key, surface, obj)),
            Some(JsonType::String) => SchemaKind::String(string_attributes(obj)),
            Some(JsonType::Number) => SchemaKind::Number(self.numeric_attributes(surface, obj, dialect)),
            Some(JsonType::Integer) => SchemaKind::Integer(self.numeric_attributes(surface, obj, dialect)),
            Some(JsonType::Boolean) => SchemaKind::Boolean,
            Some(JsonType::Object) | Some(JsonType::Null) | None => {
                SchemaKind::Object(self.object_attributes(key, surface, obj, dialect))
            }
        }
    }

    fn object_attributes(
        &mut self,
        key: &NodeKey,
        surface: &str,
        obj: &Map<String, Value>,
        dialect: &Dialect,
    ) -> ObjectSchema {
        let mut object = ObjectSchema::default();

        if let Some(Value::Array(required)) = obj.get("required") {
            object.required = required.iter().filter_map(Value::as_str).map(String::from).collect();
        }

        if let Some(Value::Object(properties)) = obj.get("properties") {
            let container = key.child("properties");
            for (name, property) in properties {
                if dialect.required_flag_on_properties
                    && property.get("required").and_then(Value::as_bool) == Some(true)
                    && !object.required.contains(name)
                {
                    object.required.push(name.clone());
                }
                let id = self.resolve_node(container.child(name));
                object.properties.insert(name.clone(), id);
            }
        }

        object.additional_properties = match obj.get("additionalProperties") {
            Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
            Some(Value::Object(_)) => {
                AdditionalProperties::Schema(self.resolve_node(key.child("additionalProperties")))
            }
            _ => AdditionalProperties::Allowed,
        };

        if let Some(Value::Object(patterns)) = obj.get("patternProperties") {
            self.diagnostics.unsupported_keyword(surface, "patternProperties");
            let container = key.child("patternProperties");
            for pattern in patterns.keys() {
                let id = self.resolve_node(container.child(pattern));
                object.pattern_properties.insert(pattern.clone(), id);
            }
        }

        object
    }

    fn array_attributes(&mut self, key: &NodeKey, surface: &str, obj: &Map<String, Value>) -> ArraySchema {
        let items = match obj.get("items") {
            Some(Value::Object(_)) => Some(self.resolve_node(key.child("items"))),
            Some(Value::Array(_)) => {
                self.diagnostics.unsupported_keyword(surface, "items (tuple form)");
                None
            }
            _ => None,
        };
        ArraySchema {
            items,
            min_items: obj.get("minItems").and_then(Value::as_u64),
            max_items: obj.get("maxItems").and_then(Value::as_u64),
            unique_items: obj.get("uniqueItems").and_then(Value::as_bool).unwrap_or(false),
        }
    }

    fn numeric_attributes(&mut self, surface: &str, obj: &Map<String, Value>, dialect: &Dialect) -> NumericSchema {
        let (minimum, exclusive_minimum) =
            self.bound(surface, obj, "minimum", "exclusiveMinimum", dialect);
        let (maximum, exclusive_maximum) =
            self.bound(surface, obj, "maximum", "exclusiveMaximum", dialect);
        NumericSchema {
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            multiple_of: number_field(obj, dialect.multiple_of_keyword),
        }
    }

    /// Returns (inclusive, exclusive) limits with boolean exclusivity folded in
    fn bound(
        &mut self,
        surface: &str,
        obj: &Map<String, Value>,
        limit_keyword: &str,
        exclusive_keyword: &str,
        dialect: &Dialect,
    ) -> (Option<Number>, Option<Number>) {
        let limit = number_field(obj, limit_keyword);
        match obj.get(exclusive_keyword) {
            Some(Value::Bool(true)) => {
                if !dialect.boolean_exclusive_bounds {
                    self.diagnostics.report(
                        surface,
                        DiagnosticCode::LegacyExclusiveBound,
                        format!("Boolean '{}' in a numeric-limit dialect", exclusive_keyword),
                    );
                }
                (None, limit)
            }
            Some(Value::Number(exclusive)) => (limit, Some(exclusive.clone())),
            _ => (limit, None),
        }
    }

    fn resolve_list(&mut self, key: &NodeKey, obj: &Map<String, Value>, keyword: &str) -> Vec<SchemaId> {
        let Some(Value::Array(items)) = obj.get(keyword) else {
            return Vec::new();
        };
        let container = key.child(keyword);
        (0..items.len())
            .filter(|i| matches!(items[*i], Value::Object(_) | Value::Bool(_)))
            .map(|i| self.resolve_node(container.child(&i.to_string())))
            .collect()
    }
}

/// `$ref` of a node that carries nothing else of substance
fn pure_reference(node: &Value) -> Option<&str> {
    let obj = node.as_object()?;
    let reference = obj.get("$ref")?.as_str()?;
    let only_ref = obj.keys().all(|k| k == "$ref" || k == "$comment");
    only_ref.then_some(reference)
}

fn string_field(obj: &Map<String, Value>, keyword: &str) -> Option<String> {
    obj.get(keyword).and_then(Value::as_str).map(String::from)
}

fn number_field(obj: &Map<String, Value>, keyword: &str) -> Option<Number> {
    match obj.get(keyword) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

fn string_attributes(obj: &Map<String, Value>) -> StringSchema {
    StringSchema {
        min_length: obj.get("minLength").and_then(Value::as_u64),
        max_length: obj.get("maxLength").and_then(Value::as_u64),
        pattern: string_field(obj, "pattern"),
    }
}

/// String form of a `default` value: strings verbatim, everything else as JSON
pub fn default_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
