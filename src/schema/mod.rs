//! Semantic Schema Model
//!
//! One [`Schema`] per distinct node of the resolved graph, stored in a
//! [`SchemaArena`] and addressed by [`SchemaId`]. Sub-schemas are referenced
//! by id, so cyclic schemas are plain back-edges in the arena.

pub mod builder;
pub mod dialect;

pub use builder::SchemaBuilder;
pub use dialect::{Dialect, Draft};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::{BTreeSet, HashMap};

use crate::repository::NodeKey;

/// Index of a schema in its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(pub usize);

// =============================================================================
// Type Tags
// =============================================================================

/// JSON Schema `type` keyword values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl JsonType {
    pub fn from_keyword(tag: &str) -> Option<Self> {
        match tag {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

// =============================================================================
// Variant Attributes
// =============================================================================

/// What an object says about properties it does not name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdditionalProperties {
    #[default]
    Allowed,
    Forbidden,
    Schema(SchemaId),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    pub properties: IndexMap<String, SchemaId>,
    pub required: Vec<String>,
    pub additional_properties: AdditionalProperties,
    pub pattern_properties: IndexMap<String, SchemaId>,
}

impl ObjectSchema {
    /// Whether the object declares anything that becomes a field
    pub fn declares_fields(&self) -> bool {
        !self.properties.is_empty()
            || !self.pattern_properties.is_empty()
            || matches!(self.additional_properties, AdditionalProperties::Schema(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArraySchema {
    pub items: Option<SchemaId>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

/// Bounds are always in numeric-limit form, whatever the source dialect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericSchema {
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub multiple_of: Option<Number>,
}

impl NumericSchema {
    pub fn is_unbounded(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringSchema {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
}

/// The six schema variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaKind {
    Object(ObjectSchema),
    Array(ArraySchema),
    String(StringSchema),
    Number(NumericSchema),
    Integer(NumericSchema),
    Boolean,
}

impl SchemaKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Integer(_) => "integer",
            Self::Boolean => "boolean",
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// A resolved schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: SchemaId,
    /// Node this schema was built from
    pub node: NodeKey,
    /// Every surface URI that reached this schema, first one is where it was built
    pub uris: IndexSet<String>,
    pub kind: SchemaKind,
    /// Declared or derived `type` tags
    pub types: BTreeSet<JsonType>,
    /// Value of `id` / `$id`
    pub declared_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    /// `default` in string form
    pub default: Option<String>,
    pub enum_values: Vec<Value>,
    pub const_value: Option<Value>,
    /// `$ref` target when the node adds keywords next to it
    pub reference: Option<SchemaId>,
    pub all_of: Vec<SchemaId>,
    pub any_of: Vec<SchemaId>,
    pub one_of: Vec<SchemaId>,
    pub not: Option<SchemaId>,
    pub definitions: IndexMap<String, SchemaId>,
}

impl Schema {
    /// Open "any" object, also used as the placeholder during resolution
    pub fn open(id: SchemaId, node: NodeKey, uri: String) -> Self {
        let mut uris = IndexSet::new();
        uris.insert(uri);
        Self {
            id,
            node,
            uris,
            kind: SchemaKind::Object(ObjectSchema::default()),
            types: BTreeSet::new(),
            declared_id: None,
            title: None,
            description: None,
            format: None,
            default: None,
            enum_values: Vec::new(),
            const_value: None,
            reference: None,
            all_of: Vec::new(),
            any_of: Vec::new(),
            one_of: Vec::new(),
            not: None,
            definitions: IndexMap::new(),
        }
    }

    /// URI the schema was built at
    pub fn primary_uri(&self) -> &str {
        self.uris.first().map(String::as_str).unwrap_or("")
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn has_composition(&self) -> bool {
        !self.all_of.is_empty() || !self.any_of.is_empty() || !self.one_of.is_empty() || self.not.is_some()
    }

    /// Type tags other than `null`
    pub fn value_types(&self) -> impl Iterator<Item = JsonType> + '_ {
        self.types.iter().copied().filter(|t| *t != JsonType::Null)
    }

    /// Values admitted by `enum` or `const`
    pub fn allowed_values(&self) -> Vec<Value> {
        if !self.enum_values.is_empty() {
            return self.enum_values.clone();
        }
        self.const_value.iter().cloned().collect()
    }

    /// An object with no tags, fields, composition, reference or values
    pub fn is_open(&self) -> bool {
        self.types.is_empty()
            && self.reference.is_none()
            && !self.has_composition()
            && self.allowed_values().is_empty()
            && self.as_object().map(|o| !o.declares_fields()).unwrap_or(false)
    }

    /// Display text built from title and description
    pub fn documentation(&self) -> Option<String> {
        match (&self.title, &self.description) {
            (Some(t), Some(d)) if t != d => Some(format!("{}\n\n{}", t, d)),
            (_, Some(d)) => Some(d.clone()),
            (Some(t), None) => Some(t.clone()),
            (None, None) => None,
        }
    }
}

// =============================================================================
// Arena
// =============================================================================

/// Owns every schema of a run
#[derive(Debug, Default)]
pub struct SchemaArena {
    schemas: Vec<Schema>,
    by_node: HashMap<NodeKey, SchemaId>,
    roots: Vec<SchemaId>,
}

impl SchemaArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema by id; ids are only minted by this arena
    pub fn get(&self, id: SchemaId) -> &Schema {
        &self.schemas[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: SchemaId) -> &mut Schema {
        &mut self.schemas[id.0]
    }

    /// Schema built for (or aliased onto) a node
    pub fn lookup(&self, node: &NodeKey) -> Option<SchemaId> {
        self.by_node.get(node).copied()
    }

    /// Schema reached through a given URI
    pub fn find_by_uri(&self, uri: &str) -> Option<SchemaId> {
        self.schemas.iter().find(|s| s.uris.contains(uri)).map(|s| s.id)
    }

    /// Register an open placeholder for `node`
    pub(crate) fn alloc(&mut self, node: NodeKey, uri: String) -> SchemaId {
        let id = SchemaId(self.schemas.len());
        self.schemas.push(Schema::open(id, node.clone(), uri));
        self.by_node.insert(node, id);
        id
    }

    /// Point another node at an existing schema
    pub(crate) fn bind(&mut self, node: NodeKey, id: SchemaId) {
        self.by_node.insert(node, id);
    }

    /// Replace a placeholder, keeping URIs recorded while it was pending
    pub(crate) fn fill(&mut self, id: SchemaId, mut schema: Schema) {
        let recorded = std::mem::take(&mut self.schemas[id.0].uris);
        schema.uris.extend(recorded);
        self.schemas[id.0] = schema;
    }

    pub(crate) fn mark_root(&mut self, id: SchemaId) {
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    pub fn roots(&self) -> &[SchemaId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter()
    }
}
