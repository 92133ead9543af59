//! Target Type Model
//!
//! Language-neutral description of what gets generated: primitives,
//! collections, maps and classes with fields, accessors and validation
//! constraints. Emitters lower this into concrete source text.

pub mod builder;
pub mod constraints;
pub mod defaults;
pub mod names;

pub use builder::TypeBuilder;
pub use constraints::Constraint;
pub use defaults::DefaultLiteral;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::schema::SchemaId;

/// Index of a class in its [`TypeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub usize);

/// Leaf types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Boolean,
    Integer,
    Number,
    String,
    /// Open object: anything goes
    Any,
    /// Externally known type fixed by an override
    Named(String),
}

impl Primitive {
    /// Primitive named by an override target
    pub fn from_override(target: &str) -> Self {
        match target {
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "object" | "any" => Self::Any,
            other => Self::Named(other.to_string()),
        }
    }
}

/// What a schema maps to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    Primitive(Primitive),
    Collection { element: Box<TargetType>, unique: bool },
    /// String-keyed map
    Map(Box<TargetType>),
    Class(ClassId),
}

impl TargetType {
    pub fn any() -> Self {
        Self::Primitive(Primitive::Any)
    }

    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            Self::Class(id) => Some(*id),
            _ => None,
        }
    }

    /// Short language-neutral rendering, e.g. `List<Accessor>`
    pub fn display(&self, graph: &TypeGraph) -> String {
        match self {
            Self::Primitive(Primitive::Named(name)) => name.clone(),
            Self::Primitive(p) => format!("{:?}", p),
            Self::Collection { element, unique } => {
                let kind = if *unique { "Set" } else { "List" };
                format!("{}<{}>", kind, element.display(graph))
            }
            Self::Map(value) => format!("Map<String, {}>", value.display(graph)),
            Self::Class(id) => graph.class(*id).name.clone(),
        }
    }
}

// =============================================================================
// Fields and Accessors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    Getter,
    Setter,
    /// Add one element (or one keyed entry)
    Add,
    /// Remove one element (or one keyed entry)
    Remove,
    /// Returns the declared default
    Default,
}

/// A method contract on a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accessor {
    pub kind: AccessorKind,
    pub name: String,
    /// Element or value type for add/remove
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<TargetType>,
    /// add/remove take a key (map fields)
    #[serde(default)]
    pub keyed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Property name as written in the schema
    pub name: String,
    pub ty: TargetType,
    pub required: bool,
    /// Schema the field was derived from
    pub schema: SchemaId,
    pub doc: Option<String>,
    pub default: Option<DefaultLiteral>,
    pub constraints: Vec<Constraint>,
    /// Listed in the suppression set; constraints are kept for documentation
    pub validation_suppressed: bool,
    pub accessors: Vec<Accessor>,
}

impl Field {
    /// Rendered constraint lines an emitter turns into guard clauses
    pub fn validation_lines(&self) -> Vec<String> {
        if self.validation_suppressed {
            return Vec::new();
        }
        self.constraints.iter().map(|c| c.to_string()).collect()
    }
}

// =============================================================================
// Classes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    pub superclass: Option<ClassId>,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
    /// Schema the class was created for
    pub schema: SchemaId,
    /// Every URI identifying the class
    pub uris: BTreeSet<String>,
    pub package: Option<String>,
    pub header: Option<String>,
}

impl ClassDef {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// All classes of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeGraph {
    classes: Vec<ClassDef>,
    /// Target type of every mapped schema
    #[serde(skip)]
    mapped: HashMap<SchemaId, TargetType>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Class by id; ids are only minted by this graph
    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.0]
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> &mut ClassDef {
        &mut self.classes[id.0]
    }

    pub fn classes(&self) -> &[ClassDef] {
        &self.classes
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Target type a schema was mapped to
    pub fn type_of(&self, schema: SchemaId) -> Option<&TargetType> {
        self.mapped.get(&schema)
    }

    pub(crate) fn record(&mut self, schema: SchemaId, ty: TargetType) {
        self.mapped.insert(schema, ty);
    }

    pub(crate) fn add_class(&mut self, class: ClassDef) -> ClassId {
        let id = ClassId(self.classes.len());
        self.classes.push(ClassDef { id, ..class });
        id
    }

    /// Superclass chain of a class, nearest first
    pub fn ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut current = self.class(id).superclass;
        while let Some(parent) = current {
            if parent == id || chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.class(parent).superclass;
        }
        chain
    }

    /// Field declared by the class or one of its ancestors
    pub fn inherited_field(&self, id: ClassId, name: &str) -> Option<(ClassId, &Field)> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|c| self.class(c).field(name).map(|f| (c, f)))
    }

    /// Classes ordered so every superclass precedes its subclasses
    pub fn inheritance_order(&self) -> Vec<ClassId> {
        let mut graph = DiGraph::<ClassId, ()>::with_capacity(self.classes.len(), self.classes.len());
        let nodes: Vec<_> = self.classes.iter().map(|c| graph.add_node(c.id)).collect();
        for class in &self.classes {
            if let Some(parent) = class.superclass {
                graph.add_edge(nodes[parent.0], nodes[class.id.0], ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|n| graph[n]).collect(),
            // The builder breaks supertype cycles, so this is declaration order as a fallback
            Err(_) => self.classes.iter().map(|c| c.id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, superclass: Option<ClassId>) -> ClassDef {
        ClassDef {
            id: ClassId(0),
            name: name.to_string(),
            superclass,
            doc: None,
            fields: Vec::new(),
            schema: SchemaId(0),
            uris: BTreeSet::new(),
            package: None,
            header: None,
        }
    }

    #[test]
    fn test_inheritance_order_puts_supers_first() {
        let mut graph = TypeGraph::new();
        let child = graph.add_class(class("Child", Some(ClassId(2))));
        let root = graph.add_class(class("Root", None));
        let middle = graph.add_class(class("Middle", Some(ClassId(1))));

        let order = graph.inheritance_order();
        let pos = |id: ClassId| order.iter().position(|c| *c == id).unwrap();
        assert!(pos(root) < pos(middle));
        assert!(pos(middle) < pos(child));
        assert_eq!(graph.ancestors(child), vec![middle, root]);
    }

    #[test]
    fn test_primitive_from_override() {
        assert_eq!(Primitive::from_override("integer"), Primitive::Integer);
        assert_eq!(Primitive::from_override("object"), Primitive::Any);
        assert_eq!(Primitive::from_override("java.net.URI"), Primitive::Named("java.net.URI".into()));
    }

    #[test]
    fn test_display() {
        let graph = TypeGraph::new();
        let ty = TargetType::Map(Box::new(TargetType::Collection {
            element: Box::new(TargetType::Primitive(Primitive::Number)),
            unique: true,
        }));
        assert_eq!(ty.display(&graph), "Map<String, Set<Number>>");
    }
}
