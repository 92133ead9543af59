//! Validation Constraints
//!
//! Structured description of what a field value must satisfy. Emitters render
//! these as guard clauses; [`Constraint`]'s `Display` gives the plain-text
//! form used in documentation.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashSet;
use std::fmt;

use crate::schema::{NumericSchema, Schema, SchemaArena, SchemaId, SchemaKind, StringSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    NotNull,
    Minimum { limit: Number, exclusive: bool },
    Maximum { limit: Number, exclusive: bool },
    MultipleOf { factor: Number },
    MinLength { length: u64 },
    MaxLength { length: u64 },
    Pattern { regex: String },
    /// `open` admits values beyond the listed ones
    ValidValues { values: Vec<Value>, open: bool },
    MinItems { count: u64 },
    MaxItems { count: u64 },
    UniqueItems,
    /// Applies to every element of a collection
    Elements { constraints: Vec<Constraint> },
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNull => write!(f, "value must not be null"),
            Self::Minimum { limit, exclusive } => {
                write!(f, "value must be {} {}", if *exclusive { ">" } else { ">=" }, limit)
            }
            Self::Maximum { limit, exclusive } => {
                write!(f, "value must be {} {}", if *exclusive { "<" } else { "<=" }, limit)
            }
            Self::MultipleOf { factor } => write!(f, "value must be a multiple of {}", factor),
            Self::MinLength { length } => write!(f, "length must be >= {}", length),
            Self::MaxLength { length } => write!(f, "length must be <= {}", length),
            Self::Pattern { regex } => write!(f, "value must match pattern {}", regex),
            Self::ValidValues { values, open } => {
                let listed: Vec<String> = values.iter().map(Value::to_string).collect();
                write!(f, "value must be one of [{}]", listed.join(", "))?;
                if *open {
                    write!(f, ", or another value of the declared type")?;
                }
                Ok(())
            }
            Self::MinItems { count } => write!(f, "number of elements must be >= {}", count),
            Self::MaxItems { count } => write!(f, "number of elements must be <= {}", count),
            Self::UniqueItems => write!(f, "elements must be unique"),
            Self::Elements { constraints } => {
                let inner: Vec<String> = constraints.iter().map(|c| c.to_string()).collect();
                write!(f, "each element: {}", inner.join("; "))
            }
        }
    }
}

/// Constraints of a field typed by `schema`
pub fn derive(arena: &SchemaArena, schema: SchemaId, required: bool) -> Vec<Constraint> {
    let mut constraints = Vec::new();
    if required {
        constraints.push(Constraint::NotNull);
    }
    constraints.extend(value_constraints(arena, schema, &mut HashSet::new()));
    constraints
}

fn value_constraints(arena: &SchemaArena, id: SchemaId, visited: &mut HashSet<SchemaId>) -> Vec<Constraint> {
    if !visited.insert(id) {
        return Vec::new();
    }
    let schema = arena.get(id);
    let mut out = Vec::new();

    match &schema.kind {
        SchemaKind::Integer(n) | SchemaKind::Number(n) => numeric(n, &mut out),
        SchemaKind::String(s) => string(s, &mut out),
        SchemaKind::Array(array) => {
            if let Some(count) = array.min_items {
                out.push(Constraint::MinItems { count });
            }
            if let Some(count) = array.max_items {
                out.push(Constraint::MaxItems { count });
            }
            if array.unique_items {
                out.push(Constraint::UniqueItems);
            }
            if let Some(items) = array.items {
                let constraints = value_constraints(arena, items, visited);
                if !constraints.is_empty() {
                    out.push(Constraint::Elements { constraints });
                }
            }
        }
        SchemaKind::Object(_) | SchemaKind::Boolean => {}
    }

    if let Some(values) = valid_values(arena, schema) {
        out.push(values);
    }

    if out.is_empty() {
        if let Some(next) = pass_through(schema) {
            return value_constraints(arena, next, visited);
        }
    }
    out
}

fn numeric(n: &NumericSchema, out: &mut Vec<Constraint>) {
    if let Some(limit) = &n.minimum {
        out.push(Constraint::Minimum { limit: limit.clone(), exclusive: false });
    }
    if let Some(limit) = &n.exclusive_minimum {
        out.push(Constraint::Minimum { limit: limit.clone(), exclusive: true });
    }
    if let Some(limit) = &n.maximum {
        out.push(Constraint::Maximum { limit: limit.clone(), exclusive: false });
    }
    if let Some(limit) = &n.exclusive_maximum {
        out.push(Constraint::Maximum { limit: limit.clone(), exclusive: true });
    }
    if let Some(factor) = &n.multiple_of {
        out.push(Constraint::MultipleOf { factor: factor.clone() });
    }
}

fn string(s: &StringSchema, out: &mut Vec<Constraint>) {
    if let Some(length) = s.min_length {
        out.push(Constraint::MinLength { length });
    }
    if let Some(length) = s.max_length {
        out.push(Constraint::MaxLength { length });
    }
    if let Some(regex) = &s.pattern {
        out.push(Constraint::Pattern { regex: regex.clone() });
    }
}

/// Own `enum`/`const`, or the values collected from an `anyOf`/`oneOf` of single-value schemas
fn valid_values(arena: &SchemaArena, schema: &Schema) -> Option<Constraint> {
    let own = schema.allowed_values();
    if !own.is_empty() {
        return Some(Constraint::ValidValues { values: own, open: false });
    }

    let alternatives: Vec<SchemaId> = schema.any_of.iter().chain(&schema.one_of).copied().collect();
    let mut values: Vec<Value> = Vec::new();
    let mut open = false;
    for alternative in alternatives {
        let admitted = arena.get(alternative).allowed_values();
        if admitted.is_empty() {
            open = true;
        }
        for value in admitted {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }

    (!values.is_empty()).then_some(Constraint::ValidValues { values, open })
}

/// Schema whose constraints apply when this one declares none itself
fn pass_through(schema: &Schema) -> Option<SchemaId> {
    let declares_fields = schema.as_object().map(|o| o.declares_fields()).unwrap_or(false);
    if declares_fields {
        return None;
    }
    match (schema.reference, schema.all_of.as_slice()) {
        (Some(target), _) => Some(target),
        (None, [single]) => Some(*single),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::repository::{MemoryLoader, NodeRepository};
    use crate::schema::SchemaBuilder;
    use serde_json::json;

    fn constraints_of(doc: Value, property: &str, required: bool) -> Vec<Constraint> {
        let loader = MemoryLoader::new().with("file:///c/root.json", doc).unwrap();
        let mut repo = NodeRepository::new(Box::new(loader));
        let mut arena = SchemaArena::new();
        let mut diagnostics = Diagnostics::new();
        let root = SchemaBuilder::new(&mut repo, &mut arena, &mut diagnostics, None)
            .resolve_root("file:///c/root.json")
            .unwrap();
        let id = arena.get(root).as_object().unwrap().properties[property];
        derive(&arena, id, required)
    }

    #[test]
    fn test_boolean_exclusive_minimum() {
        let constraints = constraints_of(
            json!({
                "$schema": "http://json-schema.org/draft-04/schema",
                "properties": {"v": {"type": "number", "minimum": 0, "exclusiveMinimum": true}}
            }),
            "v",
            false,
        );
        assert_eq!(
            constraints,
            vec![Constraint::Minimum { limit: Number::from(0), exclusive: true }]
        );
        assert_eq!(constraints[0].to_string(), "value must be > 0");
    }

    #[test]
    fn test_enum_from_any_of() {
        let constraints = constraints_of(
            json!({"properties": {"componentType": {
                "anyOf": [{"enum": [5120]}, {"enum": [5121]}, {"type": "integer"}]
            }}}),
            "componentType",
            true,
        );
        assert_eq!(constraints[0], Constraint::NotNull);
        assert_eq!(
            constraints[1],
            Constraint::ValidValues { values: vec![json!(5120), json!(5121)], open: true }
        );
        let text = constraints[1].to_string();
        assert!(text.contains("5120") && text.contains("5121"));
    }

    #[test]
    fn test_array_element_constraints() {
        let constraints = constraints_of(
            json!({"properties": {"scale": {
                "type": "array", "minItems": 3, "maxItems": 3,
                "items": {"type": "number", "maximum": 1}
            }}}),
            "scale",
            false,
        );
        let rendered: Vec<String> = constraints.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "number of elements must be >= 3",
                "number of elements must be <= 3",
                "each element: value must be <= 1",
            ]
        );
    }

    #[test]
    fn test_constraints_follow_single_all_of() {
        let constraints = constraints_of(
            json!({
                "definitions": {"Index": {"type": "integer", "minimum": 0}},
                "properties": {"buffer": {"allOf": [{"$ref": "#/definitions/Index"}], "description": "The buffer"}}
            }),
            "buffer",
            false,
        );
        assert_eq!(
            constraints,
            vec![Constraint::Minimum { limit: Number::from(0), exclusive: false }]
        );
    }

    #[test]
    fn test_string_constraints_and_const() {
        let constraints = constraints_of(
            json!({"properties": {
                "name": {"type": "string", "minLength": 1, "pattern": "^[a-z]+$", "const": "abc"}
            }}),
            "name",
            false,
        );
        assert_eq!(constraints.len(), 3);
        assert_eq!(constraints[2].to_string(), "value must be one of [\"abc\"]");
    }
}
