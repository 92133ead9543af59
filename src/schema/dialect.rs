//! Schema Dialects
//!
//! The historical drafts differ in a handful of keyword spellings and in how
//! exclusive bounds are written. A [`Dialect`] is the table of those
//! differences; the builder reads keywords through it and normalizes
//! boolean exclusivity into numeric limits.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use super::JsonType;

/// Supported JSON Schema drafts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Draft {
    Draft3,
    Draft4,
    Draft6,
    #[default]
    Draft7,
}

impl Draft {
    /// Draft named by a `$schema` URI
    pub fn detect(schema_uri: &str) -> Option<Self> {
        if schema_uri.contains("draft-03") {
            Some(Self::Draft3)
        } else if schema_uri.contains("draft-04") {
            Some(Self::Draft4)
        } else if schema_uri.contains("draft-06") {
            Some(Self::Draft6)
        } else if schema_uri.contains("draft-07") || schema_uri.contains("2019-09") || schema_uri.contains("2020-12") {
            Some(Self::Draft7)
        } else {
            None
        }
    }

    pub fn dialect(self) -> &'static Dialect {
        match self {
            Self::Draft3 => &DRAFT3,
            Self::Draft4 => &DRAFT4,
            Self::Draft6 => &DRAFT6,
            Self::Draft7 => &DRAFT7,
        }
    }
}

/// Keyword table of one draft
#[derive(Debug, PartialEq, Eq)]
pub struct Dialect {
    pub draft: Draft,
    /// `id` before draft-06, `$id` after
    pub id_keyword: &'static str,
    pub definitions_keywords: &'static [&'static str],
    /// `divisibleBy` in draft-03
    pub multiple_of_keyword: &'static str,
    /// `exclusiveMinimum: true` modifies `minimum` instead of being a limit
    pub boolean_exclusive_bounds: bool,
    /// draft-03 marks required properties with `required: true` on the property
    pub required_flag_on_properties: bool,
    /// draft-03 `extends`, read as `allOf`
    pub extends_keyword: Option<&'static str>,
    /// draft-03 `"any"` tag, read as no tag
    pub any_type_tag: Option<&'static str>,
    pub unsupported_keywords: &'static [&'static str],
}

const COMMON_UNSUPPORTED: &[&str] = &["dependencies", "additionalItems"];

const DRAFT3: Dialect = Dialect {
    draft: Draft::Draft3,
    id_keyword: "id",
    definitions_keywords: &["definitions"],
    multiple_of_keyword: "divisibleBy",
    boolean_exclusive_bounds: true,
    required_flag_on_properties: true,
    extends_keyword: Some("extends"),
    any_type_tag: Some("any"),
    unsupported_keywords: &["dependencies", "additionalItems", "disallow"],
};

const DRAFT4: Dialect = Dialect {
    draft: Draft::Draft4,
    id_keyword: "id",
    definitions_keywords: &["definitions"],
    multiple_of_keyword: "multipleOf",
    boolean_exclusive_bounds: true,
    required_flag_on_properties: false,
    extends_keyword: None,
    any_type_tag: None,
    unsupported_keywords: COMMON_UNSUPPORTED,
};

const DRAFT6: Dialect = Dialect {
    draft: Draft::Draft6,
    id_keyword: "$id",
    definitions_keywords: &["definitions"],
    multiple_of_keyword: "multipleOf",
    boolean_exclusive_bounds: false,
    required_flag_on_properties: false,
    extends_keyword: None,
    any_type_tag: None,
    unsupported_keywords: &["dependencies", "additionalItems", "propertyNames", "contains"],
};

const DRAFT7: Dialect = Dialect {
    draft: Draft::Draft7,
    id_keyword: "$id",
    definitions_keywords: &["definitions", "$defs"],
    multiple_of_keyword: "multipleOf",
    boolean_exclusive_bounds: false,
    required_flag_on_properties: false,
    extends_keyword: None,
    any_type_tag: None,
    unsupported_keywords: &[
        "dependencies",
        "dependentRequired",
        "dependentSchemas",
        "additionalItems",
        "propertyNames",
        "contains",
        "if",
        "then",
        "else",
        "unevaluatedProperties",
        "unevaluatedItems",
    ],
};

impl Dialect {
    /// Tags of a `type` keyword value (string or array of strings)
    pub fn type_tags(&self, value: Option<&Value>) -> BTreeSet<JsonType> {
        let names: Vec<&str> = match value {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        names
            .into_iter()
            .filter(|n| Some(*n) != self.any_type_tag)
            .filter_map(JsonType::from_keyword)
            .collect()
    }
}
