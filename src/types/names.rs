//! Class and accessor naming
//!
//! Class names come from the URIs that identify a schema. A URI without a
//! fragment names a whole document and wins; otherwise the name is built from
//! the document's file stem and the fragment. Collisions are resolved by
//! [`ClassNamer`] with a numeric suffix.

use std::collections::HashSet;

use crate::error::{GenError, Result};
use crate::uri;

/// Pointer tokens that describe structure rather than naming anything
const STRUCTURAL_TOKENS: &[&str] = &[
    "properties",
    "items",
    "additionalProperties",
    "patternProperties",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "extends",
];

const DEFINITION_CONTAINERS: &[&str] = &["definitions", "$defs"];

/// A derived class name and what went into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedName {
    pub name: String,
    /// URI the name was taken from
    pub source: String,
    /// Other fragment-less URIs that competed for the name
    pub competing: Vec<String>,
}

/// Derive a class name from the URIs identifying a schema
///
/// Fails with [`GenError::EmptyUriSet`] when `uris` is empty.
pub fn derive_class_name<'a, I>(uris: I, vendor_prefixes: &[String]) -> Result<DerivedName>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut whole: Vec<&str> = Vec::new();
    let mut fragments: Vec<&str> = Vec::new();
    for candidate in uris {
        match candidate.split_once('#') {
            Some((_, fragment)) if !uri::pointer_tokens(fragment).is_empty() => fragments.push(candidate),
            _ => whole.push(candidate),
        }
    }
    let by_length = |a: &&str, b: &&str| a.len().cmp(&b.len()).then_with(|| a.cmp(b));
    whole.sort_by(by_length);
    whole.dedup();
    fragments.sort_by(by_length);

    if let Some((first, rest)) = whole.split_first() {
        let tokens = stem_tokens(first, vendor_prefixes);
        return Ok(DerivedName {
            name: identifier(&tokens),
            source: first.to_string(),
            competing: rest.iter().map(|s| s.to_string()).collect(),
        });
    }

    let first: &str = fragments.first().copied().ok_or(GenError::EmptyUriSet)?;
    let (document, fragment) = first.split_once('#').unwrap_or((first, ""));
    let pointer = uri::pointer_tokens(fragment);

    let tokens = match pointer.as_slice() {
        [.., container, name] if DEFINITION_CONTAINERS.contains(&container.as_str()) => {
            split_tokens(name, vendor_prefixes)
        }
        _ => {
            let mut tokens = stem_tokens(document, vendor_prefixes);
            if let Some(meaningful) = pointer.iter().rev().find(|t| is_meaningful(t)) {
                tokens.extend(split_tokens(meaningful, vendor_prefixes));
            }
            tokens
        }
    };

    Ok(DerivedName {
        name: identifier(&tokens),
        source: first.to_string(),
        competing: Vec::new(),
    })
}

/// `get`/`set`/`add`/... followed by the field name in PascalCase
pub fn accessor_name(prefix: &str, field: &str) -> String {
    let tokens = split_tokens(field, &[]);
    format!("{}{}", prefix, identifier(&tokens))
}

/// Hands out unique class names
#[derive(Debug, Default)]
pub struct ClassNamer {
    taken: HashSet<String>,
}

impl ClassNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `base`, or `base2`, `base3`, ... when taken. The flag is set on collision.
    pub fn claim(&mut self, base: &str) -> (String, bool) {
        if self.taken.insert(base.to_string()) {
            return (base.to_string(), false);
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{}{}", base, suffix);
            if self.taken.insert(candidate.clone()) {
                return (candidate, true);
            }
            suffix += 1;
        }
    }
}

fn is_meaningful(token: &str) -> bool {
    !STRUCTURAL_TOKENS.contains(&token)
        && !DEFINITION_CONTAINERS.contains(&token)
        && !token.chars().all(|c| c.is_ascii_digit())
}

/// Tokens of the last path segment, minus `.json` and `.schema` suffixes
fn stem_tokens(location: &str, vendor_prefixes: &[String]) -> Vec<String> {
    let path = location.split_once('#').map(|(p, _)| p).unwrap_or(location);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    let mut stem = segment;
    for suffix in [".json", ".schema"] {
        stem = stem.strip_suffix(suffix).unwrap_or(stem);
    }
    split_tokens(stem, vendor_prefixes)
}

/// Split on `.`, `-`, `_` and spaces, dropping vendor tokens
fn split_tokens(text: &str, vendor_prefixes: &[String]) -> Vec<String> {
    text.split(['.', '-', '_', ' '])
        .filter(|t| !t.is_empty())
        .filter(|t| !vendor_prefixes.iter().any(|v| v == t))
        .map(String::from)
        .collect()
}

/// Upper-case the first letter of every token and keep what is alphanumeric
fn identifier(tokens: &[String]) -> String {
    let mut name = String::new();
    for token in tokens {
        let mut chars = token.chars().filter(|c| c.is_ascii_alphanumeric());
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.extend(chars);
        }
    }
    match name.chars().next() {
        None => "Anonymous".to_string(),
        Some(c) if c.is_ascii_digit() => format!("Type{}", name),
        Some(_) => name,
    }
}
