//! Node Repository
//!
//! Loads JSON documents by URI, caches them, resolves JSON pointer fragments
//! and records which surface URIs collapse onto one canonical location.
//!
//! A node is identified by [`NodeKey`]: the document it lives in plus its
//! canonical JSON pointer. Two URIs that reach the same key denote the same
//! node, however they were spelled.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use url::Url;

use crate::error::{GenError, Result};
use crate::uri;

/// Index of a loaded document
pub type DocId = usize;

/// Identity of a node inside a loaded document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub doc: DocId,
    /// Escaped JSON pointer, `""` for the document root
    pub pointer: String,
}

impl NodeKey {
    pub fn root(doc: DocId) -> Self {
        Self { doc, pointer: String::new() }
    }

    /// Key of a direct child (object member or array index)
    pub fn child(&self, token: &str) -> Self {
        Self {
            doc: self.doc,
            pointer: uri::child_pointer(&self.pointer, token),
        }
    }

    pub fn is_document_root(&self) -> bool {
        self.pointer.is_empty()
    }
}

// =============================================================================
// Document Loaders
// =============================================================================

/// Source of raw JSON documents
pub trait DocumentLoader {
    /// Fetch and parse the document at a fragment-free URL
    fn load(&self, url: &Url) -> Result<Value>;
}

/// Reads `file:` URLs from disk, and `http(s):` URLs when built with `remote`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLoader;

impl DocumentLoader for DefaultLoader {
    fn load(&self, url: &Url) -> Result<Value> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| GenError::load(url.as_str(), "not a local path"))?;
                let content = fs::read_to_string(&path).map_err(|e| GenError::load(url.as_str(), e))?;
                serde_json::from_str(&content).map_err(|e| GenError::load(url.as_str(), e))
            }
            "http" | "https" => fetch(url),
            other => Err(GenError::load(url.as_str(), format!("unsupported scheme '{}'", other))),
        }
    }
}

#[cfg(feature = "remote")]
fn fetch(url: &Url) -> Result<Value> {
    let response = reqwest::blocking::get(url.as_str())
        .and_then(|r| r.error_for_status())
        .map_err(|e| GenError::load(url.as_str(), e))?;
    let text = response.text().map_err(|e| GenError::load(url.as_str(), e))?;
    serde_json::from_str(&text).map_err(|e| GenError::load(url.as_str(), e))
}

#[cfg(not(feature = "remote"))]
fn fetch(url: &Url) -> Result<Value> {
    Err(GenError::load(
        url.as_str(),
        "remote documents require the `remote` feature",
    ))
}

/// Serves documents registered up front
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    documents: HashMap<Url, Value>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under an absolute URI
    pub fn insert(&mut self, location: &str, document: Value) -> Result<()> {
        let url = uri::parse_absolute(location)?
            .ok_or_else(|| GenError::InvalidUri(location.to_string()))?;
        self.documents.insert(uri::document_url(&url), document);
        Ok(())
    }

    pub fn with(mut self, location: &str, document: Value) -> Result<Self> {
        self.insert(location, document)?;
        Ok(self)
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, url: &Url) -> Result<Value> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| GenError::load(url.as_str(), "no such document"))
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug)]
struct Document {
    url: Url,
    value: Value,
}

static NULL: Value = Value::Null;

/// Cache of parsed documents and resolved locations
pub struct NodeRepository {
    loader: Box<dyn DocumentLoader>,
    documents: Vec<Document>,
    doc_by_url: HashMap<Url, DocId>,
    /// Normalized (or verbatim relative) URI -> node
    nodes: HashMap<String, NodeKey>,
    roots: Vec<DocId>,
    search_locations: Vec<Url>,
    canonical: HashMap<String, String>,
}

impl Default for NodeRepository {
    fn default() -> Self {
        Self::new(Box::new(DefaultLoader))
    }
}

impl NodeRepository {
    pub fn new(loader: Box<dyn DocumentLoader>) -> Self {
        Self {
            loader,
            documents: Vec::new(),
            doc_by_url: HashMap::new(),
            nodes: HashMap::new(),
            roots: Vec::new(),
            search_locations: Vec::new(),
            canonical: HashMap::new(),
        }
    }

    /// Load a root document and register its directory as a search location
    pub fn add_root(&mut self, location: &str) -> Result<NodeKey> {
        let url = match uri::parse_absolute(location)? {
            Some(url) => url,
            None => uri::from_path(std::path::Path::new(location))?,
        };
        let key = self.resolve_url(&url)?;
        if !self.roots.contains(&key.doc) {
            self.roots.push(key.doc);
        }

        let base = uri::join(&self.documents[key.doc].url, "./")?;
        if !self.search_locations.contains(&base) {
            self.search_locations.push(base);
        }
        tracing::info!(root = %url, "Registered root document");
        Ok(key)
    }

    /// Register an extra base location for relative lookups
    pub fn add_search_location(&mut self, location: &str) -> Result<()> {
        let dir = uri::as_directory(location)?;
        if !self.search_locations.contains(&dir) {
            self.search_locations.push(dir);
        }
        Ok(())
    }

    /// Resolve a URI (absolute, or relative to the search locations) to a node
    pub fn resolve(&mut self, location: &str) -> Result<NodeKey> {
        if let Some(key) = self.nodes.get(location) {
            return Ok(key.clone());
        }

        if let Some(url) = uri::parse_absolute(location)? {
            let key = self.resolve_url(&url)?;
            self.nodes.insert(location.to_string(), key.clone());
            return Ok(key);
        }

        let mut last_error = None;
        for base in self.search_locations.clone() {
            let url = uri::join(&base, location)?;
            match self.resolve_url(&url) {
                Ok(key) => {
                    self.nodes.insert(location.to_string(), key.clone());
                    return Ok(key);
                }
                Err(e) if e.is_missing_node() => {
                    tracing::debug!(location, base = %base, error = %e, "Search location did not match");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| GenError::load(location, "no search location is registered")))
    }

    /// Resolve an absolute URL to a node
    pub fn resolve_url(&mut self, url: &Url) -> Result<NodeKey> {
        let url = uri::normalize(url.clone());
        if let Some(key) = self.nodes.get(url.as_str()) {
            return Ok(key.clone());
        }

        let doc = self.load_document(&uri::document_url(&url))?;
        let tokens = url.fragment().map(uri::pointer_tokens).unwrap_or_default();
        let key = self.walk(doc, &tokens, &url)?;
        self.nodes.insert(url.to_string(), key.clone());
        Ok(key)
    }

    fn walk(&self, doc: DocId, tokens: &[String], url: &Url) -> Result<NodeKey> {
        let mut current = &self.documents[doc].value;
        for token in tokens {
            let next = match current {
                Value::Object(map) => map.get(token),
                Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| GenError::Fragment {
                uri: url.to_string(),
                segment: token.clone(),
            })?;
        }
        Ok(NodeKey {
            doc,
            pointer: uri::pointer_from_tokens(tokens),
        })
    }

    fn load_document(&mut self, doc_url: &Url) -> Result<DocId> {
        if let Some(&doc) = self.doc_by_url.get(doc_url) {
            return Ok(doc);
        }

        tracing::debug!(url = %doc_url, "Loading document");
        let value = self.loader.load(doc_url)?;
        let doc = self.documents.len();

        // A document announcing an absolute id is reachable under that id too
        let declared_id = ["$id", "id"]
            .iter()
            .filter_map(|k| value.get(*k).and_then(Value::as_str))
            .find_map(|id| Url::parse(id).ok())
            .map(|id| uri::document_url(&uri::normalize(id)));

        self.documents.push(Document {
            url: doc_url.clone(),
            value,
        });
        self.doc_by_url.insert(doc_url.clone(), doc);
        if let Some(id) = declared_id {
            self.doc_by_url.entry(id).or_insert(doc);
        }
        Ok(doc)
    }

    /// The node value behind a key
    pub fn node(&self, key: &NodeKey) -> &Value {
        self.documents
            .get(key.doc)
            .and_then(|d| d.value.pointer(&key.pointer))
            .unwrap_or(&NULL)
    }

    /// Root value of a loaded document
    pub fn document(&self, doc: DocId) -> &Value {
        self.documents.get(doc).map(|d| &d.value).unwrap_or(&NULL)
    }

    /// Full URL a node was loaded from
    ///
    /// Keys are only ever minted by this repository, so the document exists.
    pub fn url_of(&self, key: &NodeKey) -> Url {
        uri::with_pointer(&self.documents[key.doc].url, &key.pointer)
    }

    /// Fragment-free URL of a loaded document
    pub fn document_url(&self, doc: DocId) -> Option<&Url> {
        self.documents.get(doc).map(|d| &d.url)
    }

    pub fn roots(&self) -> &[DocId] {
        &self.roots
    }

    pub fn search_locations(&self) -> &[Url] {
        &self.search_locations
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Record that `from` was reached through a reference pointing at `to`
    pub fn record_canonical(&mut self, from: &str, to: &str) {
        if from != to {
            self.canonical.insert(from.to_string(), to.to_string());
        }
    }

    /// Location `location` ultimately points to, or itself when none was recorded
    pub fn canonicalize(&self, location: &str) -> String {
        let mut current = location;
        let mut seen = HashSet::new();
        while let Some(next) = self.canonical.get(current) {
            if !seen.insert(current) {
                break;
            }
            current = next;
        }
        current.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn repository(docs: &[(&str, Value)]) -> NodeRepository {
        let mut loader = MemoryLoader::new();
        for (location, doc) in docs {
            loader.insert(location, doc.clone()).unwrap();
        }
        NodeRepository::new(Box::new(loader))
    }

    #[test]
    fn test_fragment_round_trip() {
        let mut repo = repository(&[("file:///r.json", json!({"a": {"b": [1, 2, 3]}}))]);
        repo.add_root("file:///r.json").unwrap();
        let key = repo.resolve("file:///r.json#/a/b/1").unwrap();
        assert_eq!(repo.node(&key), &json!(2));
    }

    #[test]
    fn test_empty_key_is_addressable() {
        let mut repo = repository(&[("file:///r.json", json!({"a": {"": {"b": 7}, "b": 1}}))]);
        let key = repo.resolve("file:///r.json#/a//b").unwrap();
        assert_eq!(key.pointer, "/a//b");
        assert_eq!(repo.node(&key), &json!(7));
    }

    #[test]
    fn test_fragment_error_names_segment() {
        let mut repo = repository(&[("file:///r.json", json!({"a": {"b": 1}}))]);
        let err = repo.resolve("file:///r.json#/a/missing/deeper").unwrap_err();
        match err {
            GenError::Fragment { segment, .. } => assert_eq!(segment, "missing"),
            other => panic!("Expected Fragment, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_lookup_uses_search_locations_in_order() {
        let mut repo = repository(&[
            ("file:///first/root.json", json!({})),
            ("file:///second/shared.json", json!({"from": "second"})),
            ("file:///third/shared.json", json!({"from": "third"})),
        ]);
        repo.add_root("file:///first/root.json").unwrap();
        repo.add_search_location("file:///second").unwrap();
        repo.add_search_location("file:///third").unwrap();

        let key = repo.resolve("shared.json").unwrap();
        assert_eq!(repo.node(&key)["from"], json!("second"));
        assert_eq!(repo.url_of(&key).as_str(), "file:///second/shared.json");
    }

    #[test]
    fn test_equivalent_spellings_share_identity() {
        let mut repo = repository(&[("file:///s/a.json", json!({"definitions": {"x": {}}}))]);
        let k1 = repo.resolve("file:///s/a.json#/definitions/x").unwrap();
        let k2 = repo.resolve("file:///s/./sub/../a.json#/definitions/x/").unwrap();
        assert_eq!(k1, k2);
    }

    struct CountingLoader {
        inner: MemoryLoader,
        calls: Rc<Cell<usize>>,
    }

    impl DocumentLoader for CountingLoader {
        fn load(&self, url: &Url) -> Result<Value> {
            self.calls.set(self.calls.get() + 1);
            self.inner.load(url)
        }
    }

    #[test]
    fn test_each_document_is_loaded_once() {
        let calls = Rc::new(Cell::new(0));
        let inner = MemoryLoader::new()
            .with("file:///d.json", json!({"a": 1, "b": 2}))
            .unwrap();
        let mut repo = NodeRepository::new(Box::new(CountingLoader {
            inner,
            calls: calls.clone(),
        }));

        repo.resolve("file:///d.json#/a").unwrap();
        repo.resolve("file:///d.json#/b").unwrap();
        repo.resolve("file:///d.json").unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_missing_document_is_load_error() {
        let mut repo = repository(&[]);
        let err = repo.resolve("file:///nowhere.json").unwrap_err();
        assert!(matches!(err, GenError::Load { .. }));
    }

    #[test]
    fn test_declared_id_aliases_document() {
        let mut repo = repository(&[(
            "file:///local/base.json",
            json!({"$id": "https://example.com/schemas/base.json", "type": "object"}),
        )]);
        let local = repo.resolve("file:///local/base.json").unwrap();
        let by_id = repo.resolve("https://example.com/schemas/base.json").unwrap();
        assert_eq!(local, by_id);
    }

    #[test]
    fn test_canonicalize_follows_chain() {
        let mut repo = repository(&[]);
        repo.record_canonical("a", "b");
        repo.record_canonical("b", "c");
        repo.record_canonical("x", "y");
        repo.record_canonical("y", "x");
        assert_eq!(repo.canonicalize("a"), "c");
        assert_eq!(repo.canonicalize("unknown"), "unknown");
        // Loops terminate
        let looped = repo.canonicalize("x");
        assert!(looped == "x" || looped == "y");
    }
}
