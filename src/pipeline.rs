//! Generation Pipeline
//!
//! One [`Pipeline`] owns every cache of a run: documents, schemas, target
//! types and diagnostics. Nothing is global, so independent runs can share a
//! process (and tests can run in parallel).
//!
//! ```text
//! roots ──► NodeRepository ──► SchemaBuilder ──► SchemaArena
//!                                                    │
//!                          GeneratedModel ◄── TypeBuilder
//! ```

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::{CompiledSettings, GeneratorConfig, RootConfig};
use crate::diagnostics::Diagnostics;
use crate::error::{GenError, Result};
use crate::repository::{DefaultLoader, DocumentLoader, NodeRepository};
use crate::schema::{SchemaArena, SchemaBuilder, SchemaId};
use crate::types::{TypeBuilder, TypeGraph};

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedModel {
    pub types: TypeGraph,
    /// Class name -> every URI identifying the class
    pub class_uris: BTreeMap<String, BTreeSet<String>>,
    pub diagnostics: Diagnostics,
    /// SHA-256 of the serialized type graph
    pub fingerprint: String,
    /// Number of distinct schemas resolved
    pub schema_count: usize,
    /// Number of documents loaded
    pub document_count: usize,
}

pub struct Pipeline {
    config: GeneratorConfig,
    settings: CompiledSettings,
    repo: NodeRepository,
}

impl Pipeline {
    /// Pipeline that loads documents from disk (and the network with the `remote` feature)
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Self::with_loader(config, Box::new(DefaultLoader))
    }

    pub fn with_loader(config: GeneratorConfig, loader: Box<dyn DocumentLoader>) -> Result<Self> {
        let settings = CompiledSettings::from_config(&config)?;
        Ok(Self {
            config,
            settings,
            repo: NodeRepository::new(loader),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Resolve every root and map the reachable schemas to target types
    ///
    /// Fails when no root is configured, when a root document cannot be
    /// loaded, or when an override pattern does not compile.
    pub fn run(mut self) -> Result<GeneratedModel> {
        if self.config.roots.is_empty() {
            return Err(GenError::NoRoots);
        }
        for location in &self.config.search_locations {
            self.repo.add_search_location(location)?;
        }

        let mut arena = SchemaArena::new();
        let mut diagnostics = Diagnostics::new();

        let mut roots: Vec<(SchemaId, &RootConfig)> = Vec::with_capacity(self.config.roots.len());
        for root in &self.config.roots {
            let id = SchemaBuilder::new(&mut self.repo, &mut arena, &mut diagnostics, self.config.dialect)
                .resolve_root(&root.uri)?;
            roots.push((id, root));
        }
        tracing::info!(
            schemas = arena.len(),
            documents = self.repo.document_count(),
            "Schema graph resolved"
        );

        let mut graph = TypeGraph::new();
        {
            let mut builder = TypeBuilder::new(&arena, &self.settings, &mut graph, &mut diagnostics);
            for (id, root) in &roots {
                builder.build_root(*id, &root.package, root.header.as_deref())?;
            }
        }
        tracing::info!(
            classes = graph.classes().len(),
            warnings = diagnostics.warning_count(),
            "Type graph built"
        );

        let class_uris = graph
            .classes()
            .iter()
            .map(|class| (class.name.clone(), class.uris.clone()))
            .collect();
        let fingerprint = fingerprint(&graph)?;

        Ok(GeneratedModel {
            types: graph,
            class_uris,
            diagnostics,
            fingerprint,
            schema_count: arena.len(),
            document_count: self.repo.document_count(),
        })
    }
}

/// SHA-256 over the serialized graph; identical inputs give identical fingerprints
pub fn fingerprint(graph: &TypeGraph) -> Result<String> {
    let serialized = serde_json::to_vec(graph)?;
    Ok(format!("{:x}", Sha256::digest(&serialized)))
}

/// Every `*.json` file under `dir` as a root of `package`, in path order
pub fn roots_from_directory(dir: &Path, package: &str) -> Result<Vec<RootConfig>> {
    let mut roots = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| GenError::load(dir.display().to_string(), e))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "json") {
            roots.push(RootConfig {
                uri: path.display().to_string(),
                package: package.to_string(),
                header: None,
            });
        }
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryLoader;
    use serde_json::json;

    fn config_for(uri: &str) -> GeneratorConfig {
        GeneratorConfig {
            roots: vec![RootConfig {
                uri: uri.to_string(),
                package: "model".to_string(),
                header: None,
            }],
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_no_roots_is_fatal() {
        let pipeline = Pipeline::with_loader(GeneratorConfig::default(), Box::new(MemoryLoader::new())).unwrap();
        assert!(matches!(pipeline.run(), Err(GenError::NoRoots)));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let pipeline =
            Pipeline::with_loader(config_for("file:///p/absent.json"), Box::new(MemoryLoader::new())).unwrap();
        match pipeline.run() {
            Err(GenError::Load { uri, .. }) => assert!(uri.contains("absent.json")),
            other => panic!("Expected load error, got {:?}", other.map(|m| m.fingerprint)),
        }
    }

    #[test]
    fn test_class_uris() {
        let loader = MemoryLoader::new()
            .with("file:///p/root.json", json!({"properties": {"a": {"$ref": "item.json"}}}))
            .unwrap()
            .with("file:///p/item.json", json!({"properties": {"v": {"type": "string"}}}))
            .unwrap();
        let model = Pipeline::with_loader(config_for("file:///p/root.json"), Box::new(loader))
            .unwrap()
            .run()
            .unwrap();
        let item_uris = &model.class_uris["Item"];
        assert!(item_uris.contains("file:///p/item.json"));
        assert!(item_uris.contains("file:///p/root.json#/properties/a"));
        assert_eq!(model.document_count, 2);
        assert_eq!(model.fingerprint.len(), 64);
    }

    #[test]
    fn test_roots_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.schema.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.schema.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let roots = roots_from_directory(dir.path(), "pkg").unwrap();
        let names: Vec<_> = roots
            .iter()
            .map(|r| Path::new(&r.uri).file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.schema.json", "b.schema.json"]);
        assert!(roots.iter().all(|r| r.package == "pkg"));
    }
}
