//! Emission boundary
//!
//! An [`Emitter`] turns a [`GeneratedModel`] into files. The core never
//! renders source code itself; [`FieldPayload`] is the language-neutral view
//! of a field that an emitter works from. [`JsonDescriptorEmitter`] writes
//! one JSON descriptor per class, which is enough to drive an external
//! template or to diff runs.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{OutputConfig, OutputFormat};
use crate::error::Result;
use crate::pipeline::GeneratedModel;
use crate::types::{Accessor, ClassDef, DefaultLiteral, Field, TypeGraph};

/// Writes the output of a run
pub trait Emitter {
    /// Returns the paths written
    fn emit(&self, model: &GeneratedModel) -> Result<Vec<PathBuf>>;
}

/// What an emitter needs to render one field
#[derive(Debug, Clone, Serialize)]
pub struct FieldPayload<'a> {
    pub name: &'a str,
    pub type_name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'a DefaultLiteral>,
    /// Guard clauses in plain text; empty when validation is suppressed
    pub validation: Vec<String>,
    pub accessors: &'a [Accessor],
}

impl<'a> FieldPayload<'a> {
    pub fn new(field: &'a Field, graph: &TypeGraph) -> Self {
        Self {
            name: &field.name,
            type_name: field.ty.display(graph),
            required: field.required,
            doc: field.doc.as_deref(),
            default: field.default.as_ref(),
            validation: field.validation_lines(),
            accessors: &field.accessors,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClassDescriptor<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    superclass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<&'a str>,
    fields: Vec<FieldPayload<'a>>,
    uris: Vec<&'a str>,
}

impl<'a> ClassDescriptor<'a> {
    fn new(class: &'a ClassDef, graph: &TypeGraph) -> Self {
        Self {
            name: &class.name,
            package: class.package.as_deref(),
            header: class.header.as_deref(),
            superclass: class.superclass.map(|s| qualified_name(graph.class(s))),
            doc: class.doc.as_deref(),
            fields: class.fields.iter().map(|f| FieldPayload::new(f, graph)).collect(),
            uris: class.uris.iter().map(String::as_str).collect(),
        }
    }
}

/// `package.Class`, or the bare name for classes outside any package
pub fn qualified_name(class: &ClassDef) -> String {
    match &class.package {
        Some(package) if !package.is_empty() => format!("{}.{}", package, class.name),
        _ => class.name.clone(),
    }
}

/// Writes `<out>/<package path>/<Class>.json` per class plus `class-uris.json`
pub struct JsonDescriptorEmitter {
    out_dir: PathBuf,
    format: OutputFormat,
}

impl JsonDescriptorEmitter {
    pub fn new(out_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            out_dir: out_dir.into(),
            format,
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(output.dir.clone(), output.format)
    }

    fn class_path(&self, class: &ClassDef) -> PathBuf {
        let mut path = self.out_dir.clone();
        if let Some(package) = &class.package {
            path.extend(package.split('.').filter(|s| !s.is_empty()));
        }
        path.join(format!("{}.json", class.name))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            OutputFormat::Compact => serde_json::to_string(value)?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Emitter for JsonDescriptorEmitter {
    fn emit(&self, model: &GeneratedModel) -> Result<Vec<PathBuf>> {
        let graph = &model.types;
        let mut written = Vec::with_capacity(graph.classes().len() + 1);

        for id in graph.inheritance_order() {
            let class = graph.class(id);
            let path = self.class_path(class);
            self.write_json(&path, &ClassDescriptor::new(class, graph))?;
            tracing::debug!(class = %class.name, path = %path.display(), "Wrote descriptor");
            written.push(path);
        }

        let index = self.out_dir.join("class-uris.json");
        self.write_json(&index, &model.class_uris)?;
        written.push(index);

        tracing::info!(files = written.len(), out = %self.out_dir.display(), "Emitted descriptors");
        Ok(written)
    }
}
