//! Schema Class Generator
//!
//! Resolves JSON Schema documents, possibly split across many files and
//! linked by `$ref`, into a typed class model: classes with fields,
//! inheritance, documentation, default values and validation constraints.
//!
//! ## Features
//!
//! - **Graph Resolution**: Documents are loaded once per URI, fragments are
//!   resolved as JSON pointers, reference-equivalent URIs share one identity
//! - **Cycle Safety**: Self-referencing schemas resolve to placeholders that
//!   are filled in as recursion unwinds
//! - **Dialects**: draft-03, draft-04, draft-06 and draft-07 keyword sets
//! - **Type Mapping**: Object schemas become classes, `allOf` patterns become
//!   inheritance, enumerations and bounds become constraint descriptions
//! - **Diagnostics**: Anything the schemas get wrong degrades to a permissive
//!   type and is reported, never aborting the run
//!
//! ## Architecture
//!
//! ```text
//! repository  documents, URIs, JSON pointers, canonical URI map
//!     │
//! schema      one Schema per node (SchemaArena), dialect handling
//!     │
//! types       TypeGraph of classes, fields, constraints, defaults
//!     │
//! pipeline    runs it all for a GeneratorConfig → GeneratedModel
//!     │
//! emit        Emitter implementations (JSON descriptors)
//! ```

pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod repository;
pub mod schema;
pub mod types;
pub mod uri;

pub use config::{CompiledSettings, Feature, GeneratorConfig, RootConfig, Settings};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use emit::{Emitter, FieldPayload, JsonDescriptorEmitter};
pub use error::{GenError, Result};
pub use pipeline::{GeneratedModel, Pipeline};
pub use repository::{DefaultLoader, DocumentLoader, MemoryLoader, NodeKey, NodeRepository};
pub use schema::{Draft, Schema, SchemaArena, SchemaBuilder, SchemaId, SchemaKind};
pub use types::{ClassDef, ClassId, Constraint, DefaultLiteral, Field, Primitive, TargetType, TypeBuilder, TypeGraph};
