//! Diagnostics
//!
//! Collects warnings and informational notes during resolution and mapping.
//! Recoverable conditions are converted to a permissive fallback where they
//! are detected and leave an item here for later inspection.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Resolution ===
    /// A referenced document could not be loaded
    LoadFailed,
    /// A JSON pointer segment does not exist
    FragmentNotFound,
    /// `$ref` value is not a usable URI
    InvalidReference,

    // === Keywords ===
    /// Keyword is recognized but not handled
    UnsupportedKeyword,
    /// Several type tags on one schema
    MultipleTypes,
    /// Boolean exclusiveMinimum/exclusiveMaximum in a numeric-limit dialect
    LegacyExclusiveBound,

    // === Composition ===
    /// Composition the heuristics cannot characterize
    CompositionAmbiguity,
    /// Composition shape that cannot be mapped to a supertype
    NotInheritable,
    /// Supertype chain loops back to the class
    InheritanceCycle,
    /// Non-class type that contains itself
    RecursiveType,

    // === Fields ===
    /// Default literal does not match the field type
    UnparsableDefault,
    /// Property already declared by an ancestor
    FieldShadowed,
    /// Property declared twice on the same class
    FieldRedeclared,

    // === Naming ===
    /// Several fragment-free URIs identify one class
    AmbiguousClassName,
    /// Two classes derived the same name
    ClassNameCollision,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadFailed => "W001",
            Self::FragmentNotFound => "W002",
            Self::InvalidReference => "W003",
            Self::UnsupportedKeyword => "I001",
            Self::MultipleTypes => "I002",
            Self::LegacyExclusiveBound => "I003",
            Self::CompositionAmbiguity => "W004",
            Self::NotInheritable => "W005",
            Self::InheritanceCycle => "W006",
            Self::RecursiveType => "W007",
            Self::UnparsableDefault => "W008",
            Self::FieldShadowed => "I004",
            Self::FieldRedeclared => "I005",
            Self::AmbiguousClassName => "W009",
            Self::ClassNameCollision => "W010",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnsupportedKeyword
            | Self::MultipleTypes
            | Self::LegacyExclusiveBound
            | Self::FieldShadowed
            | Self::FieldRedeclared => Severity::Info,

            Self::LoadFailed
            | Self::FragmentNotFound
            | Self::InvalidReference
            | Self::CompositionAmbiguity
            | Self::NotInheritable
            | Self::InheritanceCycle
            | Self::RecursiveType
            | Self::UnparsableDefault
            | Self::AmbiguousClassName
            | Self::ClassNameCollision => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// URI (or class name) the diagnostic is about
    pub location: String,
    /// Diagnostic code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (e.g., related URIs, candidate names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(location: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.location
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item, mirroring it to the log
    pub fn push(&mut self, item: DiagnosticItem) {
        match item.severity() {
            Severity::Info => tracing::info!(code = %item.code, location = %item.location, "{}", item.message),
            Severity::Warning => tracing::warn!(code = %item.code, location = %item.location, "{}", item.message),
        }
        self.items.push(item);
    }

    /// Add an item without context
    pub fn report(
        &mut self,
        location: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) {
        self.push(DiagnosticItem::new(location, code, message));
    }

    /// Add diagnostic for a keyword that is recognized but not handled
    pub fn unsupported_keyword(&mut self, location: impl Into<String>, keyword: &str) {
        self.push(DiagnosticItem::new(
            location,
            DiagnosticCode::UnsupportedKeyword,
            format!("Keyword '{}' is not supported and was ignored", keyword),
        ));
    }

    /// Add diagnostic for a reference whose target is missing
    pub fn unresolved_ref(&mut self, location: impl Into<String>, target: &str, code: DiagnosticCode, reason: &str) {
        self.push(
            DiagnosticItem::new(
                location,
                code,
                format!("$ref target '{}' could not be resolved", target),
            )
            .with_context(reason.to_string()),
        );
    }

    /// Get all warnings
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items carrying a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    /// Whether any item carries a given code
    pub fn has(&self, code: DiagnosticCode) -> bool {
        self.with_code(code).next().is_some()
    }

    /// Get all items
    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    /// Get total count
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Count warnings
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} warning(s), {} note(s)\n",
                self.warning_count(),
                self.len() - self.warning_count()
            ));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
