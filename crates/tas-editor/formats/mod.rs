//! Script import/export
//!
//! The native on-disk form is a line-oriented structural markup (see
//! [`markup`]). The older flat format with `>startbranch` markers is
//! detected automatically and transcoded to markup before parsing (see
//! [`legacy`]). Importers produce an [`ImportedScript`] rather than a
//! document so a failed import never touches the document being replaced.

pub mod legacy;
pub mod markup;

pub use legacy::{is_legacy, legacy_to_markup, LegacyFormat};
pub use markup::MarkupFormat;

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::core::document::ScriptDocument;
use crate::core::errors::{EditorError, Result};
use crate::core::tree::Branch;

/// Drop a leading UTF-8 byte order mark
pub(crate) fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Metadata about a script format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    /// Format name
    pub name: String,
    /// File extensions supported by this format
    pub extensions: Vec<String>,
    /// Brief description of the format
    pub description: String,
    /// Whether branch points survive a round trip
    pub supports_branches: bool,
}

/// Configuration options for format import/export operations
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatOptions {
    /// Indent markup tags two spaces per nesting level on export
    pub indent_tags: bool,
    /// Recognize and transcode the legacy flat format on import
    pub legacy_detection: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_tags: false,
            legacy_detection: true,
        }
    }
}

/// Result of an import/export operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatResult {
    /// Number of lines processed
    pub lines_processed: usize,
    /// Whether the input was transcoded from the legacy format
    pub transcoded: bool,
    /// Warnings encountered during processing
    pub warnings: Vec<String>,
}

impl FormatResult {
    /// Create a successful result
    #[must_use]
    pub fn success(lines_processed: usize) -> Self {
        Self {
            lines_processed,
            ..Self::default()
        }
    }

    /// Attach warnings
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Everything an import produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedScript {
    /// Stage the script was recorded on
    pub stage: String,
    /// Rerecord count, if the file stored one
    pub rerecords: Option<u32>,
    /// Script tree
    pub root: Branch,
}

/// Trait for importing script files
pub trait FormatImporter: fmt::Debug + Send + Sync {
    /// Get information about this format
    fn format_info(&self) -> &FormatInfo;

    /// Check if this importer can handle the given file extension
    fn can_import(&self, extension: &str) -> bool {
        self.format_info()
            .extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Import from a string
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidFormat`] for malformed input.
    fn import_from_string(
        &self,
        content: &str,
        options: &FormatOptions,
    ) -> Result<(ImportedScript, FormatResult)>;

    /// Import from a reader with the given options
    ///
    /// # Errors
    /// Fails on read errors, non UTF-8 input or malformed content.
    fn import_from_reader(
        &self,
        reader: &mut dyn Read,
        options: &FormatOptions,
    ) -> Result<(ImportedScript, FormatResult)> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| EditorError::io(format!("Failed to read input: {e}")))?;
        self.import_from_string(&content, options)
    }

    /// Import from a file path
    ///
    /// # Errors
    /// Fails when the file cannot be opened or its content is malformed.
    fn import_from_path(
        &self,
        path: &Path,
        options: &FormatOptions,
    ) -> Result<(ImportedScript, FormatResult)> {
        let mut file = std::fs::File::open(path)
            .map_err(|e| EditorError::io(format!("Failed to open file: {e}")))?;
        self.import_from_reader(&mut file, options)
    }
}

/// Trait for exporting documents to script files
pub trait FormatExporter: fmt::Debug + Send + Sync {
    /// Get information about this format
    fn format_info(&self) -> &FormatInfo;

    /// Check if this exporter can handle the given file extension
    fn can_export(&self, extension: &str) -> bool {
        self.format_info()
            .extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Export to a string
    fn export_to_string(&self, document: &ScriptDocument, options: &FormatOptions) -> String;

    /// Export to a writer with the given options
    ///
    /// # Errors
    /// Fails when the writer fails.
    fn export_to_writer(
        &self,
        document: &ScriptDocument,
        writer: &mut dyn Write,
        options: &FormatOptions,
    ) -> Result<FormatResult> {
        let content = self.export_to_string(document, options);
        writer
            .write_all(content.as_bytes())
            .map_err(|e| EditorError::io(format!("Failed to write output: {e}")))?;
        Ok(FormatResult::success(content.lines().count()))
    }

    /// Export to a file path
    ///
    /// # Errors
    /// Fails when the file cannot be created or written.
    fn export_to_path(
        &self,
        document: &ScriptDocument,
        path: &Path,
        options: &FormatOptions,
    ) -> Result<FormatResult> {
        let mut file = std::fs::File::create(path)
            .map_err(|e| EditorError::io(format!("Failed to create file: {e}")))?;
        self.export_to_writer(document, &mut file, options)
    }
}

/// Registry of available importers and exporters
#[derive(Debug, Default)]
pub struct FormatRegistry {
    importers: Vec<Box<dyn FormatImporter>>,
    exporters: Vec<Box<dyn FormatExporter>>,
}

impl FormatRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the markup and legacy formats
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_importer(Box::new(MarkupFormat::new()));
        registry.register_importer(Box::new(LegacyFormat::new()));
        registry.register_exporter(Box::new(MarkupFormat::new()));
        registry
    }

    /// Add an importer; earlier registrations win on extension clashes
    pub fn register_importer(&mut self, importer: Box<dyn FormatImporter>) {
        self.importers.push(importer);
    }

    /// Add an exporter; earlier registrations win on extension clashes
    pub fn register_exporter(&mut self, exporter: Box<dyn FormatExporter>) {
        self.exporters.push(exporter);
    }

    /// Importer for a file extension
    #[must_use]
    pub fn importer_for(&self, extension: &str) -> Option<&dyn FormatImporter> {
        self.importers
            .iter()
            .find(|importer| importer.can_import(extension))
            .map(AsRef::as_ref)
    }

    /// Exporter for a file extension
    #[must_use]
    pub fn exporter_for(&self, extension: &str) -> Option<&dyn FormatExporter> {
        self.exporters
            .iter()
            .find(|exporter| exporter.can_export(extension))
            .map(AsRef::as_ref)
    }

    /// Import a file, choosing the importer by extension
    ///
    /// # Errors
    /// Fails when no importer handles the extension or the import fails.
    pub fn import_path(
        &self,
        path: &Path,
        options: &FormatOptions,
    ) -> Result<(ImportedScript, FormatResult)> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let importer = self.importer_for(extension).ok_or_else(|| {
            EditorError::format(format!("no importer for extension '{extension}'"))
        })?;
        importer.import_from_path(path, options)
    }
}
