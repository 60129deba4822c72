//! Report output for analysis results.
//!
//! This module renders an [`AnalysisOutcome`] as plain text, JSON, CSV or
//! Markdown. File paths are shown relative to the project root.

pub mod csv;
pub mod json;
pub mod markdown;
pub mod text;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisOutcome, AnalysisResult, FileId, RunSummary};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Human-readable summary and findings
    Text,
    /// JSON format - machine-readable, full data
    Json,
    /// CSV format - one row per finding
    Csv,
    /// Markdown format - documentation/reporting
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: text, json, csv, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Text => write!(f, "text"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Data container for export operations.
#[derive(Debug, Clone)]
pub struct ExportData {
    /// Project name, from `package.json` or the directory name
    pub project_name: String,
    pub root: PathBuf,
    pub unused_exports: Vec<AnalysisResult>,
    pub circular_imports: Vec<AnalysisResult>,
    pub summary: RunSummary,
}

impl ExportData {
    /// Create new export data from one analysis outcome.
    pub fn new(project_name: impl Into<String>, root: impl AsRef<Path>, outcome: &AnalysisOutcome) -> Self {
        Self {
            project_name: project_name.into(),
            root: root.as_ref().to_path_buf(),
            unused_exports: outcome.unused_exports(),
            circular_imports: outcome.circular_imports(),
            summary: outcome.summary.clone(),
        }
    }

    /// Path of `file` relative to the project root.
    pub fn relative(&self, file: &FileId) -> String {
        file.display_relative(&self.root)
    }

    /// The full cycle of `result` starting at its anchor, e.g. `a.ts -> b.ts -> a.ts`.
    pub fn cycle_path(&self, result: &AnalysisResult) -> String {
        let chain = result.circular_import_chain.as_deref().unwrap_or_default();
        let mut parts = Vec::with_capacity(chain.len() + 2);
        parts.push(self.relative(&result.file));
        parts.extend(chain.iter().map(|file| self.relative(file)));
        parts.push(self.relative(&result.file));
        parts.join(" -> ")
    }

    /// Number of files none of whose exports are used.
    pub fn completely_unused_count(&self) -> usize {
        self.unused_exports
            .iter()
            .filter(|r| r.is_completely_unused)
            .count()
    }

    /// Returns true when anything was found.
    pub fn has_findings(&self) -> bool {
        !self.unused_exports.is_empty() || !self.circular_imports.is_empty()
    }
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()>;
}

/// Export data in the specified format.
pub fn export<W: Write>(
    format: ExportFormat,
    data: &ExportData,
    writer: &mut W,
) -> io::Result<()> {
    match format {
        ExportFormat::Text => text::TextExporter.export(data, writer),
        ExportFormat::Json => json::JsonExporter.export(data, writer),
        ExportFormat::Csv => csv::CsvExporter.export(data, writer),
        ExportFormat::Markdown => markdown::MarkdownExporter.export(data, writer),
    }
}

/// Export data to a string.
pub fn export_to_string(format: ExportFormat, data: &ExportData) -> io::Result<String> {
    let mut buffer = Vec::new();
    export(format, data, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!(
            "md".parse::<ExportFormat>().unwrap(),
            ExportFormat::Markdown
        );
        assert!("invalid".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_format_display() {
        assert_eq!(format!("{}", ExportFormat::Text), "text");
        assert_eq!(format!("{}", ExportFormat::Json), "json");
        assert_eq!(format!("{}", ExportFormat::Csv), "csv");
        assert_eq!(format!("{}", ExportFormat::Markdown), "markdown");
    }

    #[test]
    fn test_export_data_splits_findings() {
        let data = sample_data();
        assert_eq!(data.unused_exports.len(), 2);
        assert_eq!(data.circular_imports.len(), 1);
        assert_eq!(data.completely_unused_count(), 1);
        assert!(data.has_findings());
    }

    #[test]
    fn test_cycle_path_is_relative_and_closed() {
        let data = sample_data();
        assert_eq!(
            data.cycle_path(&data.circular_imports[0]),
            "src/a.ts -> src/b.ts -> src/a.ts"
        );
    }

    #[test]
    fn test_export_to_string_all_formats() {
        let data = sample_data();
        for format in [
            ExportFormat::Text,
            ExportFormat::Json,
            ExportFormat::Csv,
            ExportFormat::Markdown,
        ] {
            let output = export_to_string(format, &data).unwrap();
            assert!(output.contains("src/util.ts"), "{format} output lacks file");
        }
    }
}
