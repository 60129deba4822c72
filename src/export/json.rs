//! JSON export implementation.
//!
//! Exports analysis results in JSON format for machine-readable output.

use super::{ExportData, Exporter};
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

#[derive(Serialize)]
struct JsonUnusedFile {
    file: String,
    completely_unused: bool,
    exports: Vec<String>,
}

#[derive(Serialize)]
struct JsonCycle {
    file: String,
    chain: Vec<String>,
    path: String,
}

#[derive(Serialize)]
struct JsonSummary {
    files_processed: usize,
    import_count: usize,
    export_count: usize,
    not_used_export_count: usize,
    completely_unused_files: usize,
    circular_import_count: usize,
    scan_anomalies: usize,
    elapsed_ms: u128,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport {
    project: JsonProject,
    summary: JsonSummary,
    unused_exports: Vec<JsonUnusedFile>,
    circular_imports: Vec<JsonCycle>,
}

#[derive(Serialize)]
struct JsonProject {
    name: String,
    root: String,
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let unused_exports = data
            .unused_exports
            .iter()
            .map(|r| JsonUnusedFile {
                file: data.relative(&r.file),
                completely_unused: r.is_completely_unused,
                exports: r.not_used_exports.clone(),
            })
            .collect();

        let circular_imports = data
            .circular_imports
            .iter()
            .map(|r| JsonCycle {
                file: data.relative(&r.file),
                chain: r
                    .circular_import_chain
                    .iter()
                    .flatten()
                    .map(|f| data.relative(f))
                    .collect(),
                path: data.cycle_path(r),
            })
            .collect();

        let summary = &data.summary;
        let export = JsonExport {
            project: JsonProject {
                name: data.project_name.clone(),
                root: data.root.display().to_string(),
            },
            summary: JsonSummary {
                files_processed: summary.files_processed,
                import_count: summary.import_count,
                export_count: summary.export_count,
                not_used_export_count: summary.not_used_export_count,
                completely_unused_files: data.completely_unused_count(),
                circular_import_count: summary.circular_import_count,
                scan_anomalies: summary.scan_anomalies,
                elapsed_ms: summary.elapsed_ms(),
                warnings: summary.warnings.clone(),
            },
            unused_exports,
            circular_imports,
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}
