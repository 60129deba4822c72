//! Plain text report for terminal output.

use super::{ExportData, Exporter};
use std::io::{self, Write};

/// Text exporter implementation.
pub struct TextExporter;

impl Exporter for TextExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let summary = &data.summary;
        writeln!(writer, "exportscope: {}", data.project_name)?;
        writeln!(
            writer,
            "  {} files, {} imports, {} exports in {} ms",
            summary.files_processed,
            summary.import_count,
            summary.export_count,
            summary.elapsed_ms()
        )?;
        writeln!(
            writer,
            "  {} unused exports ({} files completely unused), {} circular imports",
            summary.not_used_export_count,
            data.completely_unused_count(),
            summary.circular_import_count
        )?;

        if !data.unused_exports.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Unused exports:")?;
            for result in &data.unused_exports {
                let marker = if result.is_completely_unused {
                    " (completely unused)"
                } else {
                    ""
                };
                writeln!(writer, "  {}{}", data.relative(&result.file), marker)?;
                for name in &result.not_used_exports {
                    writeln!(writer, "    - {}", name)?;
                }
            }
        }

        if !data.circular_imports.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Circular imports:")?;
            for result in &data.circular_imports {
                writeln!(writer, "  {}", data.cycle_path(result))?;
            }
        }

        if !summary.warnings.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Warnings:")?;
            for warning in &summary.warnings {
                writeln!(writer, "  {}", warning)?;
            }
        }

        Ok(())
    }
}
