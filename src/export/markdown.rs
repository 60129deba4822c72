//! Markdown export implementation.
//!
//! Exports analysis results in Markdown format for documentation and reporting.

use super::{ExportData, Exporter};
use std::io::{self, Write};

/// Markdown exporter implementation.
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "# Export Analysis Report")?;
        writeln!(writer)?;
        writeln!(writer, "**Project:** {}", data.project_name)?;
        writeln!(writer)?;

        let summary = &data.summary;
        writeln!(writer, "## Summary")?;
        writeln!(writer)?;
        writeln!(writer, "| Metric | Count |")?;
        writeln!(writer, "|--------|-------|")?;
        writeln!(writer, "| Files Processed | {} |", summary.files_processed)?;
        writeln!(writer, "| Imports | {} |", summary.import_count)?;
        writeln!(writer, "| Exports | {} |", summary.export_count)?;
        writeln!(writer, "| Unused Exports | {} |", summary.not_used_export_count)?;
        writeln!(
            writer,
            "| Completely Unused Files | {} |",
            data.completely_unused_count()
        )?;
        writeln!(writer, "| Circular Imports | {} |", summary.circular_import_count)?;
        writeln!(writer, "| Elapsed | {} ms |", summary.elapsed_ms())?;
        writeln!(writer)?;

        if !data.unused_exports.is_empty() {
            writeln!(writer, "## Unused Exports")?;
            writeln!(writer)?;
            writeln!(writer, "| File | Exports | Completely Unused |")?;
            writeln!(writer, "|------|---------|-------------------|")?;
            for result in &data.unused_exports {
                let names: Vec<String> = result
                    .not_used_exports
                    .iter()
                    .map(|name| format!("`{}`", name))
                    .collect();
                writeln!(
                    writer,
                    "| {} | {} | {} |",
                    data.relative(&result.file),
                    names.join(", "),
                    if result.is_completely_unused { "yes" } else { "" }
                )?;
            }
            writeln!(writer)?;
        }

        if !data.circular_imports.is_empty() {
            writeln!(writer, "## Circular Imports")?;
            writeln!(writer)?;
            writeln!(writer, "The following import cycles were detected:")?;
            writeln!(writer)?;
            for (i, result) in data.circular_imports.iter().enumerate() {
                writeln!(writer, "{}. `{}`", i + 1, data.cycle_path(result))?;
            }
            writeln!(writer)?;
        }

        if !summary.warnings.is_empty() {
            writeln!(writer, "## Warnings")?;
            writeln!(writer)?;
            for warning in &summary.warnings {
                writeln!(writer, "- {}", warning)?;
            }
            writeln!(writer)?;
        }

        writeln!(writer, "---")?;
        writeln!(writer, "*Generated by exportscope*")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::sample_data;

    fn render(data: &ExportData) -> String {
        let mut output = Vec::new();
        MarkdownExporter.export(data, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_markdown_export_summary() {
        let md_str = render(&sample_data());

        assert!(md_str.contains("# Export Analysis Report"));
        assert!(md_str.contains("**Project:** sample-app"));
        assert!(md_str.contains("| Files Processed | 4 |"));
        assert!(md_str.contains("| Unused Exports | 3 |"));
        assert!(md_str.contains("| Completely Unused Files | 1 |"));
        assert!(md_str.contains("| Circular Imports | 1 |"));
    }

    #[test]
    fn test_markdown_export_sections() {
        let md_str = render(&sample_data());

        assert!(md_str.contains("## Unused Exports"));
        assert!(md_str.contains("| src/legacy.ts | `default` | yes |"));
        assert!(md_str.contains("| src/util.ts | `formatDate`, `parse,Value` |  |"));
        assert!(md_str.contains("## Circular Imports"));
        assert!(md_str.contains("1. `src/a.ts -> src/b.ts -> src/a.ts`"));
        assert!(md_str.contains("## Warnings"));
    }

    #[test]
    fn test_markdown_export_footer() {
        let md_str = render(&sample_data());
        assert!(md_str.contains("---"));
        assert!(md_str.contains("*Generated by exportscope*"));
    }

    #[test]
    fn test_markdown_export_no_finding_sections_when_empty() {
        let data = ExportData::new("clean", "/project", &Default::default());
        let md_str = render(&data);
        assert!(!md_str.contains("## Unused Exports"));
        assert!(!md_str.contains("## Circular Imports"));
        assert!(!md_str.contains("## Warnings"));
    }
}
