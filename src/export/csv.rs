//! CSV export implementation.
//!
//! One row per unused export and one row per circular import chain.

use super::{ExportData, Exporter};
use std::io::{self, Write};

/// CSV exporter implementation.
pub struct CsvExporter;

impl CsvExporter {
    /// Escape a field value for CSV format.
    ///
    /// Wraps the value in quotes if it contains commas, quotes, or newlines.
    fn escape_field(value: &str) -> String {
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

impl Exporter for CsvExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "kind,file,symbol,completely_unused,chain")?;

        for result in &data.unused_exports {
            let file = Self::escape_field(&data.relative(&result.file));
            for symbol in &result.not_used_exports {
                writeln!(
                    writer,
                    "unused,{},{},{},",
                    file,
                    Self::escape_field(symbol),
                    result.is_completely_unused
                )?;
            }
        }

        for result in &data.circular_imports {
            writeln!(
                writer,
                "circular,{},,,{}",
                Self::escape_field(&data.relative(&result.file)),
                Self::escape_field(&data.cycle_path(result))
            )?;
        }

        Ok(())
    }
}
