//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! This keeps format-specific logic out of command handlers entirely.

use std::io::Write;

use colored::Colorize;
use logsift_core::types::QueryResult;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Widest a single text-table cell may grow before it is truncated.
pub const MAX_CELL_WIDTH: usize = 48;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use logsift_cli::cli::OutputFormat;
    /// use logsift_cli::output::OutputWriter;
    ///
    /// let writer = OutputWriter::new(OutputFormat::Text);
    /// ```
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// The selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(&mut handle, payload)?;
        handle.flush()?;
        Ok(())
    }

    /// Render a payload to an arbitrary writer.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

impl Render for QueryResult {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        write_table(w, &self.columns, &self.rows)
    }
}

/// Write an aligned text table. NULL cells render as empty strings.
pub fn write_table<C: std::fmt::Display>(
    w: &mut dyn Write,
    columns: &[String],
    rows: &[Vec<C>],
) -> std::io::Result<()> {
    if columns.is_empty() {
        return writeln!(w, "(no columns)");
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| clip(&cell.to_string())).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| clip(c).chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(name, width)| pad(&clip(name), *width))
        .collect();
    writeln!(w, "{}", header.join(" | ").bold())?;

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(w, "{}", rule.join("-+-"))?;

    for row in &cells {
        let line: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| pad(row.get(i).map_or("", String::as_str), *width))
            .collect();
        writeln!(w, "{}", line.join(" | ").trim_end())?;
    }

    Ok(())
}

fn clip(value: &str) -> String {
    let single_line = value.replace(['\n', '\r', '\t'], " ");
    if single_line.chars().count() <= MAX_CELL_WIDTH {
        return single_line;
    }
    let mut clipped: String = single_line.chars().take(MAX_CELL_WIDTH - 1).collect();
    clipped.push('…');
    clipped
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{value}{}", " ".repeat(width.saturating_sub(len)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsift_core::types::Cell;

    #[derive(Serialize)]
    struct TestPayload {
        field1: String,
        field2: u32,
    }

    impl Render for TestPayload {
        fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "Field1: {}", self.field1)?;
            writeln!(w, "Field2: {}", self.field2)?;
            Ok(())
        }
    }

    fn render_with<T: Render + Serialize>(format: OutputFormat, payload: &T) -> String {
        let mut buffer = Vec::new();
        OutputWriter::new(format)
            .render_to(&mut buffer, payload)
            .expect("rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_output_writer_text_format() {
        let payload = TestPayload {
            field1: "test value".to_owned(),
            field2: 42,
        };
        let output = render_with(OutputFormat::Text, &payload);
        assert!(output.contains("Field1: test value"), "should render field1");
        assert!(output.contains("Field2: 42"), "should render field2");
    }

    #[test]
    fn test_output_writer_json_format() {
        let payload = TestPayload {
            field1: "test".to_owned(),
            field2: 100,
        };
        let output = render_with(OutputFormat::Json, &payload);
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("should parse JSON");
        assert_eq!(parsed["field1"].as_str(), Some("test"));
        assert_eq!(parsed["field2"].as_u64(), Some(100));
    }

    #[test]
    fn test_query_result_json_keeps_null() {
        let result = QueryResult::new(
            vec!["status".to_owned(), "bytes".to_owned()],
            vec![vec![Cell::Int(200), Cell::Null]],
        );
        let output = render_with(OutputFormat::Json, &result);
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("should parse JSON");
        assert_eq!(parsed["rows"][0][0].as_i64(), Some(200));
        assert!(parsed["rows"][0][1].is_null(), "NULL must serialize as JSON null");
    }

    #[test]
    fn test_table_renders_null_as_empty() {
        let result = QueryResult::new(
            vec!["a".to_owned(), "b".to_owned()],
            vec![
                vec![Cell::Text("x".to_owned()), Cell::Null],
                vec![Cell::Null, Cell::Int(7)],
            ],
        );
        let output = render_with(OutputFormat::Text, &result);
        assert!(!output.contains("null"));
        assert!(!output.contains("NULL"));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4, "header, rule and two rows");
        assert_eq!(lines[2], "x |");
        assert!(lines[3].ends_with('7'));
    }

    #[test]
    fn test_table_clips_long_cells() {
        let long = "x".repeat(MAX_CELL_WIDTH * 2);
        let result = QueryResult::new(vec!["v".to_owned()], vec![vec![Cell::Text(long)]]);
        let output = render_with(OutputFormat::Text, &result);
        let row = output.lines().nth(2).expect("row line");
        assert_eq!(row.chars().count(), MAX_CELL_WIDTH);
        assert!(row.ends_with('…'));
    }

    #[test]
    fn test_table_without_columns() {
        let output = render_with(OutputFormat::Text, &QueryResult::default());
        assert_eq!(output.trim(), "(no columns)");
    }

    #[test]
    fn test_table_unicode_alignment() {
        let result = QueryResult::new(
            vec!["name".to_owned()],
            vec![vec![Cell::Text("한글".to_owned())], vec![Cell::Text("abcdef".to_owned())]],
        );
        let output = render_with(OutputFormat::Text, &result);
        assert!(output.contains("한글"));
        let rule = output.lines().nth(1).expect("rule line");
        assert_eq!(rule, "------");
    }
}
