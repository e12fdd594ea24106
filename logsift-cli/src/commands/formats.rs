//! `logsift formats` command handler

use std::io::Write;

use serde::Serialize;

use logsift_core::config::LogsiftConfig;
use logsift_ingest::FormatDescriptor;

use crate::cli::FormatsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, write_table};

/// Execute the `formats` command.
pub async fn execute(
    args: FormatsArgs,
    config: &LogsiftConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let catalog = super::load_catalog(config).await?;

    let formats: Vec<FormatRow> = match args.category.as_deref() {
        Some(category) => catalog.by_category(category).map(FormatRow::from).collect(),
        None => catalog.formats().iter().map(FormatRow::from).collect(),
    };
    tracing::debug!(
        count = formats.len(),
        category = args.category.as_deref().unwrap_or("*"),
        "listing formats"
    );

    writer.render(&FormatsReport {
        category: args.category,
        formats,
    })
}

/// Catalog listing.
#[derive(Debug, Serialize)]
pub struct FormatsReport {
    pub category: Option<String>,
    pub formats: Vec<FormatRow>,
}

/// One catalog entry.
#[derive(Debug, Serialize)]
pub struct FormatRow {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub file_extension: String,
    pub columns: Vec<String>,
    pub has_default_query: bool,
}

impl From<&FormatDescriptor> for FormatRow {
    fn from(format: &FormatDescriptor) -> Self {
        Self {
            slug: format.slug.clone(),
            name: format.name.clone(),
            category: format.category.clone(),
            file_extension: format.file_extension.clone(),
            columns: format.schema.iter().map(|c| c.name.clone()).collect(),
            has_default_query: format
                .default_query
                .as_deref()
                .is_some_and(|q| !q.trim().is_empty()),
        }
    }
}

impl Render for FormatsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.formats.is_empty() {
            return match &self.category {
                Some(category) => writeln!(w, "No formats in category '{category}'."),
                None => writeln!(w, "Catalog is empty."),
            };
        }

        let columns = ["slug", "name", "category", "ext", "columns"].map(str::to_owned);
        let rows: Vec<Vec<String>> = self
            .formats
            .iter()
            .map(|f| {
                vec![
                    f.slug.clone(),
                    f.name.clone(),
                    f.category.clone(),
                    f.file_extension.clone(),
                    if f.columns.is_empty() {
                        "(inferred)".to_owned()
                    } else {
                        f.columns.len().to_string()
                    },
                ]
            })
            .collect();
        write_table(w, &columns, &rows)?;
        writeln!(w, "\n{} formats", self.formats.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsift_ingest::FormatCatalog;

    fn report(category: Option<&str>) -> FormatsReport {
        let catalog = FormatCatalog::builtin().expect("builtin catalog");
        let formats = match category {
            Some(c) => catalog.by_category(c).map(FormatRow::from).collect(),
            None => catalog.formats().iter().map(FormatRow::from).collect(),
        };
        FormatsReport {
            category: category.map(str::to_owned),
            formats,
        }
    }

    #[test]
    fn lists_builtin_formats() {
        let report = report(None);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("utf8");
        assert!(output.contains("nginx_combined"));
        assert!(output.contains("generic_csv"));
        assert!(output.contains(&format!("{} formats", report.formats.len())));
    }

    #[test]
    fn category_filter_narrows_listing() {
        let report = report(Some("system"));
        assert!(!report.formats.is_empty());
        assert!(report.formats.iter().all(|f| f.category == "system"));
    }

    #[test]
    fn empty_category_renders_message() {
        let report = report(Some("no-such-category"));
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("utf8");
        assert_eq!(output.trim(), "No formats in category 'no-such-category'.");
    }

    #[test]
    fn row_reports_default_query() {
        let catalog = FormatCatalog::builtin().expect("builtin catalog");
        let nginx = catalog.get("nginx_combined").expect("nginx format");
        let row = FormatRow::from(nginx);
        assert!(row.columns.contains(&"status".to_owned()));
    }
}
