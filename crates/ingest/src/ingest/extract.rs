//! 정규식 추출 적재
//!
//! 라인을 `(line_no, line)` 스테이징 테이블에 올린 뒤 엔진의 `regexp_extract`
//! 구조체 형식으로 캡처 그룹을 컬럼으로 꺼냅니다. 일치하지 않는 라인은 reject가 됩니다.

use std::path::Path;

use logsift_core::engine::SqlEngine;
use logsift_core::types::Cell;
use regex::Regex;

use crate::catalog::FormatDescriptor;
use crate::config::SessionConfig;
use crate::error::LogIngestError;
use crate::sql::{self, Ident, Literal, SelectBuilder};

use super::lines::{non_blank_lines, read_text};
use super::{IngestState, IngestTables, transition};

/// 일치하지 않는 라인의 reject 메시지
pub(crate) fn mismatch_message(slug: &str) -> String {
    format!("line does not match pattern for format '{slug}'")
}

/// 캡처 그룹 `n`(1부터)을 담는 구조체 필드 이름
fn group_field(n: usize) -> String {
    format!("g{n}")
}

pub(crate) fn ingest_regex(
    engine: &mut dyn SqlEngine,
    tables: &IngestTables,
    path: &Path,
    format: &FormatDescriptor,
    regex: &Regex,
    config: &SessionConfig,
) -> Result<(), LogIngestError> {
    transition(IngestState::TableCreate);

    engine.execute(&format!(
        "CREATE TABLE {} (line_no BIGINT, line VARCHAR)",
        tables.raw
    ))?;

    let text = read_text(path)?;
    let mut batch: Vec<Vec<Cell>> = Vec::new();
    let mut staged = 0;
    for (line_no, line) in non_blank_lines(&text) {
        batch.push(vec![Cell::Int(line_no as i64), Cell::from(line)]);
        if batch.len() >= config.staging_batch_size {
            staged += engine.append_rows(tables.raw.as_str(), &batch)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        staged += engine.append_rows(tables.raw.as_str(), &batch)?;
    }
    if staged == 0 {
        return Err(LogIngestError::EmptyInput {
            path: path.display().to_string(),
        });
    }
    tracing::debug!(lines = staged, slug = %format.slug, "staged raw lines");

    let pattern = Literal::new(regex.as_str());
    let matches = format!("regexp_matches(line, {pattern})");

    let primary = if format.schema.is_empty() {
        SelectBuilder::from(&tables.raw)
            .column("line")
            .filter(matches.clone())
            .order_by("line_no")
    } else {
        // 인덱스 형식은 그룹 9까지만 받으므로 구조체 형식으로 한 번에 꺼냄
        let fields: Vec<String> = (1..=format.schema.len())
            .map(|i| Literal::new(group_field(i)).to_string())
            .collect();
        let captured = SelectBuilder::from(&tables.raw)
            .column("line_no")
            .column(format!(
                "regexp_extract(line, {pattern}, [{}]) AS captured",
                fields.join(", ")
            ))
            .filter(matches.clone());

        let mut primary =
            SelectBuilder::from(format!("({}) AS extracted", captured.build())).order_by("line_no");
        for (i, column) in format.schema.iter().enumerate() {
            let extracted = format!("captured.{}", group_field(i + 1));
            let expr = if column.sql_type.is_text() {
                extracted
            } else {
                sql::try_cast(&extracted, column.sql_type)
            };
            primary = primary.column_as(expr, &Ident::new(&column.name)?);
        }
        primary
    };
    engine.execute(&sql::create_table_as(&tables.primary, &primary.build()))?;

    transition(IngestState::RejectResolution);

    let rejects = SelectBuilder::from(&tables.raw)
        .column("line_no AS line_number")
        .column("line AS raw_line")
        .column(format!(
            "{} AS error_message",
            Literal::new(mismatch_message(&format.slug))
        ))
        .column("NULL::VARCHAR AS column_name")
        .filter(format!("NOT {matches}"))
        .order_by("line_no");
    engine.execute(&sql::create_table_as(&tables.rejects, &rejects.build()))?;
    Ok(())
}
