//! 구분자 기반 적재 -- 엔진 reject 기록 경로와 스테이징 차집합 경로

use std::path::Path;

use logsift_core::engine::SqlEngine;
use logsift_core::types::Cell;

use crate::catalog::{ColumnSpec, SqlType};
use crate::error::LogIngestError;
use crate::sniff::HeaderDetection;
use crate::sql::{self, Ident, Literal, SelectBuilder};

use super::lines::{offset_after_lines, read_text, trim_line_end};
use super::{IngestState, IngestTables, create_empty_rejects, transition};

/// 차집합 경로의 reject 메시지
pub(crate) const SKIPPED_LINE_MESSAGE: &str = "line skipped during CSV ingestion";

/// 구분자 기반 입력
pub(crate) struct DelimitedSource<'a> {
    pub path: &'a Path,
    pub detection: HeaderDetection,
    pub columns: &'a [ColumnSpec],
    pub delimiter: u8,
}

impl DelimitedSource<'_> {
    fn column_idents(&self) -> Result<Vec<Ident>, LogIngestError> {
        self.columns.iter().map(|c| Ident::new(&c.name)).collect()
    }
}

/// 엔진 CSV 리더로 기본 테이블을 만들고, 엔진이 기록한 reject를
/// 라인당 한 행으로 합쳐 reject 테이블을 만듭니다.
pub(crate) fn ingest_native(
    engine: &mut dyn SqlEngine,
    tables: &IngestTables,
    source: &DelimitedSource<'_>,
) -> Result<(), LogIngestError> {
    transition(IngestState::TableCreate);

    let columns: Vec<String> = source
        .columns
        .iter()
        .map(|c| format!("{}: {}", Literal::new(&c.name), Literal::new(c.sql_type.as_sql())))
        .collect();
    let reader = format!(
        "read_csv({path}, delim = {delim}, quote = '\"', escape = '\"', header = {header}, \
         skip = {skip}, auto_detect = false, columns = {{{columns}}}, store_rejects = true, \
         rejects_table = {rejects}, rejects_scan = {scans})",
        path = Literal::new(source.path.to_string_lossy()),
        delim = Literal::new(char::from(source.delimiter).to_string()),
        header = source.detection.has_header,
        skip = source.detection.header_offset,
        columns = columns.join(", "),
        rejects = Literal::new(tables.native_rejects.as_str()),
        scans = Literal::new(tables.native_scans.as_str()),
    );
    engine.execute(&sql::create_table_as(
        &tables.primary,
        &SelectBuilder::from(reader).build(),
    ))?;

    transition(IngestState::RejectResolution);

    // 오류가 없으면 엔진이 reject 테이블을 만들지 않을 수 있음
    let exists = engine
        .query(&format!(
            "SELECT count(*) FROM duckdb_tables() WHERE table_name = {}",
            Literal::new(tables.native_rejects.as_str())
        ))?
        .scalar_i64()
        .unwrap_or(0)
        > 0;
    if !exists {
        engine.execute(&create_empty_rejects(&tables.rejects))?;
        return Ok(());
    }

    // 한 라인에 여러 컬럼 오류가 있으면 메시지를 합쳐 한 행으로
    let fold = SelectBuilder::from(&tables.native_rejects)
        .column("CAST(line AS BIGINT) AS line_number")
        .column("CAST(first(csv_line) AS VARCHAR) AS raw_line")
        .column("CAST(string_agg(error_message, '; ') AS VARCHAR) AS error_message")
        .column("CAST(first(column_name) AS VARCHAR) AS column_name")
        .build();
    let mut reported = engine.query(&format!("{fold} GROUP BY line ORDER BY line"))?;

    let text = read_text(source.path)?;
    reconcile_line_numbers(&text, source.detection.lines_before_data(), &mut reported.rows);

    engine.execute(&create_empty_rejects(&tables.rejects))?;
    if !reported.rows.is_empty() {
        engine.append_rows(tables.rejects.as_str(), &reported.rows)?;
    }
    Ok(())
}

/// 엔진이 보고한 reject 라인 번호를 원본 파일의 물리적 라인 번호로 맞춥니다.
///
/// 엔진의 `csv_line`은 앞선 빈 줄을 포함할 수 있으므로 양 끝의 개행을
/// 제거한 원문을 기록합니다. 보고 순서대로 커서를 전진시키며 원문이 같은
/// 첫 라인을 찾고, 찾지 못한 행(여러 줄에 걸친 레코드 등)은 엔진의 번호를
/// 유지합니다. 행은 `(line_number, raw_line, ...)` 순서여야 합니다.
fn reconcile_line_numbers(text: &str, lines_before_data: usize, rows: &mut [Vec<Cell>]) {
    let physical: Vec<&str> = text.split('\n').map(trim_line_end).collect();
    let mut cursor = lines_before_data;
    for row in rows.iter_mut() {
        let Some(Cell::Text(raw)) = row.get(1) else {
            continue;
        };
        let raw = raw.trim_matches(['\r', '\n']).to_owned();
        if let Some(found) = physical[cursor.min(physical.len())..]
            .iter()
            .position(|line| *line == raw)
        {
            let index = cursor + found;
            row[0] = Cell::Int(index as i64 + 1);
            cursor = index + 1;
        }
        row[1] = Cell::Text(raw);
    }
}

/// 파일을 라인 번호가 붙은 스테이징 테이블에 올린 뒤, 파싱 가능한 라인만
/// 기본 테이블로 옮기고 나머지를 reject로 기록합니다.
pub(crate) fn ingest_fallback(
    engine: &mut dyn SqlEngine,
    tables: &IngestTables,
    source: &DelimitedSource<'_>,
    batch_size: usize,
) -> Result<(), LogIngestError> {
    transition(IngestState::TableCreate);

    let width = source.columns.len();
    let staged: Vec<Ident> = (0..width)
        .map(|i| Ident::new(format!("c{i}")))
        .collect::<Result<_, _>>()?;

    let mut ddl = vec![
        "line_no BIGINT".to_owned(),
        "raw_line VARCHAR".to_owned(),
        "field_count BIGINT".to_owned(),
    ];
    ddl.extend(staged.iter().map(|c| format!("{c} VARCHAR")));
    engine.execute(&format!("CREATE TABLE {} ({})", tables.raw, ddl.join(", ")))?;

    let staged_rows = stage_records(engine, tables, source, width, batch_size)?;
    tracing::debug!(rows = staged_rows, "staged delimited records");

    // 필드 수가 맞고 모든 비어있지 않은 필드가 컬럼 타입으로 변환되는 라인
    let mut parsed = SelectBuilder::from(&tables.raw)
        .column("line_no")
        .filter(format!("field_count = {width}"));
    for (column, spec) in staged.iter().zip(source.columns) {
        if spec.sql_type != SqlType::Varchar {
            let value = trimmed_value(column);
            parsed = parsed.filter(format!(
                "{value} IS NULL OR {} IS NOT NULL",
                sql::try_cast(&value, spec.sql_type)
            ));
        }
    }
    engine.execute(&sql::create_table_as(&tables.parsed, &parsed.build()))?;

    let mut primary = SelectBuilder::from(&tables.raw)
        .filter(format!("line_no IN (SELECT line_no FROM {})", tables.parsed))
        .order_by("line_no");
    for (column, (spec, name)) in staged
        .iter()
        .zip(source.columns.iter().zip(source.column_idents()?))
    {
        let expr = if spec.sql_type == SqlType::Varchar {
            format!("NULLIF({column}, '')")
        } else {
            sql::try_cast(&trimmed_value(column), spec.sql_type)
        };
        primary = primary.column_as(expr, &name);
    }
    engine.execute(&sql::create_table_as(&tables.primary, &primary.build()))?;

    transition(IngestState::RejectResolution);

    let rejects = SelectBuilder::from(&tables.raw)
        .column("line_no AS line_number")
        .column("raw_line")
        .column(format!(
            "{} AS error_message",
            Literal::new(SKIPPED_LINE_MESSAGE)
        ))
        .column("NULL::VARCHAR AS column_name")
        .filter(format!(
            "line_no IN (SELECT line_no FROM {raw} EXCEPT SELECT line_no FROM {parsed})",
            raw = tables.raw,
            parsed = tables.parsed
        ))
        .order_by("line_no");
    engine.execute(&sql::create_table_as(&tables.rejects, &rejects.build()))?;
    Ok(())
}

/// 빈 문자열은 NULL로 취급
fn trimmed_value(column: &Ident) -> String {
    format!("NULLIF(trim({column}), '')")
}

/// csv 리더로 데이터 영역을 토큰화하여 스테이징 테이블에 배치 단위로 추가합니다.
fn stage_records(
    engine: &mut dyn SqlEngine,
    tables: &IngestTables,
    source: &DelimitedSource<'_>,
    width: usize,
    batch_size: usize,
) -> Result<usize, LogIngestError> {
    let text = read_text(source.path)?;
    let skipped = source.detection.lines_before_data();
    let start = offset_after_lines(&text, skipped);
    let data = &text[start..];

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(source.delimiter)
        .from_reader(data.as_bytes());

    let bytes = data.as_bytes();
    let mut record = csv::StringRecord::new();
    let mut batch: Vec<Vec<Cell>> = Vec::with_capacity(batch_size.min(width.max(1) * 1024));
    let mut total = 0;
    // 레코드 시작 위치까지의 개행 수로 물리적 라인 번호를 계산
    let mut cursor = 0;
    let mut line = 1;

    loop {
        let more = reader
            .read_record(&mut record)
            .map_err(|e| LogIngestError::Io(e.into()))?;
        if !more {
            break;
        }
        let Some(position) = record.position() else {
            continue;
        };

        // 리더가 건너뛴 빈 줄은 레코드 위치에 포함될 수 있음
        let mut begin = usize::try_from(position.byte())
            .unwrap_or(bytes.len())
            .clamp(cursor, bytes.len());
        while begin < bytes.len() && matches!(bytes[begin], b'\r' | b'\n') {
            begin += 1;
        }
        line += bytes[cursor..begin].iter().filter(|b| **b == b'\n').count();
        cursor = begin;

        if record.len() == 1 && record.get(0).is_some_and(|f| f.trim().is_empty()) {
            continue;
        }

        let end = usize::try_from(reader.position().byte())
            .unwrap_or(bytes.len())
            .clamp(begin, bytes.len());
        let raw = data.get(begin..end).map(trim_line_end).unwrap_or_default();
        let line_no = line + skipped;

        let mut row = Vec::with_capacity(width + 3);
        row.push(Cell::Int(line_no as i64));
        row.push(Cell::from(raw));
        row.push(Cell::Int(record.len() as i64));
        row.extend((0..width).map(|i| Cell::from(record.get(i))));
        batch.push(row);

        if batch.len() >= batch_size {
            total += engine.append_rows(tables.raw.as_str(), &batch)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        total += engine.append_rows(tables.raw.as_str(), &batch)?;
    }
    Ok(total)
}
