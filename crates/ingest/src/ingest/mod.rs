//! 적재 엔진 -- 로그 파일을 기본 테이블과 reject 테이블로 구체화합니다.
//!
//! # 상태 전이
//!
//! ```text
//! START -> HEADER_SNIFF -> TABLE_CREATE -> REJECT_RESOLUTION -> SUMMARIZE -> READY
//!   \__________\_______________\_________________\__________________\______-> FAILED
//! ```
//!
//! 적재 경로는 세 가지입니다.
//!
//! - [`IngestStrategy::NativeRejects`]: 엔진 CSV 리더가 reject를 직접 기록
//! - [`IngestStrategy::FallbackDiff`]: 라인 번호가 붙은 스테이징 테이블과 파싱 성공 라인의 차집합
//! - [`IngestStrategy::RegexExtraction`]: 정규식 캡처 그룹을 컬럼으로 추출
//!
//! 성공하면 정확히 두 테이블(`t`, `t_rejects`)만 남습니다.
//! 실패하면 이 적재가 만들었을 수 있는 모든 테이블을 삭제합니다.

mod delimited;
mod extract;
mod lines;

use std::fmt;
use std::path::{Path, PathBuf};

use logsift_core::engine::SqlEngine;
use logsift_core::metrics as m;
use logsift_core::types::QueryResult;
use serde::Serialize;

use crate::catalog::{ColumnSpec, FormatDescriptor};
use crate::config::SessionConfig;
use crate::error::LogIngestError;
use crate::sniff::header::{infer_columns, sniff_csv_header};
use crate::sniff::HeaderDetection;
use crate::sql::{self, Ident, SelectBuilder};

/// reject 테이블 스키마 (모든 적재 경로 공통)
const REJECT_SCHEMA: [(&str, &str); 4] = [
    ("line_number", "BIGINT"),
    ("raw_line", "VARCHAR"),
    ("error_message", "VARCHAR"),
    ("column_name", "VARCHAR"),
];

/// 빈 reject 테이블 생성문
pub(crate) fn create_empty_rejects(table: &Ident) -> String {
    let columns: Vec<String> = REJECT_SCHEMA
        .iter()
        .map(|(name, ty)| format!("{name} {ty}"))
        .collect();
    format!("CREATE TABLE {table} ({})", columns.join(", "))
}

/// 적재 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStrategy {
    /// 엔진 CSV 리더의 reject 기록
    NativeRejects,
    /// 스테이징 테이블 차집합
    FallbackDiff,
    /// 정규식 추출
    RegexExtraction,
}

impl IngestStrategy {
    /// 레이블/로그용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeRejects => "native_rejects",
            Self::FallbackDiff => "fallback_diff",
            Self::RegexExtraction => "regex_extraction",
        }
    }
}

impl fmt::Display for IngestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 적재 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IngestState {
    Start,
    HeaderSniff,
    TableCreate,
    RejectResolution,
    Summarize,
    Ready,
    Failed,
}

impl IngestState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::HeaderSniff => "HEADER_SNIFF",
            Self::TableCreate => "TABLE_CREATE",
            Self::RejectResolution => "REJECT_RESOLUTION",
            Self::Summarize => "SUMMARIZE",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
        }
    }
}

/// 상태 전이를 기록합니다 (세션 span 안에서 호출).
pub(crate) fn transition(state: IngestState) {
    tracing::debug!(state = state.as_str(), "ingest state");
}

/// 적재 결과 요약
///
/// 엔진 핸들은 세션이 소유하며 요약에는 포함되지 않습니다.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    /// 기본 테이블 이름
    pub table_name: String,
    /// reject 테이블 이름
    pub rejects_table: String,
    /// 적재에 사용한 형식
    pub format_slug: String,
    /// 적재 경로
    pub strategy: IngestStrategy,
    /// 기본 테이블 컬럼
    pub columns: Vec<String>,
    /// 미리보기 (최대 `preview_rows`행)
    pub preview_rows: QueryResult,
    /// 기본 테이블 전체 행 수
    pub total_row_count: u64,
    /// reject 행 수
    pub reject_row_count: u64,
    /// 입력 파일 경로
    pub source: PathBuf,
}

/// 적재 계획 -- SQL 실행 전에 입력과 형식을 검증한 결과
#[derive(Debug, Clone)]
pub enum IngestPlan {
    /// 구분자 기반 텍스트
    Delimited {
        /// 헤더 위치
        detection: HeaderDetection,
        /// 컬럼 이름과 타입
        columns: Vec<ColumnSpec>,
    },
    /// 정규식 추출
    Regex {
        /// 컴파일/그룹 수 검증을 마친 정규식
        regex: regex::Regex,
    },
}

impl IngestPlan {
    /// 구분자 기반 경로 여부
    pub fn is_delimited(&self) -> bool {
        matches!(self, Self::Delimited { .. })
    }
}

/// 이 적재가 만들 수 있는 테이블 이름 묶음
#[derive(Debug, Clone)]
pub(crate) struct IngestTables {
    pub primary: Ident,
    pub rejects: Ident,
    pub raw: Ident,
    pub parsed: Ident,
    pub native_rejects: Ident,
    pub native_scans: Ident,
}

impl IngestTables {
    pub(crate) fn new(config: &SessionConfig) -> Result<Self, LogIngestError> {
        let primary = Ident::new(&config.table_name)?;
        Ok(Self {
            rejects: Ident::new(config.rejects_table())?,
            raw: primary.suffixed("raw")?,
            parsed: primary.suffixed("parsed")?,
            native_rejects: primary.suffixed("rejects_native")?,
            native_scans: primary.suffixed("scans")?,
            primary,
        })
    }

    fn staging(&self) -> [&Ident; 4] {
        [
            &self.raw,
            &self.parsed,
            &self.native_rejects,
            &self.native_scans,
        ]
    }

    fn all(&self) -> [&Ident; 6] {
        let [raw, parsed, native_rejects, native_scans] = self.staging();
        [
            &self.primary,
            &self.rejects,
            raw,
            parsed,
            native_rejects,
            native_scans,
        ]
    }
}

/// 테이블 목록을 삭제합니다.
pub(crate) fn drop_tables<'a>(
    engine: &mut dyn SqlEngine,
    tables: impl IntoIterator<Item = &'a Ident>,
) -> Result<(), LogIngestError> {
    let statements: Vec<String> = tables.into_iter().map(sql::drop_table).collect();
    engine.execute(&statements.join("; "))?;
    Ok(())
}

/// 입력을 검증하고 적재 계획을 세웁니다.
///
/// 정규식 컴파일 실패와 그룹/스키마 불일치는 여기서 드러나므로
/// SQL은 한 줄도 실행되지 않습니다.
pub async fn plan_ingest(
    path: impl AsRef<Path>,
    format: &FormatDescriptor,
    config: &SessionConfig,
) -> Result<IngestPlan, LogIngestError> {
    let path = path.as_ref();
    transition(IngestState::Start);

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() == 0 {
        return Err(LogIngestError::EmptyInput {
            path: path.display().to_string(),
        });
    }
    // 적재 경로와 무관하게 디코딩 실패는 치명적
    lines::ensure_utf8(path).await?;

    if !uses_delimited_path(path, format) {
        let regex = format
            .compile_regex()?
            .ok_or_else(|| LogIngestError::InvalidFormat {
                slug: format.slug.clone(),
                reason: "format has no pattern to extract columns with".to_owned(),
            })?;
        format.check_group_binding(&regex)?;
        return Ok(IngestPlan::Regex { regex });
    }

    transition(IngestState::HeaderSniff);
    let (detection, sample) = sniff_csv_header(
        path,
        char::from(config.delimiter),
        config.header_sample_bytes,
        config.header_sample_lines,
    )
    .await?;

    if sample.iter().all(|line| line.trim().is_empty()) {
        return Err(LogIngestError::EmptyInput {
            path: path.display().to_string(),
        });
    }

    // 구분자 형식이 스키마를 선언하면 그대로 쓰고, 아니면 샘플에서 추론
    let columns = if format.is_delimited() && !format.schema.is_empty() {
        format.schema.clone()
    } else {
        infer_columns(
            &sample,
            detection,
            config.delimiter,
            config.infer_column_types,
        )
    };
    if columns.is_empty() {
        return Err(LogIngestError::EmptyInput {
            path: path.display().to_string(),
        });
    }

    tracing::debug!(
        header_offset = detection.header_offset,
        has_header = detection.has_header,
        columns = columns.len(),
        "planned delimited ingestion"
    );
    Ok(IngestPlan::Delimited { detection, columns })
}

/// 계획에 따라 파일을 적재하고 요약을 반환합니다 (블로킹).
///
/// 실패 시 이 적재가 만들었을 수 있는 테이블을 모두 삭제한 뒤 에러를 반환합니다.
/// 엔진 연결을 닫는 것은 호출자의 몫입니다.
pub fn run_ingest(
    engine: &mut dyn SqlEngine,
    path: &Path,
    format: &FormatDescriptor,
    plan: &IngestPlan,
    config: &SessionConfig,
) -> Result<IngestSummary, LogIngestError> {
    let tables = IngestTables::new(config)?;
    let strategy = match plan {
        IngestPlan::Regex { .. } => IngestStrategy::RegexExtraction,
        IngestPlan::Delimited { .. } if engine.capabilities().native_rejects => {
            IngestStrategy::NativeRejects
        }
        IngestPlan::Delimited { .. } => IngestStrategy::FallbackDiff,
    };
    tracing::debug!(strategy = %strategy, engine = engine.name(), "selected ingest strategy");

    match materialize(engine, &tables, path, format, plan, strategy, config) {
        Ok(summary) => {
            transition(IngestState::Ready);
            Ok(summary)
        }
        Err(e) => {
            transition(IngestState::Failed);
            if let Err(cleanup) = drop_tables(engine, tables.all()) {
                tracing::warn!(error = %cleanup, "failed to drop tables after ingest failure");
            }
            Err(e)
        }
    }
}

fn materialize(
    engine: &mut dyn SqlEngine,
    tables: &IngestTables,
    path: &Path,
    format: &FormatDescriptor,
    plan: &IngestPlan,
    strategy: IngestStrategy,
    config: &SessionConfig,
) -> Result<IngestSummary, LogIngestError> {
    drop_tables(engine, tables.all())?;

    match plan {
        IngestPlan::Regex { regex } => {
            extract::ingest_regex(engine, tables, path, format, regex, config)?;
        }
        IngestPlan::Delimited { detection, columns } => {
            let source = delimited::DelimitedSource {
                path,
                detection: *detection,
                columns,
                delimiter: config.delimiter,
            };
            if strategy == IngestStrategy::NativeRejects {
                delimited::ingest_native(engine, tables, &source)?;
            } else {
                delimited::ingest_fallback(engine, tables, &source, config.staging_batch_size)?;
            }
        }
    }
    drop_tables(engine, tables.staging())?;

    transition(IngestState::Summarize);
    summarize(engine, tables, path, format, strategy, config.preview_rows)
}

fn summarize(
    engine: &mut dyn SqlEngine,
    tables: &IngestTables,
    path: &Path,
    format: &FormatDescriptor,
    strategy: IngestStrategy,
    preview_rows: usize,
) -> Result<IngestSummary, LogIngestError> {
    let count = |engine: &mut dyn SqlEngine, table: &Ident| -> Result<u64, LogIngestError> {
        let n = engine.query(&sql::count_rows(table))?.scalar_i64().unwrap_or(0);
        Ok(u64::try_from(n).unwrap_or(0))
    };
    let total_row_count = count(engine, &tables.primary)?;
    let reject_row_count = count(engine, &tables.rejects)?;
    let preview = engine.query(
        &SelectBuilder::from(&tables.primary)
            .limit(preview_rows)
            .build(),
    )?;

    metrics::counter!(m::INGEST_ROWS_TOTAL, m::LABEL_FORMAT => format.slug.clone())
        .increment(total_row_count);
    metrics::counter!(m::INGEST_REJECTS_TOTAL, m::LABEL_FORMAT => format.slug.clone())
        .increment(reject_row_count);

    tracing::info!(
        path = %path.display(),
        format = %format.slug,
        strategy = %strategy,
        rows = total_row_count,
        rejects = reject_row_count,
        "ingestion finished"
    );

    Ok(IngestSummary {
        table_name: tables.primary.as_str().to_owned(),
        rejects_table: tables.rejects.as_str().to_owned(),
        format_slug: format.slug.clone(),
        strategy,
        columns: preview.columns.clone(),
        preview_rows: preview,
        total_row_count,
        reject_row_count,
        source: path.to_path_buf(),
    })
}

/// 형식의 확장자가 `.csv`이거나 파일 이름이 `.csv`로 끝나면 구분자 경로
fn uses_delimited_path(path: &Path, format: &FormatDescriptor) -> bool {
    format.is_delimited()
        || path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
