//! 쿼리 실행기
//!
//! 사용자 SQL은 검증하거나 고쳐 쓰지 않고 엔진에 그대로 전달하며,
//! 엔진 에러 메시지도 그대로 돌려줍니다.

use logsift_core::engine::SqlEngine;
use logsift_core::error::EngineError;
use logsift_core::types::QueryResult;

use crate::catalog::FormatDescriptor;
use crate::sql::{Ident, Literal, SelectBuilder};

/// 기본 쿼리의 행 제한
pub const DEFAULT_QUERY_LIMIT: usize = 200;

/// 에러 코드 필터에 사용할 최대 코드 수
const MAX_FILTER_CODES: usize = 3;

/// 형식 정의의 기본 쿼리에서 테이블 자리 표시자
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// 활성 데이터셋에 SQL을 실행합니다.
pub fn run_query(engine: &mut dyn SqlEngine, sql: &str) -> Result<QueryResult, EngineError> {
    engine.query(sql)
}

/// 형식에 맞는 첫 쿼리를 만듭니다.
///
/// 1. 형식에 `default_query`가 있으면 `{table}`을 테이블 이름으로 바꿔 사용
/// 2. `status` 컬럼과 `common_error_codes`가 있으면 앞의 3개 코드로 필터
/// 3. 그 외에는 `SELECT * FROM t LIMIT 200`
pub fn default_query(format: &FormatDescriptor, table: &Ident) -> String {
    if let Some(query) = format.default_query.as_deref() {
        if !query.trim().is_empty() {
            return query.replace(TABLE_PLACEHOLDER, &table.to_string());
        }
    }

    let mut select = SelectBuilder::from(table).limit(DEFAULT_QUERY_LIMIT);
    if format.has_column("status") && !format.common_error_codes.is_empty() {
        let codes: Vec<String> = format
            .common_error_codes
            .iter()
            .take(MAX_FILTER_CODES)
            .map(|code| Literal::new(code).to_string())
            .collect();
        select = select.filter(format!("status IN ({})", codes.join(", ")));
    }
    select.build()
}
