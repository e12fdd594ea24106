//! SQL 엔진 trait -- 임베디드 분석 엔진과의 경계 정의
//!
//! 적재 엔진과 쿼리 실행기는 이 trait만을 통해 엔진에 접근합니다.
//! 구현체는 블로킹 호출이며, 비동기 세션은 `spawn_blocking`으로 감싸 사용합니다.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{Cell, QueryResult};

/// 엔진이 지원하는 기능 목록
///
/// 엔진을 열 때 한 번 결정되며, 적재 경로 선택에 사용됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCapabilities {
    /// CSV 리더의 reject 테이블 기록 지원 여부
    pub native_rejects: bool,
    /// 엔진 버전 문자열 (진단용)
    pub version: String,
}

/// 임베디드 SQL 엔진 trait
///
/// 하나의 인스턴스는 하나의 연결(세션 카탈로그)을 소유합니다.
/// 같은 연결에서 쿼리를 교차 실행하지 않도록 모든 메서드는 `&mut self`를 받습니다.
pub trait SqlEngine: Send {
    /// 엔진 이름
    fn name(&self) -> &str;

    /// 초기화 시 결정된 기능 목록
    fn capabilities(&self) -> &EngineCapabilities;

    /// 결과가 필요 없는 SQL(DDL 등)을 실행합니다.
    fn execute(&mut self, sql: &str) -> Result<(), EngineError>;

    /// SQL을 실행하고 결과를 평범한 행/컬럼 구조로 반환합니다.
    fn query(&mut self, sql: &str) -> Result<QueryResult, EngineError>;

    /// 기존 테이블에 행을 일괄 추가합니다. 추가된 행 수를 반환합니다.
    fn append_rows(&mut self, table: &str, rows: &[Vec<Cell>]) -> Result<usize, EngineError>;

    /// 연결을 닫고 세션 카탈로그를 해제합니다.
    fn close(self: Box<Self>) -> Result<(), EngineError>;
}
