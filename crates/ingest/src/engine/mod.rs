//! 엔진 어댑터 -- [`SqlEngine`] 구현과 결과 투영
//!
//! - [`duckdb`]: 인메모리 DuckDB 연결과 reject 기록 기능 검사
//! - [`projector`]: 엔진 값을 [`Cell`](logsift_core::types::Cell)로 변환

pub mod duckdb;
pub mod projector;

pub use self::duckdb::DuckDbEngine;

use logsift_core::engine::SqlEngine;
use logsift_core::error::EngineError;

use crate::config::RejectCapture;

/// 새 인메모리 엔진을 엽니다.
///
/// 세션은 적재마다 새 엔진을 열어 이전 데이터셋과 카탈로그를 공유하지 않습니다.
pub fn open_engine(mode: RejectCapture) -> Result<Box<dyn SqlEngine>, EngineError> {
    Ok(Box::new(DuckDbEngine::open_in_memory(mode)?))
}
