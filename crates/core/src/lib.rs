//! logsift 공통 크레이트
//!
//! 모든 logsift 크레이트가 공유하는 타입, trait, 에러, 설정을 정의합니다.
//!
//! - [`config`]: `logsift.toml` 파싱과 환경변수 오버라이드
//! - [`engine`]: 임베디드 SQL 엔진 경계 ([`SqlEngine`])
//! - [`error`]: 도메인별 에러 계층
//! - [`metrics`]: 메트릭 이름 상수
//! - [`types`]: 엔진 독립적인 쿼리 결과 타입

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, DetectionError, EngineError, IngestError, LogsiftError};

// 설정
pub use config::LogsiftConfig;

// 엔진 trait
pub use engine::{EngineCapabilities, SqlEngine};

// 도메인 타입
pub use types::{Cell, QueryResult, Row};
