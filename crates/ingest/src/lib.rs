#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`catalog`]: 형식 정의(YAML) 로딩과 검증
//! - [`sniff`]: 형식 감지와 헤더 위치 추론
//! - [`ingest`]: 기본 테이블/reject 테이블 구체화 (엔진 reject 기록, 스테이징 차집합, 정규식 추출)
//! - [`engine`]: DuckDB 엔진 어댑터와 결과 투영
//! - [`query`]: 쿼리 실행기와 형식별 기본 쿼리
//! - [`session`]: 활성 데이터셋을 소유하는 세션
//! - [`sql`]: 식별자/리터럴 타입과 SELECT 빌더
//! - [`config`]: 감지/세션 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! FormatCatalog -> Sniffer -> plan_ingest -> run_ingest -> Session.query -> Projector
//!      |              |            |              |
//!   YAML 정의     점수 계산    헤더/정규식 검증   DuckDB (spawn_blocking)
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod query;
pub mod session;
pub mod sniff;
pub mod sql;

// --- 주요 타입 re-export ---

// 세션
pub use session::Session;

// 설정
pub use config::{RejectCapture, ScoringConfig, SessionConfig, SessionConfigBuilder};

// 에러
pub use error::LogIngestError;

// 카탈로그
pub use catalog::{ColumnSpec, FormatCatalog, FormatDescriptor, SqlType};

// 감지
pub use sniff::{HeaderDetection, SniffResult, infer_header_offset, resolve_format, sniff_file};

// 적재
pub use ingest::{IngestPlan, IngestStrategy, IngestSummary};

// 엔진
pub use engine::{DuckDbEngine, open_engine};

// 쿼리
pub use query::{default_query, run_query};
