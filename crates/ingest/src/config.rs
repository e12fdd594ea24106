//! 적재 엔진 설정
//!
//! [`ScoringConfig`]와 [`SessionConfig`]는 core의
//! [`SnifferConfig`](logsift_core::config::SnifferConfig),
//! [`IngestConfig`](logsift_core::config::IngestConfig)를 기반으로
//! 이 크레이트 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logsift_core::config::LogsiftConfig;
//! use logsift_ingest::config::{ScoringConfig, SessionConfig};
//!
//! let core_config = LogsiftConfig::default();
//! let scoring = ScoringConfig::from_core(&core_config.sniffer);
//! let session = SessionConfig::from_core(&core_config.ingest)?;
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LogIngestError;

/// reject 수집 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectCapture {
    /// 엔진을 열 때 기능을 검사해 결정 (기본값)
    #[default]
    Auto,
    /// 엔진의 reject 기록 기능 사용을 강제
    Native,
    /// 스테이징 테이블 비교 방식 강제
    Fallback,
}

impl FromStr for RejectCapture {
    type Err = LogIngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "fallback" => Ok(Self::Fallback),
            other => Err(LogIngestError::Config {
                field: "reject_capture".to_owned(),
                reason: format!("unknown mode '{other}' (expected auto, native or fallback)"),
            }),
        }
    }
}

impl fmt::Display for RejectCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Native => f.write_str("native"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// 형식 감지 점수 설정
///
/// `score = regex_weight * ratio + heuristic_weight * heuristic`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// 파일 앞부분에서 읽을 최대 바이트 수
    pub sample_bytes: usize,
    /// 점수 계산에 사용할 최대 라인 수
    pub max_sample_lines: usize,
    /// 정규식 일치 비율 가중치
    pub regex_weight: f64,
    /// 휴리스틱 가중치
    pub heuristic_weight: f64,
    /// 채택 임계값 (초과해야 채택)
    pub acceptance_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::from_core(&logsift_core::config::SnifferConfig::default())
    }
}

impl ScoringConfig {
    /// core의 `SnifferConfig`에서 점수 설정을 생성합니다.
    pub fn from_core(core: &logsift_core::config::SnifferConfig) -> Self {
        Self {
            sample_bytes: core.sample_bytes,
            max_sample_lines: core.max_sample_lines,
            regex_weight: core.regex_weight,
            heuristic_weight: core.heuristic_weight,
            acceptance_threshold: core.acceptance_threshold,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogIngestError> {
        if self.sample_bytes == 0 {
            return Err(LogIngestError::Config {
                field: "sample_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.max_sample_lines == 0 {
            return Err(LogIngestError::Config {
                field: "max_sample_lines".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        for (field, value) in [
            ("regex_weight", self.regex_weight),
            ("heuristic_weight", self.heuristic_weight),
            ("acceptance_threshold", self.acceptance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LogIngestError::Config {
                    field: field.to_owned(),
                    reason: "must be within 0.0-1.0".to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// 세션(적재/쿼리) 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 기본 테이블 이름
    pub table_name: String,
    /// 미리보기 행 수
    pub preview_rows: usize,
    /// 헤더 감지용 샘플 바이트 수
    pub header_sample_bytes: usize,
    /// 헤더 감지용 샘플 라인 수
    pub header_sample_lines: usize,
    /// CSV 구분자
    pub delimiter: u8,
    /// reject 수집 방식
    pub reject_capture: RejectCapture,
    /// 샘플에서 컬럼 타입 추론 여부
    pub infer_column_types: bool,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 스테이징 테이블 append 배치 크기
    pub staging_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            table_name: "log_table".to_owned(),
            preview_rows: 200,
            header_sample_bytes: 64 * 1024,
            header_sample_lines: 40,
            delimiter: b',',
            reject_capture: RejectCapture::Auto,
            infer_column_types: true,
            staging_batch_size: 10_000,
        }
    }
}

impl SessionConfig {
    /// core의 `IngestConfig`에서 세션 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &logsift_core::config::IngestConfig) -> Result<Self, LogIngestError> {
        let delimiter = match core.delimiter.as_bytes() {
            [b] => *b,
            _ => {
                return Err(LogIngestError::Config {
                    field: "delimiter".to_owned(),
                    reason: "must be a single ASCII character".to_owned(),
                });
            }
        };
        let config = Self {
            table_name: core.table_name.clone(),
            preview_rows: core.preview_rows,
            header_sample_bytes: core.header_sample_bytes,
            header_sample_lines: core.header_sample_lines,
            delimiter,
            reject_capture: core.reject_capture.parse()?,
            infer_column_types: core.infer_column_types,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// reject 테이블 이름 (`{table_name}_rejects`)
    pub fn rejects_table(&self) -> String {
        format!("{}_rejects", self.table_name)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogIngestError> {
        const MAX_TABLE_NAME_LEN: usize = 64;

        if self.table_name.is_empty()
            || self.table_name.len() > MAX_TABLE_NAME_LEN
            || !self
                .table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(LogIngestError::Config {
                field: "table_name".to_owned(),
                reason: format!(
                    "must be 1-{MAX_TABLE_NAME_LEN} characters of [A-Za-z0-9_]"
                ),
            });
        }

        if !self.delimiter.is_ascii() || matches!(self.delimiter, b'"' | b'\n' | b'\r') {
            return Err(LogIngestError::Config {
                field: "delimiter".to_owned(),
                reason: "must be an ASCII character other than quote or newline".to_owned(),
            });
        }

        if self.header_sample_bytes == 0 || self.header_sample_lines == 0 {
            return Err(LogIngestError::Config {
                field: "header_sample_lines".to_owned(),
                reason: "header sample size must be greater than 0".to_owned(),
            });
        }

        if self.staging_batch_size == 0 {
            return Err(LogIngestError::Config {
                field: "staging_batch_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 세션 설정 빌더
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 테이블 이름을 설정합니다.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.config.table_name = name.into();
        self
    }

    /// 미리보기 행 수를 설정합니다.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.config.preview_rows = rows;
        self
    }

    /// CSV 구분자를 설정합니다.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// reject 수집 방식을 설정합니다.
    pub fn reject_capture(mut self, mode: RejectCapture) -> Self {
        self.config.reject_capture = mode;
        self
    }

    /// 컬럼 타입 추론 여부를 설정합니다.
    pub fn infer_column_types(mut self, infer: bool) -> Self {
        self.config.infer_column_types = infer;
        self
    }

    /// 스테이징 배치 크기를 설정합니다.
    pub fn staging_batch_size(mut self, size: usize) -> Self {
        self.config.staging_batch_size = size;
        self
    }

    /// 설정을 검증하고 `SessionConfig`를 생성합니다.
    pub fn build(self) -> Result<SessionConfig, LogIngestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
