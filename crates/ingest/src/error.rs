//! 적재 엔진 에러 타입
//!
//! [`LogIngestError`]는 카탈로그 로딩부터 쿼리 실행까지 이 크레이트에서 발생하는
//! 모든 에러를 표현합니다. `From<LogIngestError> for LogsiftError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logsift_core::error::{ConfigError, DetectionError, EngineError, IngestError, LogsiftError};

/// 적재 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogIngestError {
    /// 카탈로그 파일 로딩 실패
    #[error("catalog load error: {path}: {reason}")]
    CatalogLoad {
        /// 카탈로그 경로 (내장 카탈로그는 `<builtin>`)
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 형식 정의 검증 실패
    #[error("invalid format '{slug}': {reason}")]
    InvalidFormat {
        /// 문제가 된 형식 slug
        slug: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 형식의 정규식 컴파일 실패
    #[error("invalid pattern for format '{slug}': {reason}")]
    InvalidPattern {
        /// 형식 slug
        slug: String,
        /// 정규식 엔진의 에러 메시지
        reason: String,
    },

    /// 캡처 그룹 수와 스키마 길이 불일치
    #[error("schema mismatch for format '{slug}': {groups} capture groups, {columns} columns")]
    SchemaMismatch {
        /// 형식 slug
        slug: String,
        /// 정규식 캡처 그룹 수
        groups: usize,
        /// 스키마 컬럼 수
        columns: usize,
    },

    /// 적재할 내용이 없음
    #[error("file is empty: {path}")]
    EmptyInput {
        /// 입력 파일 경로
        path: String,
    },

    /// UTF-8로 해석할 수 없는 입력
    #[error("failed to decode {path} as UTF-8 near line {line}")]
    Decode {
        /// 입력 파일 경로
        path: String,
        /// 문제가 된 물리적 라인 번호 (1부터)
        line: usize,
    },

    /// 카탈로그에 없는 형식
    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    /// 형식 감지 실패
    #[error(transparent)]
    Detection(#[from] DetectionError),

    /// 활성 데이터셋 없음
    #[error("no dataset loaded")]
    NotLoaded,

    /// 블로킹 작업 실패 (panic/cancel)
    #[error("background task failed: {0}")]
    Task(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// SQL 엔진 에러 (메시지 그대로 표시)
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LogIngestError> for LogsiftError {
    fn from(err: LogIngestError) -> Self {
        match err {
            LogIngestError::Engine(e) => LogsiftError::Engine(e),
            LogIngestError::Io(e) => LogsiftError::Io(e),
            LogIngestError::Detection(e) => LogsiftError::Detection(e),
            LogIngestError::NotLoaded => LogsiftError::Ingest(IngestError::NotLoaded),
            LogIngestError::Config { field, reason } => {
                LogsiftError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => LogsiftError::Ingest(IngestError::Failed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_names_format() {
        let err = LogIngestError::InvalidPattern {
            slug: "nginx_combined".to_owned(),
            reason: "unclosed group".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "invalid pattern for format 'nginx_combined': unclosed group"
        );
    }

    #[test]
    fn engine_error_is_transparent() {
        let err: LogIngestError =
            EngineError::Query("Catalog Error: Table with name nope does not exist!".to_owned())
                .into();
        assert_eq!(
            err.to_string(),
            "Catalog Error: Table with name nope does not exist!"
        );
    }

    #[test]
    fn schema_mismatch_display() {
        let err = LogIngestError::SchemaMismatch {
            slug: "custom".to_owned(),
            groups: 3,
            columns: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 capture groups"));
        assert!(msg.contains("2 columns"));
    }

    #[test]
    fn converts_to_logsift_error() {
        let err: LogsiftError = LogIngestError::NotLoaded.into();
        assert!(matches!(err, LogsiftError::Ingest(IngestError::NotLoaded)));

        let err: LogsiftError = LogIngestError::EmptyInput {
            path: "/tmp/empty.log".to_owned(),
        }
        .into();
        assert!(matches!(err, LogsiftError::Ingest(IngestError::Failed(_))));

        let err: LogsiftError =
            LogIngestError::from(DetectionError::NoConfidentMatch { confidence: 0.3 }).into();
        assert!(matches!(err, LogsiftError::Detection(_)));
    }
}
