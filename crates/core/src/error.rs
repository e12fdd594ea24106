//! 에러 타입 -- 도메인별 에러 정의

/// logsift 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogsiftError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// SQL 엔진 에러
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// 형식 감지 실패
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// 적재 에러
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// SQL 엔진 에러
///
/// `Query`는 엔진 메시지를 그대로 표시합니다. 사용자 SQL 실패는
/// 해석하지 않고 원문으로 전달해야 하기 때문입니다.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 엔진 초기화(연결 생성) 실패
    #[error("failed to open engine: {0}")]
    Open(String),

    /// 엔진이 SQL을 거부함
    #[error("{0}")]
    Query(String),

    /// 스테이징 테이블 적재 실패
    #[error("failed to append rows to '{table}': {reason}")]
    Append { table: String, reason: String },

    /// 연결 종료 실패
    #[error("failed to close engine: {0}")]
    Close(String),
}

/// 형식 감지 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// 샘플에 비어있지 않은 라인이 없음
    #[error("empty content")]
    EmptyContent,

    /// 임계값을 넘는 형식이 없음
    #[error("unable to detect format (best confidence {confidence:.2})")]
    NoConfidentMatch { confidence: f64 },

    /// 샘플 읽기 실패
    #[error("failed to read sample: {0}")]
    Read(String),
}

/// 적재 에러 (상위 레이어용 요약)
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 적재 실패
    #[error("ingestion failed: {0}")]
    Failed(String),

    /// 적재된 데이터셋이 없음
    #[error("no dataset loaded")]
    NotLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_is_verbatim() {
        let err = EngineError::Query("Parser Error: syntax error at or near \"SELEC\"".to_owned());
        assert_eq!(
            err.to_string(),
            "Parser Error: syntax error at or near \"SELEC\""
        );
    }

    #[test]
    fn detection_error_reports_confidence() {
        let err = DetectionError::NoConfidentMatch { confidence: 0.4213 };
        assert!(err.to_string().contains("0.42"));
    }

    #[test]
    fn wraps_into_top_level() {
        let err: LogsiftError = ConfigError::InvalidValue {
            field: "sniffer.acceptance_threshold".to_owned(),
            reason: "must be within 0.0-1.0".to_owned(),
        }
        .into();
        assert!(matches!(err, LogsiftError::Config(_)));
        assert!(err.to_string().contains("acceptance_threshold"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LogsiftError = io_err.into();
        assert!(matches!(err, LogsiftError::Io(_)));
    }
}
