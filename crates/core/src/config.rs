//! 설정 관리 -- logsift.toml 파싱 및 런타임 설정
//!
//! [`LogsiftConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSIFT_INGEST_PREVIEW_ROWS=500` 형식)
//! 3. 설정 파일 (`logsift.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logsift_core::error::LogsiftError> {
//! use logsift_core::config::LogsiftConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogsiftConfig::load("logsift.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogsiftConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogsiftError};

/// logsift 통합 설정
///
/// `logsift.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsiftConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 형식 감지 설정
    #[serde(default)]
    pub sniffer: SnifferConfig,
    /// 적재 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 형식 카탈로그 설정
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl LogsiftConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogsiftError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에서 시작하는 [`load`](Self::load) 변형입니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, LogsiftError> {
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(LogsiftError::Config(ConfigError::FileNotFound { path })) => {
                tracing::debug!(path = %path, "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogsiftError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogsiftError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogsiftError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogsiftError> {
        toml::from_str(toml_str).map_err(|e| {
            LogsiftError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSIFT_{SECTION}_{FIELD}`
    /// 예: `LOGSIFT_SNIFFER_ACCEPTANCE_THRESHOLD=0.6`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSIFT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSIFT_GENERAL_LOG_FORMAT");

        // Sniffer
        override_usize(
            &mut self.sniffer.sample_bytes,
            "LOGSIFT_SNIFFER_SAMPLE_BYTES",
        );
        override_usize(
            &mut self.sniffer.max_sample_lines,
            "LOGSIFT_SNIFFER_MAX_SAMPLE_LINES",
        );
        override_f64(
            &mut self.sniffer.regex_weight,
            "LOGSIFT_SNIFFER_REGEX_WEIGHT",
        );
        override_f64(
            &mut self.sniffer.heuristic_weight,
            "LOGSIFT_SNIFFER_HEURISTIC_WEIGHT",
        );
        override_f64(
            &mut self.sniffer.acceptance_threshold,
            "LOGSIFT_SNIFFER_ACCEPTANCE_THRESHOLD",
        );

        // Ingest
        override_string(&mut self.ingest.table_name, "LOGSIFT_INGEST_TABLE_NAME");
        override_usize(
            &mut self.ingest.preview_rows,
            "LOGSIFT_INGEST_PREVIEW_ROWS",
        );
        override_usize(
            &mut self.ingest.header_sample_bytes,
            "LOGSIFT_INGEST_HEADER_SAMPLE_BYTES",
        );
        override_usize(
            &mut self.ingest.header_sample_lines,
            "LOGSIFT_INGEST_HEADER_SAMPLE_LINES",
        );
        override_string(&mut self.ingest.delimiter, "LOGSIFT_INGEST_DELIMITER");
        override_string(
            &mut self.ingest.reject_capture,
            "LOGSIFT_INGEST_REJECT_CAPTURE",
        );
        override_bool(
            &mut self.ingest.infer_column_types,
            "LOGSIFT_INGEST_INFER_COLUMN_TYPES",
        );

        // Catalog
        override_string(&mut self.catalog.path, "LOGSIFT_CATALOG_PATH");
        override_bool(
            &mut self.catalog.include_builtin,
            "LOGSIFT_CATALOG_INCLUDE_BUILTIN",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogsiftError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 가중치/임계값은 [0, 1] 범위
        for (field, value) in [
            ("sniffer.regex_weight", self.sniffer.regex_weight),
            ("sniffer.heuristic_weight", self.sniffer.heuristic_weight),
            (
                "sniffer.acceptance_threshold",
                self.sniffer.acceptance_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must be within 0.0-1.0".to_owned(),
                }
                .into());
            }
        }

        if self.sniffer.sample_bytes == 0 || self.sniffer.max_sample_lines == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sniffer.sample_bytes".to_owned(),
                reason: "sample size and line cap must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.ingest.table_name.is_empty()
            || !self
                .ingest
                .table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidValue {
                field: "ingest.table_name".to_owned(),
                reason: "must be non-empty and contain only [A-Za-z0-9_]".to_owned(),
            }
            .into());
        }

        if self.ingest.delimiter.chars().count() != 1 || !self.ingest.delimiter.is_ascii() {
            return Err(ConfigError::InvalidValue {
                field: "ingest.delimiter".to_owned(),
                reason: "must be a single ASCII character".to_owned(),
            }
            .into());
        }

        let valid_captures = ["auto", "native", "fallback"];
        if !valid_captures.contains(&self.ingest.reject_capture.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "ingest.reject_capture".to_owned(),
                reason: format!("must be one of: {}", valid_captures.join(", ")),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 형식 감지 설정
///
/// 가중치와 임계값은 보정 가능한 파라미터이며 의미를 가진 상수가 아닙니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnifferConfig {
    /// 파일 앞부분에서 읽을 최대 바이트 수
    pub sample_bytes: usize,
    /// 점수 계산에 사용할 최대 라인 수
    pub max_sample_lines: usize,
    /// 정규식 일치 비율 가중치
    pub regex_weight: f64,
    /// 형식별 휴리스틱 가중치
    pub heuristic_weight: f64,
    /// 채택 임계값 (이 값을 초과해야 채택)
    pub acceptance_threshold: f64,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            sample_bytes: 64 * 1024, // 64KB
            max_sample_lines: 20,
            regex_weight: 0.8,
            heuristic_weight: 0.2,
            acceptance_threshold: 0.5,
        }
    }
}

/// 적재 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 기본 테이블 이름 (reject 테이블은 `{table_name}_rejects`)
    pub table_name: String,
    /// 미리보기 행 수
    pub preview_rows: usize,
    /// 헤더 감지용 샘플 바이트 수
    pub header_sample_bytes: usize,
    /// 헤더 감지용 샘플 라인 수
    pub header_sample_lines: usize,
    /// CSV 구분자 (한 글자)
    pub delimiter: String,
    /// reject 수집 방식 (auto, native, fallback)
    pub reject_capture: String,
    /// 샘플에서 컬럼 타입을 추론할지 여부
    pub infer_column_types: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            table_name: "log_table".to_owned(),
            preview_rows: 200,
            header_sample_bytes: 64 * 1024, // 64KB
            header_sample_lines: 40,
            delimiter: ",".to_owned(),
            reject_capture: "auto".to_owned(),
            infer_column_types: true,
        }
    }
}

/// 형식 카탈로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// 추가 카탈로그 YAML 경로 (빈 문자열이면 사용하지 않음)
    pub path: String,
    /// 내장 카탈로그 포함 여부
    pub include_builtin: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            include_builtin: true,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = LogsiftConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.sniffer.sample_bytes, 65536);
        assert_eq!(config.sniffer.max_sample_lines, 20);
        assert_eq!(config.ingest.table_name, "log_table");
        assert_eq!(config.ingest.preview_rows, 200);
        assert_eq!(config.ingest.reject_capture, "auto");
        assert!(config.catalog.include_builtin);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = LogsiftConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = LogsiftConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.sniffer.acceptance_threshold, 0.5);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[sniffer]
acceptance_threshold = 0.65

[ingest]
preview_rows = 50
"#;
        let config = LogsiftConfig::parse(toml).unwrap();
        assert_eq!(config.sniffer.acceptance_threshold, 0.65);
        // 가중치는 기본값 유지
        assert_eq!(config.sniffer.regex_weight, 0.8);
        assert_eq!(config.ingest.preview_rows, 50);
        assert_eq!(config.ingest.table_name, "log_table");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = LogsiftConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result.unwrap_err(),
            LogsiftError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = LogsiftConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_threshold_out_of_range() {
        let mut config = LogsiftConfig::default();
        config.sniffer.acceptance_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("acceptance_threshold"));
    }

    #[test]
    fn validate_rejects_unsafe_table_name() {
        let mut config = LogsiftConfig::default();
        config.ingest.table_name = "logs; DROP TABLE x".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("table_name"));
    }

    #[test]
    fn validate_rejects_multi_char_delimiter() {
        let mut config = LogsiftConfig::default();
        config.ingest.delimiter = "||".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_reject_capture() {
        let mut config = LogsiftConfig::default();
        config.ingest.reject_capture = "sometimes".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reject_capture"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGSIFT_STR", "overridden") };
        override_string(&mut val, "TEST_LOGSIFT_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_LOGSIFT_STR") };
    }

    #[test]
    fn env_override_f64_invalid_keeps_original() {
        let mut val = 0.5;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGSIFT_F64_BAD", "half") };
        override_f64(&mut val, "TEST_LOGSIFT_F64_BAD");
        assert_eq!(val, 0.5); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_LOGSIFT_F64_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 200usize;
        override_usize(&mut val, "TEST_LOGSIFT_NONEXISTENT_12345");
        assert_eq!(val, 200);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = LogsiftConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LogsiftConfig::parse(&toml_str).unwrap();
        assert_eq!(config.ingest.table_name, parsed.ingest.table_name);
        assert_eq!(config.sniffer.regex_weight, parsed.sniffer.regex_weight);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = LogsiftConfig::from_file("/nonexistent/path/logsift.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            LogsiftError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn load_or_default_without_file_uses_defaults() {
        let config = LogsiftConfig::load_or_default("/nonexistent/path/logsift.toml")
            .await
            .unwrap();
        assert_eq!(config.ingest.table_name, "log_table");
    }
}
