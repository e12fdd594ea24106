//! 형식 정의 데이터 타입
//!
//! YAML 카탈로그 파일에서 역직렬화되는 구조체들을 정의합니다.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LogIngestError;

/// 정규식 최대 길이
const MAX_REGEX_LEN: usize = 4096;

/// 형식 정의 -- 카탈로그 파일의 `formats` 목록 항목 하나에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// slug: nginx_error
/// name: Nginx error log
/// category: web server
/// file_extension: .log
/// regex: '^(\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(\w+)\] (.*)$'
/// schema:
///   - { name: logged_at, type: VARCHAR }
///   - { name: level, type: VARCHAR }
///   - { name: message, type: VARCHAR }
/// sample_line: '2023/10/10 13:55:36 [error] upstream timed out'
/// common_error_codes: ["error", "crit"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// 형식 고유 키 (`[A-Za-z0-9_-]+`)
    pub slug: String,
    /// 표시 이름
    pub name: String,
    /// 설명
    #[serde(default)]
    pub description: String,
    /// 분류 (web server, system, application, data ...)
    pub category: String,
    /// 대표 확장자 (`.csv`이면 구분자 기반 경로로 적재)
    pub file_extension: String,
    /// 감지/추출용 정규식
    #[serde(default)]
    pub regex: Option<String>,
    /// 컬럼 정의 (캡처 그룹 순서와 대응)
    #[serde(default)]
    pub schema: Vec<ColumnSpec>,
    /// 예시 라인
    #[serde(default)]
    pub sample_line: Option<String>,
    /// 적재 직후 실행할 기본 쿼리 (`{table}` 치환)
    #[serde(default)]
    pub default_query: Option<String>,
    /// 자주 조회하는 에러 코드
    #[serde(default)]
    pub common_error_codes: Vec<String>,
}

impl FormatDescriptor {
    /// 구분자 기반(CSV) 형식 여부
    pub fn is_delimited(&self) -> bool {
        self.file_extension.eq_ignore_ascii_case(".csv")
    }

    /// 스키마 컬럼 이름 목록
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.iter().map(|c| c.name.as_str()).collect()
    }

    /// 스키마에 해당 컬럼이 있는지 여부 (대소문자 무시)
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// 정규식을 컴파일합니다.
    ///
    /// 정규식이 없으면 `Ok(None)`을 반환합니다.
    pub fn compile_regex(&self) -> Result<Option<Regex>, LogIngestError> {
        let Some(pattern) = self.regex.as_deref() else {
            return Ok(None);
        };
        if pattern.len() > MAX_REGEX_LEN {
            return Err(LogIngestError::InvalidPattern {
                slug: self.slug.clone(),
                reason: format!("pattern exceeds {MAX_REGEX_LEN} characters"),
            });
        }
        Regex::new(pattern)
            .map(Some)
            .map_err(|e| LogIngestError::InvalidPattern {
                slug: self.slug.clone(),
                reason: e.to_string(),
            })
    }

    /// 정규식 캡처 그룹 수와 스키마 길이가 일치하는지 검사합니다.
    ///
    /// 구분자 기반 형식은 캡처 그룹이 없는 감지 전용 정규식을 허용합니다.
    pub fn check_group_binding(&self, regex: &Regex) -> Result<(), LogIngestError> {
        let groups = regex.captures_len().saturating_sub(1);
        if self.is_delimited() && groups == 0 {
            return Ok(());
        }
        if groups != self.schema.len() {
            return Err(LogIngestError::SchemaMismatch {
                slug: self.slug.clone(),
                groups,
                columns: self.schema.len(),
            });
        }
        Ok(())
    }

    /// 형식 정의의 유효성을 검증합니다.
    ///
    /// 카탈로그 로딩 시점에 호출되어 잘못된 정의를 조기에 거부합니다.
    pub fn validate(&self) -> Result<(), LogIngestError> {
        if self.slug.is_empty()
            || !self
                .slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(LogIngestError::InvalidFormat {
                slug: if self.slug.is_empty() {
                    "(empty)".to_owned()
                } else {
                    self.slug.clone()
                },
                reason: "slug must be non-empty and contain only [A-Za-z0-9_-]".to_owned(),
            });
        }

        if self.name.trim().is_empty() {
            return Err(self.invalid("name must not be empty"));
        }

        let mut seen = HashSet::new();
        for column in &self.schema {
            if !is_identifier(&column.name) {
                return Err(self.invalid(&format!(
                    "column name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
                    column.name
                )));
            }
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(self.invalid(&format!("duplicate column name '{}'", column.name)));
            }
        }

        match self.compile_regex()? {
            Some(regex) => {
                self.check_group_binding(&regex)?;
                if let Some(sample) = self.sample_line.as_deref() {
                    if !regex.is_match(sample) {
                        return Err(self.invalid("sample_line does not match regex"));
                    }
                }
            }
            None if !self.is_delimited() => {
                return Err(self.invalid("regex is required for non-delimited formats"));
            }
            None => {}
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> LogIngestError {
        LogIngestError::InvalidFormat {
            slug: self.slug.clone(),
            reason: reason.to_owned(),
        }
    }
}

/// 컬럼 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// 컬럼 이름
    pub name: String,
    /// SQL 타입
    #[serde(rename = "type", default)]
    pub sql_type: SqlType,
}

impl ColumnSpec {
    /// 새 컬럼 정의를 생성합니다.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// 허용된 SQL 컬럼 타입
///
/// 카탈로그에서 임의의 타입 문자열을 받지 않도록 열거형으로 제한합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    /// 가변 길이 문자열 (기본값)
    #[default]
    Varchar,
    /// 32비트 정수
    Integer,
    /// 64비트 정수
    Bigint,
    /// 배정밀도 부동소수점
    Double,
    /// 불리언
    Boolean,
    /// 날짜
    Date,
    /// 타임스탬프
    Timestamp,
}

impl SqlType {
    /// SQL 타입 이름
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Varchar => "VARCHAR",
            Self::Integer => "INTEGER",
            Self::Bigint => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// 문자열 그대로 저장되는 타입인지 여부 (캐스트 불필요)
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Varchar)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// SQL 식별자 규칙 (`[A-Za-z_][A-Za-z0-9_]*`)
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(regex: &str, columns: &[&str]) -> FormatDescriptor {
        FormatDescriptor {
            slug: "test_fmt".to_owned(),
            name: "Test".to_owned(),
            description: String::new(),
            category: "application".to_owned(),
            file_extension: ".log".to_owned(),
            regex: Some(regex.to_owned()),
            schema: columns
                .iter()
                .map(|c| ColumnSpec::new(*c, SqlType::Varchar))
                .collect(),
            sample_line: None,
            default_query: None,
            common_error_codes: Vec::new(),
        }
    }

    #[test]
    fn valid_descriptor_passes() {
        let fmt = descriptor(r"^(\w+) (.*)$", &["level", "message"]);
        fmt.validate().unwrap();
    }

    #[test]
    fn group_count_mismatch_fails() {
        let fmt = descriptor(r"^(\w+) (\w+) (.*)$", &["level", "message"]);
        let err = fmt.validate().unwrap_err();
        assert!(matches!(
            err,
            LogIngestError::SchemaMismatch {
                groups: 3,
                columns: 2,
                ..
            }
        ));
    }

    #[test]
    fn non_capturing_groups_are_not_counted() {
        let fmt = descriptor(r"^(?:\[)?(\w+)(?:\])? (.*)$", &["level", "message"]);
        fmt.validate().unwrap();
    }

    #[test]
    fn malformed_regex_fails_with_slug() {
        let fmt = descriptor(r"^(\w+ (.*)$", &["level", "message"]);
        let err = fmt.validate().unwrap_err();
        assert!(err.to_string().starts_with("invalid pattern for format 'test_fmt'"));
    }

    #[test]
    fn bad_column_name_fails() {
        let fmt = descriptor(r"^(\w+)$", &["bad name"]);
        assert!(fmt.validate().is_err());
        let fmt = descriptor(r"^(\w+)$", &["1st"]);
        assert!(fmt.validate().is_err());
    }

    #[test]
    fn duplicate_column_name_fails_case_insensitively() {
        let fmt = descriptor(r"^(\w+) (\w+)$", &["Level", "level"]);
        let err = fmt.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate column"));
    }

    #[test]
    fn sample_line_must_match() {
        let mut fmt = descriptor(r"^(\d+)$", &["n"]);
        fmt.sample_line = Some("abc".to_owned());
        assert!(fmt.validate().is_err());
        fmt.sample_line = Some("42".to_owned());
        fmt.validate().unwrap();
    }

    #[test]
    fn regex_required_unless_delimited() {
        let mut fmt = descriptor("", &[]);
        fmt.regex = None;
        assert!(fmt.validate().is_err());

        fmt.file_extension = ".CSV".to_owned();
        assert!(fmt.is_delimited());
        fmt.validate().unwrap();
    }

    #[test]
    fn delimited_allows_sniff_only_regex() {
        let mut fmt = descriptor(r"^[^,]*(?:,[^,]*)+$", &["a", "b"]);
        fmt.file_extension = ".csv".to_owned();
        fmt.validate().unwrap();
    }

    #[test]
    fn slug_with_spaces_fails() {
        let mut fmt = descriptor(r"^(.*)$", &["line"]);
        fmt.slug = "my format".to_owned();
        assert!(fmt.validate().is_err());
    }

    #[test]
    fn sql_type_deserializes_uppercase() {
        let spec: ColumnSpec = serde_yaml::from_str("{ name: status, type: INTEGER }").unwrap();
        assert_eq!(spec.sql_type, SqlType::Integer);

        let spec: ColumnSpec = serde_yaml::from_str("{ name: message }").unwrap();
        assert_eq!(spec.sql_type, SqlType::Varchar);

        let result: Result<ColumnSpec, _> =
            serde_yaml::from_str("{ name: x, type: \"TEXT); DROP TABLE t; --\" }");
        assert!(result.is_err());
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("status"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("9lives"));
    }
}
