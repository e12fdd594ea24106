//! 도메인 타입 -- 쿼리 결과를 표현하는 엔진 독립적인 값

use std::fmt;

use serde::{Deserialize, Serialize};

/// 결과 셀 값
///
/// 엔진 고유의 컬럼형 값은 [`Cell`]로 투영됩니다.
/// NULL은 항상 [`Cell::Null`]이며, 문자열 `"null"`로 표현되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// SQL NULL (텍스트 출력 시 빈 문자열, JSON 출력 시 `null`)
    Null,
    /// 불리언
    Bool(bool),
    /// 64비트 정수
    Int(i64),
    /// 부동소수점
    Float(f64),
    /// 텍스트 (날짜/시간 등 포맷된 값 포함)
    Text(String),
}

impl Cell {
    /// NULL 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 정수 값으로 해석합니다 (집계 결과 읽기용).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 텍스트 값 참조
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// 결과 행 -- 컬럼 순서대로 정렬된 셀 목록
pub type Row = Vec<Cell>;

/// 쿼리 결과 -- 컬럼 이름 목록과 행 목록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// 컬럼 이름 (결과 순서)
    pub columns: Vec<String>,
    /// 행 목록 (각 행은 `columns`와 같은 길이)
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// 새 결과를 생성합니다.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// 행 수
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 결과가 비어있는지 여부
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 컬럼 이름의 위치 (대소문자 무시)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// 특정 행의 컬럼 값을 반환합니다.
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// 첫 행 첫 컬럼을 정수로 읽습니다 (`SELECT count(*) ...` 결과용).
    pub fn scalar_i64(&self) -> Option<i64> {
        self.rows.first()?.first()?.as_i64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_displays_as_empty() {
        assert_eq!(Cell::Null.to_string(), "");
        assert_ne!(Cell::Null.to_string(), "null");
    }

    #[test]
    fn null_serializes_as_json_null() {
        let json = serde_json::to_string(&vec![Cell::Null, Cell::Int(3)]).unwrap();
        assert_eq!(json, "[null,3]");
    }

    #[test]
    fn option_converts_to_cell() {
        assert_eq!(Cell::from(None::<&str>), Cell::Null);
        assert_eq!(Cell::from(Some("x")), Cell::Text("x".to_owned()));
    }

    #[test]
    fn value_lookup_is_case_insensitive() {
        let result = QueryResult::new(
            vec!["status".to_owned(), "path".to_owned()],
            vec![vec![Cell::Int(200), Cell::from("/api")]],
        );
        assert_eq!(result.value(0, "STATUS"), Some(&Cell::Int(200)));
        assert_eq!(result.value(1, "status"), None);
        assert_eq!(result.value(0, "missing"), None);
    }

    #[test]
    fn scalar_reads_first_cell() {
        let result = QueryResult::new(vec!["count".to_owned()], vec![vec![Cell::Int(42)]]);
        assert_eq!(result.scalar_i64(), Some(42));
        assert_eq!(QueryResult::default().scalar_i64(), None);
    }
}
