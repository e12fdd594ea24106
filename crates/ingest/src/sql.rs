//! SQL 조립 -- 식별자/리터럴 타입과 SELECT 빌더
//!
//! 생성되는 SQL에 외부 값(테이블 이름, 정규식, 경로, 에러 코드)을 넣을 때는
//! 반드시 이 모듈의 타입을 거칩니다.
//!
//! - [`Ident`]: `[A-Za-z0-9_]`만 허용하고 항상 큰따옴표로 감쌉니다.
//! - [`Literal`]: 작은따옴표를 두 번 써서 이스케이프한 문자열 리터럴입니다.

use std::fmt;

use crate::catalog::SqlType;
use crate::error::LogIngestError;

/// 식별자 최대 길이
const MAX_IDENT_LEN: usize = 128;

/// 검증된 SQL 식별자
///
/// `Display`는 큰따옴표로 감싼 형태(`"log_table"`)를 출력합니다.
/// 허용 문자에 따옴표가 없으므로 추가 이스케이프가 필요 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// 식별자를 검증하고 생성합니다.
    pub fn new(name: impl Into<String>) -> Result<Self, LogIngestError> {
        let name = name.into();
        if name.is_empty()
            || name.len() > MAX_IDENT_LEN
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(LogIngestError::Config {
                field: "identifier".to_owned(),
                reason: format!(
                    "'{name}' must be 1-{MAX_IDENT_LEN} characters of [A-Za-z0-9_]"
                ),
            });
        }
        Ok(Self(name))
    }

    /// 접미어를 붙인 새 식별자 (`log_table` -> `log_table_raw`)
    pub fn suffixed(&self, suffix: &str) -> Result<Self, LogIngestError> {
        Self::new(format!("{}_{suffix}", self.0))
    }

    /// 따옴표 없는 원래 이름
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// SQL 문자열 리터럴
///
/// `Display`는 작은따옴표를 두 번 써서 이스케이프한 `'...'` 형태를 출력합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal(String);

impl Literal {
    /// 임의의 문자열로 리터럴을 생성합니다.
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().to_owned())
    }

    /// 이스케이프 전 원래 값
    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0.replace('\'', "''"))
    }
}

/// `TRY_CAST(expr AS type)` -- 실패 시 NULL
pub fn try_cast(expr: &str, sql_type: SqlType) -> String {
    format!("TRY_CAST({expr} AS {})", sql_type.as_sql())
}

/// `CREATE TABLE t AS <select>`
pub fn create_table_as(table: &Ident, select: &str) -> String {
    format!("CREATE TABLE {table} AS {select}")
}

/// `DROP TABLE IF EXISTS t`
pub fn drop_table(table: &Ident) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

/// `SELECT count(*) FROM t`
pub fn count_rows(table: &Ident) -> String {
    format!("SELECT count(*) FROM {table}")
}

/// SELECT 문 빌더
///
/// 컬럼 식과 조건은 호출자가 [`Ident`]/[`Literal`]로 조립한 문자열을 받습니다.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    columns: Vec<String>,
    from: String,
    filter: Vec<String>,
    order_by: Vec<String>,
    limit: Option<usize>,
}

impl SelectBuilder {
    /// `FROM` 대상(테이블 식별자 또는 테이블 함수 호출)으로 빌더를 생성합니다.
    pub fn from(source: impl fmt::Display) -> Self {
        Self {
            columns: Vec::new(),
            from: source.to_string(),
            filter: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// 결과 컬럼 식을 추가합니다.
    pub fn column(mut self, expr: impl Into<String>) -> Self {
        self.columns.push(expr.into());
        self
    }

    /// `expr AS "alias"` 컬럼을 추가합니다.
    pub fn column_as(mut self, expr: impl fmt::Display, alias: &Ident) -> Self {
        self.columns.push(format!("{expr} AS {alias}"));
        self
    }

    /// WHERE 조건을 추가합니다 (여러 개는 AND 결합).
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filter.push(condition.into());
        self
    }

    /// ORDER BY 항목을 추가합니다.
    pub fn order_by(mut self, expr: impl fmt::Display) -> Self {
        self.order_by.push(expr.to_string());
        self
    }

    /// LIMIT을 설정합니다.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// SQL 문자열을 생성합니다. 컬럼이 없으면 `*`을 선택합니다.
    pub fn build(&self) -> String {
        let columns = if self.columns.is_empty() {
            "*".to_owned()
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", self.from);
        if !self.filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(
                &self
                    .filter
                    .iter()
                    .map(|c| format!("({c})"))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            );
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        sql
    }
}

impl fmt::Display for SelectBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_is_always_quoted() {
        let ident = Ident::new("log_table").unwrap();
        assert_eq!(ident.to_string(), "\"log_table\"");
        assert_eq!(ident.as_str(), "log_table");
    }

    #[test]
    fn ident_rejects_injection() {
        for bad in ["", "a b", "t\"; DROP TABLE x; --", "t;", "naïve", "a-b"] {
            assert!(Ident::new(bad).is_err(), "{bad}");
        }
        assert!(Ident::new("x".repeat(MAX_IDENT_LEN + 1)).is_err());
    }

    #[test]
    fn ident_suffix_is_validated() {
        let base = Ident::new("log_table").unwrap();
        assert_eq!(base.suffixed("rejects").unwrap().as_str(), "log_table_rejects");
        assert!(base.suffixed("bad suffix").is_err());
    }

    #[test]
    fn literal_doubles_single_quotes() {
        assert_eq!(Literal::new("plain").to_string(), "'plain'");
        assert_eq!(
            Literal::new("it's'; DROP TABLE t; --").to_string(),
            "'it''s''; DROP TABLE t; --'"
        );
        assert_eq!(Literal::new(r"^(\S+) \[").to_string(), r"'^(\S+) \['");
    }

    #[test]
    fn select_builder_composes_clauses() {
        let table = Ident::new("t_raw").unwrap();
        let sql = SelectBuilder::from(&table)
            .column_as("line_no", &Ident::new("line_number").unwrap())
            .filter("NOT regexp_matches(line, '^x$')")
            .filter("line_no > 0")
            .order_by("line_no")
            .limit(10)
            .build();
        assert_eq!(
            sql,
            "SELECT line_no AS \"line_number\" FROM \"t_raw\" \
             WHERE (NOT regexp_matches(line, '^x$')) AND (line_no > 0) \
             ORDER BY line_no LIMIT 10"
        );
    }

    #[test]
    fn select_builder_defaults_to_star() {
        let sql = SelectBuilder::from(Ident::new("t").unwrap()).build();
        assert_eq!(sql, "SELECT * FROM \"t\"");
    }

    #[test]
    fn statement_helpers() {
        let t = Ident::new("t").unwrap();
        assert_eq!(drop_table(&t), "DROP TABLE IF EXISTS \"t\"");
        assert_eq!(count_rows(&t), "SELECT count(*) FROM \"t\"");
        assert_eq!(
            create_table_as(&t, "SELECT 1"),
            "CREATE TABLE \"t\" AS SELECT 1"
        );
        assert_eq!(try_cast("c0", SqlType::Bigint), "TRY_CAST(c0 AS BIGINT)");
    }
}
