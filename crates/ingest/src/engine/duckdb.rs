//! DuckDB 엔진 -- 인메모리 DuckDB 연결로 [`SqlEngine`]을 구현합니다.
//!
//! 연결을 열 때 CSV 리더의 reject 기록 기능을 한 번 검사하고
//! 결과를 [`EngineCapabilities`]에 기록합니다.

use std::io::Write;

use duckdb::types::{ToSqlOutput, Value, ValueRef};
use duckdb::{Connection, ToSql};
use logsift_core::engine::{EngineCapabilities, SqlEngine};
use logsift_core::error::EngineError;
use logsift_core::types::{Cell, QueryResult};

use crate::config::RejectCapture;
use crate::sql::Literal;

use super::projector;

/// 기능 검사용 CSV (두 번째 데이터 행의 id가 숫자가 아님)
const PROBE_CSV: &str = "id,name\n1,alice\n\"bob\",bob\n3,charlie\n";
const PROBE_DATA_TABLE: &str = "logsift_probe";
const PROBE_REJECTS_TABLE: &str = "logsift_probe_rejects";
const PROBE_SCAN_TABLE: &str = "logsift_probe_scans";

/// 인메모리 DuckDB 엔진
pub struct DuckDbEngine {
    conn: Connection,
    capabilities: EngineCapabilities,
}

impl DuckDbEngine {
    /// 인메모리 연결을 열고 reject 기록 기능을 결정합니다.
    pub fn open_in_memory(mode: RejectCapture) -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory().map_err(|e| EngineError::Open(e.to_string()))?;
        let version = conn
            .query_row("SELECT version()", [], |row| row.get::<_, String>(0))
            .unwrap_or_default();

        let mut engine = Self {
            conn,
            capabilities: EngineCapabilities {
                native_rejects: false,
                version,
            },
        };

        engine.capabilities.native_rejects = match mode {
            RejectCapture::Native => true,
            RejectCapture::Fallback => false,
            RejectCapture::Auto => engine.probe_native_rejects(),
        };

        tracing::debug!(
            version = %engine.capabilities.version,
            native_rejects = engine.capabilities.native_rejects,
            mode = %mode,
            "opened duckdb engine"
        );

        Ok(engine)
    }

    /// 작은 CSV를 reject 기록 모드로 읽어 기능 지원 여부를 확인합니다.
    ///
    /// 유효 2행, reject 1행이 나와야 지원으로 판단합니다. `count(*)`만 읽으면
    /// 컬럼이 투영에서 빠져 캐스트가 일어나지 않으므로 테이블로 물질화합니다.
    fn probe_native_rejects(&mut self) -> bool {
        match self.run_probe() {
            Ok(supported) => supported,
            Err(e) => {
                tracing::debug!(error = %e, "native reject capture unavailable");
                false
            }
        }
    }

    fn run_probe(&mut self) -> Result<bool, EngineError> {
        let mut file = tempfile::Builder::new()
            .prefix("logsift-probe")
            .suffix(".csv")
            .tempfile()
            .map_err(|e| EngineError::Open(e.to_string()))?;
        file.write_all(PROBE_CSV.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| EngineError::Open(e.to_string()))?;

        let path = Literal::new(file.path().to_string_lossy());
        let drop_scratch = format!(
            "DROP TABLE IF EXISTS {PROBE_DATA_TABLE}; DROP TABLE IF EXISTS {PROBE_REJECTS_TABLE}; \
             DROP TABLE IF EXISTS {PROBE_SCAN_TABLE};"
        );

        let outcome = (|| {
            self.execute(&format!(
                "CREATE TABLE {PROBE_DATA_TABLE} AS SELECT * FROM read_csv({path}, header = true, \
                 auto_detect = false, columns = {{'id': 'BIGINT', 'name': 'VARCHAR'}}, \
                 store_rejects = true, rejects_table = '{PROBE_REJECTS_TABLE}', \
                 rejects_scan = '{PROBE_SCAN_TABLE}')"
            ))?;
            let rows = self
                .query(&format!("SELECT count(*) FROM {PROBE_DATA_TABLE}"))?
                .scalar_i64();
            let rejects = self
                .query(&format!("SELECT count(*) FROM {PROBE_REJECTS_TABLE}"))?
                .scalar_i64();
            Ok::<_, EngineError>(rows == Some(2) && rejects == Some(1))
        })();

        // 검사 테이블은 결과와 무관하게 정리
        if let Err(e) = self.execute(&drop_scratch) {
            tracing::debug!(error = %e, "failed to drop probe tables");
        }
        outcome
    }
}

impl SqlEngine for DuckDbEngine {
    fn name(&self) -> &str {
        "duckdb"
    }

    fn capabilities(&self) -> &EngineCapabilities {
        &self.capabilities
    }

    fn execute(&mut self, sql: &str) -> Result<(), EngineError> {
        tracing::trace!(sql, "execute");
        self.conn
            .execute_batch(sql)
            .map_err(|e| EngineError::Query(e.to_string()))
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, EngineError> {
        tracing::trace!(sql, "query");
        let query_err = |e: duckdb::Error| EngineError::Query(e.to_string());

        let mut stmt = self.conn.prepare(sql).map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;
        let columns: Vec<String> = rows
            .as_ref()
            .map(|stmt| stmt.column_names())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value: Value = row.get(i).map_err(query_err)?;
                cells.push(projector::project(value));
            }
            out.push(cells);
        }

        Ok(QueryResult::new(columns, out))
    }

    fn append_rows(&mut self, table: &str, rows: &[Vec<Cell>]) -> Result<usize, EngineError> {
        let append_err = |e: duckdb::Error| EngineError::Append {
            table: table.to_owned(),
            reason: e.to_string(),
        };

        let mut appender = self.conn.appender(table).map_err(append_err)?;
        for row in rows {
            appender
                .append_row(duckdb::appender_params_from_iter(row.iter().map(CellParam)))
                .map_err(append_err)?;
        }
        appender.flush().map_err(append_err)?;
        Ok(rows.len())
    }

    fn close(self: Box<Self>) -> Result<(), EngineError> {
        self.conn
            .close()
            .map_err(|(_, e)| EngineError::Close(e.to_string()))
    }
}

/// [`Cell`]을 DuckDB 파라미터로 넘기기 위한 래퍼
struct CellParam<'a>(&'a Cell);

impl ToSql for CellParam<'_> {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Bool(v) => ToSqlOutput::Owned(Value::Boolean(*v)),
            Cell::Int(v) => ToSqlOutput::Owned(Value::BigInt(*v)),
            Cell::Float(v) => ToSqlOutput::Owned(Value::Double(*v)),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}
