//! 세션 -- 활성 데이터셋 하나를 소유하는 명시적 객체
//!
//! 세션은 적재마다 새 인메모리 엔진을 열고, 이전 데이터셋은 먼저 닫습니다.
//! 엔진 호출은 모두 블로킹이므로 [`tokio::task::spawn_blocking`]으로 실행하며,
//! 엔진을 블로킹 작업으로 옮겼다가 돌려받습니다. `&mut self`로 인해 한 세션에서
//! 동시에 진행되는 작업은 항상 하나입니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! let mut session = Session::new(SessionConfig::default());
//! let summary = session.ingest("access.log", &format).await?;
//! let result = session.query("SELECT status, count(*) FROM log_table GROUP BY 1").await?;
//! session.close().await?;
//! ```

use std::path::Path;
use std::time::Instant;

use logsift_core::engine::SqlEngine;
use logsift_core::metrics as m;
use logsift_core::types::QueryResult;
use tracing::Instrument;
use uuid::Uuid;

use crate::catalog::FormatDescriptor;
use crate::config::SessionConfig;
use crate::engine::open_engine;
use crate::error::LogIngestError;
use crate::ingest::{IngestSummary, drop_tables, plan_ingest, run_ingest};
use crate::query::run_query;
use crate::sql::{Ident, SelectBuilder};

/// 적재된 데이터셋 (엔진 + 요약)
struct ActiveDataset {
    engine: Box<dyn SqlEngine>,
    summary: IngestSummary,
}

/// 적재/쿼리 세션
pub struct Session {
    id: Uuid,
    config: SessionConfig,
    active: Option<ActiveDataset>,
}

impl Session {
    /// 새 세션을 생성합니다. 엔진은 첫 적재 때 열립니다.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            active: None,
        }
    }

    /// 로그 상관관계용 세션 ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 세션 설정
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 활성 데이터셋 요약
    pub fn summary(&self) -> Option<&IngestSummary> {
        self.active.as_ref().map(|dataset| &dataset.summary)
    }

    /// 데이터셋 적재 여부
    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    /// 파일을 적재합니다.
    ///
    /// 이전 데이터셋을 먼저 닫고 새 엔진을 엽니다. 실패하면 새 엔진도 닫히며
    /// 세션에는 데이터셋이 남지 않습니다.
    pub async fn ingest(
        &mut self,
        path: impl AsRef<Path>,
        format: &FormatDescriptor,
    ) -> Result<&IngestSummary, LogIngestError> {
        self.close().await?;

        let path = path.as_ref().to_path_buf();
        let span = tracing::debug_span!("ingest", session = %self.id, format = %format.slug);
        let started = Instant::now();

        let outcome = async {
            let plan = plan_ingest(&path, format, &self.config).await?;

            let config = self.config.clone();
            let format = format.clone();
            let task_span = tracing::Span::current();
            tokio::task::spawn_blocking(move || -> Result<ActiveDataset, LogIngestError> {
                let _entered = task_span.enter();
                let mut engine = open_engine(config.reject_capture)?;
                match run_ingest(engine.as_mut(), &path, &format, &plan, &config) {
                    Ok(summary) => Ok(ActiveDataset { engine, summary }),
                    Err(e) => {
                        if let Err(close_err) = engine.close() {
                            tracing::warn!(error = %close_err, "failed to close engine after ingest failure");
                        }
                        Err(e)
                    }
                }
            })
            .await
            .map_err(|e| LogIngestError::Task(e.to_string()))?
        }
        .instrument(span)
        .await;

        let (result_label, strategy) = match &outcome {
            Ok(dataset) => ("success", dataset.summary.strategy.as_str()),
            Err(_) => ("failure", "none"),
        };
        metrics::counter!(
            m::INGEST_RUNS_TOTAL,
            m::LABEL_FORMAT => format.slug.clone(),
            m::LABEL_STRATEGY => strategy,
            m::LABEL_RESULT => result_label
        )
        .increment(1);
        metrics::histogram!(m::INGEST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(dataset) => {
                tracing::debug!(session = %self.id, "dataset ready");
                Ok(&self.active.insert(dataset).summary)
            }
            Err(e) => {
                tracing::warn!(session = %self.id, format = %format.slug, error = %e, "ingestion failed");
                Err(e)
            }
        }
    }

    /// 활성 데이터셋에 SQL을 실행합니다.
    ///
    /// 엔진이 거부한 쿼리는 데이터셋에 영향을 주지 않습니다.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult, LogIngestError> {
        let sql = sql.to_owned();
        self.with_engine(move |engine| Ok(run_query(engine, &sql)?))
            .await
    }

    /// reject 테이블을 라인 번호 순으로 조회합니다.
    pub async fn rejects(&mut self, limit: usize) -> Result<QueryResult, LogIngestError> {
        let table = Ident::new(&self.summary().ok_or(LogIngestError::NotLoaded)?.rejects_table)?;
        let sql = SelectBuilder::from(&table)
            .order_by("line_number")
            .limit(limit)
            .build();
        self.query(&sql).await
    }

    /// 엔진 카탈로그의 테이블 이름 목록
    pub async fn table_names(&mut self) -> Result<Vec<String>, LogIngestError> {
        let result = self
            .query("SELECT table_name FROM information_schema.tables ORDER BY table_name")
            .await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(|cell| cell.as_str()).map(str::to_owned))
            .collect())
    }

    /// 데이터셋의 테이블을 삭제하고 엔진 연결을 닫습니다.
    ///
    /// 활성 데이터셋이 없으면 아무 일도 하지 않습니다.
    pub async fn close(&mut self) -> Result<(), LogIngestError> {
        let Some(ActiveDataset {
            mut engine,
            summary,
        }) = self.active.take()
        else {
            return Ok(());
        };

        let session = self.id;
        tokio::task::spawn_blocking(move || {
            let tables = [
                Ident::new(&summary.table_name)?,
                Ident::new(&summary.rejects_table)?,
            ];
            if let Err(e) = drop_tables(engine.as_mut(), &tables) {
                tracing::warn!(session = %session, error = %e, "failed to drop dataset tables");
            }
            engine.close()?;
            Ok::<_, LogIngestError>(())
        })
        .await
        .map_err(|e| LogIngestError::Task(e.to_string()))??;

        tracing::debug!(session = %self.id, "dataset closed");
        Ok(())
    }

    /// 엔진을 블로킹 작업으로 옮겨 `f`를 실행하고 돌려받습니다.
    async fn with_engine<T, F>(&mut self, f: F) -> Result<T, LogIngestError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SqlEngine) -> Result<T, LogIngestError> + Send + 'static,
    {
        let mut dataset = self.active.take().ok_or(LogIngestError::NotLoaded)?;
        let (dataset, result) = tokio::task::spawn_blocking(move || {
            let result = f(dataset.engine.as_mut());
            (dataset, result)
        })
        .await
        .map_err(|e| LogIngestError::Task(e.to_string()))?;
        self.active = Some(dataset);
        result
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("summary", &self.summary())
            .finish()
    }
}
