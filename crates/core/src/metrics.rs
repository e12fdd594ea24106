//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않았다면 매크로는 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logsift_`
//! - 영역명: `sniff_`, `ingest_`, `query_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logsift_core::metrics::INGEST_ROWS_TOTAL).increment(rows);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 로그 형식 레이블 키 (nginx_combined, generic_csv, ...)
pub const LABEL_FORMAT: &str = "format";

/// 적재 전략 레이블 키 (native_rejects, fallback_diff, regex_extraction)
pub const LABEL_STRATEGY: &str = "strategy";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Sniffer 메트릭 ─────────────────────────────────────────────────

/// Sniffer: 형식 감지 시도 수 (counter, label: result)
pub const SNIFF_TOTAL: &str = "logsift_sniff_total";

// ─── Ingest 메트릭 ──────────────────────────────────────────────────

/// Ingest: 적재 시도 수 (counter, labels: format, strategy, result)
pub const INGEST_RUNS_TOTAL: &str = "logsift_ingest_runs_total";

/// Ingest: 기본 테이블에 적재된 행 수 (counter, label: format)
pub const INGEST_ROWS_TOTAL: &str = "logsift_ingest_rows_total";

/// Ingest: reject 테이블로 분류된 라인 수 (counter, label: format)
pub const INGEST_REJECTS_TOTAL: &str = "logsift_ingest_rejects_total";

/// Ingest: 적재 소요 시간 (histogram, 초)
pub const INGEST_DURATION_SECONDS: &str = "logsift_ingest_duration_seconds";

// ─── Query 메트릭 ───────────────────────────────────────────────────

/// Query: 사용자 쿼리 실행 시간 (histogram, 초)
pub const QUERY_DURATION_SECONDS: &str = "logsift_query_duration_seconds";

/// Query: 엔진이 거부한 쿼리 수 (counter)
pub const QUERY_ERRORS_TOTAL: &str = "logsift_query_errors_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 적재/쿼리 소요 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 300s 범위 (대용량 파일 적재 포함)
pub const DURATION_BUCKETS: [f64; 10] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 10.0, 60.0, 300.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(SNIFF_TOTAL, "Total number of format detection attempts");

    describe_counter!(INGEST_RUNS_TOTAL, "Total number of ingestion attempts");
    describe_counter!(
        INGEST_ROWS_TOTAL,
        "Total number of rows materialized into primary tables"
    );
    describe_counter!(
        INGEST_REJECTS_TOTAL,
        "Total number of input lines captured as rejects"
    );
    describe_histogram!(
        INGEST_DURATION_SECONDS,
        "Time to ingest a single file in seconds"
    );

    describe_histogram!(
        QUERY_DURATION_SECONDS,
        "Time to execute a single user query in seconds"
    );
    describe_counter!(
        QUERY_ERRORS_TOTAL,
        "Total number of user queries rejected by the engine"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_use_prefix() {
        for name in [
            SNIFF_TOTAL,
            INGEST_RUNS_TOTAL,
            INGEST_ROWS_TOTAL,
            INGEST_REJECTS_TOTAL,
            INGEST_DURATION_SECONDS,
            QUERY_DURATION_SECONDS,
            QUERY_ERRORS_TOTAL,
        ] {
            assert!(name.starts_with("logsift_"), "{name}");
        }
    }

    #[test]
    fn buckets_are_sorted() {
        assert!(DURATION_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn describe_without_recorder_is_noop() {
        describe_all();
    }
}
